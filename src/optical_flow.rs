// Pyramidal Lucas-Kanade tracker based on:
// <http://robots.stanford.edu/cs223b04/algo_tracking.pdf>
// “Pyramidal Implementation of the Lucas Kanade Feature Tracker
//   Description of the algorithm” by Jean-Yves Bouguet

use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedPoint {
  // Undefined when `success` is false.
  pub point: Vector2d,
  pub success: bool,
}

#[allow(non_snake_case)]
pub struct OpticalFlow {
  lk_iters: usize,
  lk_levels: usize,
  lk_win_size: usize,
  lk_epsilon: f64,
  lk_min_eigenvalue: f64,
  Ix: Matrixd,
  Iy: Matrixd,
  It: Matrixd,
  // Workspace. Window around the feature in the previous level, padded by
  // one pixel for the gradient.
  grid0: Matrixd,
}

impl OpticalFlow {
  pub fn new(p: &ParameterSet) -> TrackingResult<OpticalFlow> {
    if p.win_size % 2 != 1 {
      return Err(TrackingError::InvalidParameter("Lucas-Kanade window size must be odd number.".to_string()));
    }
    if p.win_size < 3 {
      return Err(TrackingError::InvalidParameter("Lucas-Kanade window size must be at least 3.".to_string()));
    }
    Ok(OpticalFlow {
      lk_iters: p.max_iterations,
      lk_levels: p.pyramid_levels,
      lk_win_size: p.win_size,
      lk_epsilon: p.convergence_epsilon,
      lk_min_eigenvalue: p.min_eigenvalue_threshold,
      Ix: DMatrix::zeros(p.win_size, p.win_size),
      Iy: DMatrix::zeros(p.win_size, p.win_size),
      It: DMatrix::zeros(p.win_size, p.win_size),
      grid0: DMatrix::zeros(p.win_size + 2, p.win_size + 2),
    })
  }

  // Appends one result per feature to `out`, in input order.
  pub fn process(
    &mut self,
    pyramid0: &Pyramid,
    pyramid1: &Pyramid,
    features0: &[Vector2d],
    out: &mut Vec<TrackedPoint>,
  ) {
    for feature0 in features0 {
      match self.process_feature(pyramid0, pyramid1, *feature0) {
        Some(point) => out.push(TrackedPoint { point, success: true }),
        None => out.push(TrackedPoint { point: *feature0, success: false }),
      }
    }
  }

  #[allow(non_snake_case)]
  fn process_feature(
    &mut self,
    pyramid0: &Pyramid,
    pyramid1: &Pyramid,
    feature0: Vector2d,
  ) -> Option<Vector2d> {
    let r = (self.lk_win_size - 1) / 2;
    let area = (self.lk_win_size * self.lk_win_size) as f64;
    // Coarse levels smaller than the window radius carry no usable texture.
    let level_count = (1..self.lk_levels.min(pyramid0.level_count()).min(pyramid1.level_count()))
      .take_while(|&l| {
        let (a, b) = (pyramid0.get_level(l), pyramid1.get_level(l));
        a.width.min(a.height).min(b.width).min(b.height) > r
      })
      .count() + 1;
    let mut g = Vector2d::zeros();
    let mut d = Vector2d::zeros();
    for L in (0..level_count).rev() {
      let level0 = pyramid0.get_level(L);
      let level1 = pyramid1.get_level(L);
      let u = feature0 / 2f64.powi(L as i32);
      if !level0.contains(u) { return None }
      scharr(level0, u, r, &mut self.Ix, &mut self.Iy, &mut self.grid0);
      let G = spatial_gradient(&self.Ix, &self.Iy);
      if min_eigenvalue(&G) / area < self.lk_min_eigenvalue { return None }
      let invG = G.try_inverse()?;
      let mut nu = Vector2d::zeros();
      let mut converged = false;
      for _ in 0..self.lk_iters {
        let center = u + g + nu;
        if !level1.contains(center) { return None }
        image_difference(r, &self.grid0, &mut self.It, level1, center);
        let eta = flow_vector(&invG, &self.Ix, &self.Iy, &self.It);
        if !eta[0].is_finite() || !eta[1].is_finite() { return None }
        nu += eta;
        if eta.norm() < self.lk_epsilon {
          converged = true;
          break;
        }
      }
      if L == 0 && !converged { return None }
      d = nu;
      if L > 0 { g = 2. * (g + d) }
    }
    let feature1 = feature0 + g + d;
    if !pyramid1.get_level(0).contains(feature1) { return None }
    Some(feature1)
  }
}

// Difference between the template window (inner part of `I0`) and the window
// of `level` around `center`.
#[allow(non_snake_case)]
fn image_difference(
  r: usize,
  I0: &Matrixd,
  It: &mut Matrixd,
  level: &Image,
  center: Vector2d,
) {
  let r = r as f64;
  for y in 0..It.nrows() {
    for x in 0..It.ncols() {
      let v = level.bilinear(center + Vector2d::new(x as f64 - r, y as f64 - r));
      It[(y, x)] = I0[(y + 1, x + 1)] - v;
    }
  }
}

#[allow(non_snake_case)]
fn flow_vector(
  invG: &Matrix2d,
  Ix: &Matrixd,
  Iy: &Matrixd,
  It: &Matrixd,
) -> Vector2d {
  let mut b = Vector2d::zeros();
  for y in 0..Ix.nrows() {
    for x in 0..Ix.ncols() {
      b[0] += It[(y, x)] * Ix[(y, x)];
      b[1] += It[(y, x)] * Iy[(y, x)];
    }
  }
  invG * b
}

#[allow(non_snake_case)]
fn spatial_gradient(
  Ix: &Matrixd,
  Iy: &Matrixd,
) -> Matrix2d {
  assert_eq!(Ix.nrows(), Iy.nrows());
  assert_eq!(Ix.ncols(), Iy.ncols());
  let mut x2 = 0.;
  let mut y2 = 0.;
  let mut xy = 0.;
  for y in 0..Ix.nrows() {
    for x in 0..Ix.ncols() {
      x2 += Ix[(y, x)] * Ix[(y, x)];
      y2 += Iy[(y, x)] * Iy[(y, x)];
      xy += Ix[(y, x)] * Iy[(y, x)];
    }
  }
  Matrix2d::new(x2, xy, xy, y2)
}

// Smaller eigenvalue of a symmetric 2x2 matrix.
#[allow(non_snake_case)]
fn min_eigenvalue(G: &Matrix2d) -> f64 {
  let half_trace = 0.5 * (G[(0, 0)] + G[(1, 1)]);
  let half_diff = 0.5 * (G[(0, 0)] - G[(1, 1)]);
  half_trace - (half_diff * half_diff + G[(0, 1)] * G[(1, 0)]).sqrt()
}

// Samples the `(2r + 1) x (2r + 1)` neighborhood of `center`.
fn fill_grid(
  level: &Image,
  center: Vector2d,
  r: usize,
  grid: &mut Matrixd,
) {
  let n = 2 * r + 1;
  if grid.shape() != (n, n) {
    *grid = DMatrix::zeros(n, n);
  }
  let r = r as f64;
  for y in 0..n {
    for x in 0..n {
      grid[(y, x)] = level.bilinear(center + Vector2d::new(x as f64 - r, y as f64 - r));
    }
  }
}

// Scharr derivatives of the window of radius `r`. `grid` is left holding the
// window padded by one pixel.
fn scharr(
  level: &Image,
  center: Vector2d,
  r: usize,
  out_x: &mut Matrixd,
  out_y: &mut Matrixd,
  // Workspace.
  grid: &mut Matrixd,
) {
  fill_grid(level, center, r + 1, grid);
  let n = 2 * r + 1;
  if out_x.shape() != (n, n) || out_y.shape() != (n, n) {
    *out_x = Matrixd::zeros(n, n);
    *out_y = Matrixd::zeros(n, n);
  }
  for y in 1..(grid.nrows() - 1) {
    for x in 1..(grid.ncols() - 1) {
      out_x[(y - 1, x - 1)] = (10. * grid[(y, x + 1)]
        + 3. * grid[(y + 1, x + 1)]
        + 3. * grid[(y - 1, x + 1)]
        - 10. * grid[(y, x - 1)]
        - 3. * grid[(y + 1, x - 1)]
        - 3. * grid[(y - 1, x - 1)]
      ) / 32.;
      out_y[(y - 1, x - 1)] = (10. * grid[(y + 1, x)]
        + 3. * grid[(y + 1, x + 1)]
        + 3. * grid[(y + 1, x - 1)]
        - 10. * grid[(y - 1, x)]
        - 3. * grid[(y - 1, x + 1)]
        - 3. * grid[(y - 1, x - 1)]
      ) / 32.;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::image::testing::*;

  fn pyramid(image: Image, levels: usize) -> Pyramid {
    Pyramid::new(image, None, levels).unwrap()
  }

  #[test]
  fn test_scharr() {
    let mut level = Image::new(5, 5, vec![
      0, 0, 0, 0, 0,
      0, 0, 0, 0, 0,
      0, 0, 0, 0, 0,
      0, 0, 0, 0, 0,
      0, 0, 0, 0, 0,
    ]).unwrap();

    let mut out_x = DMatrix::zeros(0, 0);
    let mut out_y = DMatrix::zeros(0, 0);
    let mut grid = DMatrix::zeros(0, 0);
    let center = Vector2d::new(2.0, 2.0);
    scharr(&level, center, 1, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::zeros(3, 3));
    assert_eq!(out_y, DMatrix::zeros(3, 3));

    level.data = vec![
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
    ];
    scharr(&level, center, 1, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::repeat(3, 3, 1.));
    assert_eq!(out_y, DMatrix::zeros(3, 3));

    level.data = vec![
      0, 1, 2, 3, 4,
      1, 2, 3, 4, 5,
      2, 3, 4, 5, 6,
      3, 4, 5, 6, 7,
      4, 5, 6, 7, 8,
    ];
    scharr(&level, center, 1, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::repeat(3, 3, 1.));
    assert_eq!(out_y, DMatrix::repeat(3, 3, 1.));

    level.data = vec![
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
    ];
    scharr(&level, center, 1, &mut out_x, &mut out_y, &mut grid);
    let answer_x = DMatrix::from_row_slice(3, 3, &[
      2.5, 0., -2.5,
      2.5, 0., -2.5,
      2.5, 0., -2.5,
    ]);
    assert_eq!(out_x, answer_x);
    assert_eq!(out_y, DMatrix::zeros(3, 3));
  }

  #[test]
  fn test_min_eigenvalue() {
    assert!((min_eigenvalue(&Matrix2d::new(3., 0., 0., 5.)) - 3.).abs() < 1e-12);
    assert!((min_eigenvalue(&Matrix2d::new(2., 1., 1., 2.)) - 1.).abs() < 1e-12);
    assert!(min_eigenvalue(&Matrix2d::new(1., 1., 1., 1.)).abs() < 1e-12);
  }

  #[test]
  fn test_identity_motion() {
    let params = ParameterSet::default();
    let mut flow = OpticalFlow::new(&params).unwrap();
    let p0 = pyramid(textured_image(120, 100, Vector2d::zeros()), 3);
    let p1 = pyramid(textured_image(120, 100, Vector2d::zeros()), 3);
    let features = [Vector2d::new(30., 40.), Vector2d::new(60.5, 50.25), Vector2d::new(90., 20.)];
    let mut out = vec![];
    flow.process(&p0, &p1, &features, &mut out);
    assert_eq!(out.len(), 3);
    for (t, f) in out.iter().zip(features.iter()) {
      assert!(t.success);
      assert!((t.point - f).norm() < 1e-6);
    }
  }

  #[test]
  fn test_known_translation() {
    let params = ParameterSet::default();
    let mut flow = OpticalFlow::new(&params).unwrap();
    let shift = Vector2d::new(6., -4.);
    let p0 = pyramid(textured_image(160, 120, Vector2d::zeros()), 3);
    let p1 = pyramid(textured_image(160, 120, shift), 3);
    let mut features = vec![];
    for x in [50., 70., 90., 110.] {
      for y in [40., 60., 80.] {
        features.push(Vector2d::new(x, y));
      }
    }
    let mut out = vec![];
    flow.process(&p0, &p1, &features, &mut out);
    for (t, f) in out.iter().zip(features.iter()) {
      assert!(t.success, "Feature {:?} lost.", f);
      assert!((t.point - f - shift).norm() < 0.5, "Feature {:?} tracked to {:?}.", f, t.point);
    }
  }

  #[test]
  fn test_more_levels_than_image_allows() {
    let mut params = ParameterSet::default();
    params.pyramid_levels = 40;
    let mut flow = OpticalFlow::new(&params).unwrap();
    let shift = Vector2d::new(6., -4.);
    let p0 = pyramid(textured_image(160, 120, Vector2d::zeros()), 40);
    let p1 = pyramid(textured_image(160, 120, shift), 40);
    assert_eq!(p0.get_level(39).width, 1);
    let features = [Vector2d::new(70., 60.), Vector2d::new(100., 50.)];
    let mut out = vec![];
    flow.process(&p0, &p1, &features, &mut out);
    for (t, f) in out.iter().zip(features.iter()) {
      assert!(t.success);
      assert!((t.point - f - shift).norm() < 0.5);
    }
  }

  #[test]
  fn test_flat_image_fails() {
    let params = ParameterSet::default();
    let mut flow = OpticalFlow::new(&params).unwrap();
    let p0 = pyramid(Image::from_fn(64, 64, |_, _| 80), 3);
    let p1 = pyramid(Image::from_fn(64, 64, |_, _| 80), 3);
    let mut out = vec![];
    flow.process(&p0, &p1, &[Vector2d::new(32., 32.)], &mut out);
    assert_eq!(out, vec![TrackedPoint { point: Vector2d::new(32., 32.), success: false }]);
  }

  #[test]
  fn test_outside_frame_fails() {
    let params = ParameterSet::default();
    let mut flow = OpticalFlow::new(&params).unwrap();
    let p0 = pyramid(textured_image(64, 64, Vector2d::zeros()), 3);
    let p1 = pyramid(textured_image(64, 64, Vector2d::zeros()), 3);
    let mut out = vec![];
    flow.process(&p0, &p1, &[Vector2d::new(-3., 10.), Vector2d::new(10., 64.5)], &mut out);
    assert!(out.iter().all(|t| !t.success));
  }

  #[test]
  fn test_window_size_checked() {
    let mut params = ParameterSet::default();
    params.win_size = 30;
    assert!(matches!(OpticalFlow::new(&params), Err(TrackingError::InvalidParameter(_))));
    params.win_size = 1;
    assert!(matches!(OpticalFlow::new(&params), Err(TrackingError::InvalidParameter(_))));
  }
}
