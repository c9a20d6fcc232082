// Rigid motion of a box from its tracked point pairs.
//
// The default is an ordinary least squares translation. The similarity model
// is the closed form 4-parameter Helmert fit, see e.g.
// <https://en.wikipedia.org/wiki/Helmert_transformation>.

use crate::all::*;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ArgEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransformModel {
  Translation,
  Similarity,
}

impl TransformModel {
  // Number of point pairs that determine the model.
  pub fn min_points(&self) -> usize {
    match self {
      TransformModel::Translation => 1,
      TransformModel::Similarity => 2,
    }
  }
}

// p' = [a -b; b a] p + t
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
  pub a: f64,
  pub b: f64,
  pub t: Vector2d,
}

impl Transform {
  pub fn translation(t: Vector2d) -> Transform {
    Transform { a: 1., b: 0., t }
  }

  #[inline(always)]
  pub fn apply(&self, p: Vector2d) -> Vector2d {
    Vector2d::new(
      self.a * p[0] - self.b * p[1] + self.t[0],
      self.b * p[0] + self.a * p[1] + self.t[1],
    )
  }

  pub fn scale(&self) -> f64 {
    (self.a * self.a + self.b * self.b).sqrt()
  }

  pub fn rotation(&self) -> f64 {
    self.b.atan2(self.a)
  }
}

#[derive(Clone, Copy, Debug)]
pub struct RansacOptions {
  pub iterations: usize,
  // Maximum residual in pixels for a pair to count as an inlier.
  pub threshold: f64,
  pub seed: u64,
}

// Returns `None` when there are no point pairs, the box then stays where it is.
pub fn estimate(
  before: &[Vector2d],
  after: &[Vector2d],
  model: TransformModel,
) -> TrackingResult<Option<Transform>> {
  check_pairs(before, after)?;
  Ok(fit(before, after, model))
}

// RANSAC over minimal samples followed by a least squares refit on the largest
// inlier set. Deterministic for a fixed seed.
pub fn estimate_robust(
  before: &[Vector2d],
  after: &[Vector2d],
  model: TransformModel,
  options: &RansacOptions,
) -> TrackingResult<Option<Transform>> {
  check_pairs(before, after)?;
  let n = before.len();
  let sample_size = model.min_points();
  if n <= sample_size || options.iterations == 0 {
    return Ok(fit(before, after, model));
  }

  let mut rng = Xoshiro256PlusPlus::seed_from_u64(options.seed);
  let mut sample_before = Vec::with_capacity(sample_size);
  let mut sample_after = Vec::with_capacity(sample_size);
  let mut inliers = vec![];
  let mut best_inliers: Vec<usize> = vec![];
  for _ in 0..options.iterations {
    sample_before.clear();
    sample_after.clear();
    for i in rand::seq::index::sample(&mut rng, n, sample_size) {
      sample_before.push(before[i]);
      sample_after.push(after[i]);
    }
    let candidate = match fit(&sample_before, &sample_after, model) {
      Some(t) => t,
      None => continue,
    };
    inliers.clear();
    inliers.extend((0..n).filter(|&i| (candidate.apply(before[i]) - after[i]).norm() <= options.threshold));
    if inliers.len() > best_inliers.len() {
      std::mem::swap(&mut inliers, &mut best_inliers);
      if best_inliers.len() == n { break }
    }
  }
  if best_inliers.is_empty() {
    return Ok(fit(before, after, model));
  }
  trace!("RANSAC kept {}/{} point pairs.", best_inliers.len(), n);
  let inlier_before: Vec<Vector2d> = best_inliers.iter().map(|&i| before[i]).collect();
  let inlier_after: Vec<Vector2d> = best_inliers.iter().map(|&i| after[i]).collect();
  Ok(fit(&inlier_before, &inlier_after, model))
}

fn check_pairs(before: &[Vector2d], after: &[Vector2d]) -> TrackingResult<()> {
  if before.len() != after.len() {
    return Err(TrackingError::InvalidPointPairs { before: before.len(), after: after.len() });
  }
  Ok(())
}

fn fit(before: &[Vector2d], after: &[Vector2d], model: TransformModel) -> Option<Transform> {
  if before.is_empty() { return None }
  let n = before.len() as f64;
  let pc = before.iter().sum::<Vector2d>() / n;
  let qc = after.iter().sum::<Vector2d>() / n;
  match model {
    TransformModel::Translation => Some(Transform::translation(qc - pc)),
    TransformModel::Similarity => {
      let mut norm2 = 0.;
      let mut dot = 0.;
      let mut cross = 0.;
      for (p, q) in before.iter().zip(after) {
        let p = p - pc;
        let q = q - qc;
        norm2 += p.norm_squared();
        dot += p.dot(&q);
        cross += p[0] * q[1] - p[1] * q[0];
      }
      // All points coincide: only the translation is observable.
      if norm2 < 1e-12 {
        return Some(Transform::translation(qc - pc));
      }
      let a = dot / norm2;
      let b = cross / norm2;
      let rotated = Transform { a, b, t: Vector2d::zeros() }.apply(pc);
      Some(Transform { a, b, t: qc - rotated })
    },
  }
}
