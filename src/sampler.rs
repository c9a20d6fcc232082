use crate::all::*;

// Uniform `n x n` grid spanning the box including its edges. The order is
// fixed, x outer and y inner, so index `i` refers to the same grid cell in
// every frame.
pub fn sample_grid(bbox: &BoundingBox, points_per_dimension: usize) -> TrackingResult<Vec<SamplePoint>> {
  let mut points = vec![];
  sample_grid_into(bbox, points_per_dimension, &mut points)?;
  Ok(points)
}

pub fn sample_grid_into(
  bbox: &BoundingBox,
  points_per_dimension: usize,
  points: &mut Vec<SamplePoint>,
) -> TrackingResult<()> {
  let n = points_per_dimension;
  if n < 2 {
    return Err(TrackingError::InvalidSampleGrid(n));
  }
  let step_x = bbox.width / (n - 1) as f64;
  let step_y = bbox.height / (n - 1) as f64;
  points.clear();
  points.reserve(n * n);
  for i in 0..n {
    for j in 0..n {
      points.push(SamplePoint::new(
        bbox.x + i as f64 * step_x,
        bbox.y + j as f64 * step_y,
      ));
    }
  }
  Ok(())
}
