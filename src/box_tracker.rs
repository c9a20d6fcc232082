use crate::all::*;

// Per-frame bounding box propagation: sample a grid in each box, track the
// grid to the current frame and move the box by the fitted transform.
pub struct BoxTracker {
  parameters: ParameterSet,
  tracker: OpticalFlowTracker,
  // Workspace.
  samples: Vec<Vec<SamplePoint>>,
  before: Vec<Vector2d>,
  after: Vec<Vector2d>,
}

impl BoxTracker {
  pub fn new(parameters: ParameterSet) -> TrackingResult<BoxTracker> {
    parameters.validate()?;
    Ok(BoxTracker {
      tracker: OpticalFlowTracker::new(&parameters)?,
      parameters,
      samples: vec![],
      before: vec![],
      after: vec![],
    })
  }

  pub fn parameters(&self) -> &ParameterSet {
    &self.parameters
  }

  pub fn is_ready(&self) -> bool {
    self.tracker.is_ready()
  }

  pub fn init(&mut self, frame: &InputFrame) -> TrackingResult<()> {
    self.tracker.init(frame)
  }

  pub fn reset(&mut self) {
    self.tracker.reset();
  }

  // Returns one entry per input box, in input order. `None` marks a box whose
  // tracking was lost in this frame. Hidden and blocked boxes are returned
  // unchanged.
  pub fn process(
    &mut self,
    frame: &InputFrame,
    boxes: &[BoundingBox],
  ) -> TrackingResult<Vec<Option<BoundingBox>>> {
    self.samples.resize_with(boxes.len(), Vec::new);
    for (bbox, points) in boxes.iter().zip(self.samples.iter_mut()) {
      if bbox.is_active() {
        sample_grid_into(bbox, self.parameters.points_per_dimension, points)?;
      }
      else {
        points.clear();
      }
    }
    let tracked = self.tracker.track(frame, &self.samples)?;

    let mut out = Vec::with_capacity(boxes.len());
    for ((bbox, points), tracked) in boxes.iter().zip(&self.samples).zip(&tracked) {
      if !bbox.is_active() {
        out.push(Some(bbox.clone()));
        continue;
      }
      let updated = fit_box(
        &self.parameters,
        bbox,
        points,
        tracked,
        [frame.width, frame.height],
        &mut self.before,
        &mut self.after,
      )?;
      out.push(updated);
    }
    Ok(out)
  }
}

fn fit_box(
  p: &ParameterSet,
  bbox: &BoundingBox,
  points: &[SamplePoint],
  tracked: &[TrackedPoint],
  frame_size: [usize; 2],
  before: &mut Vec<Vector2d>,
  after: &mut Vec<Vector2d>,
) -> TrackingResult<Option<BoundingBox>> {
  before.clear();
  after.clear();
  for (point, t) in points.iter().zip(tracked) {
    if !t.success { continue }
    before.push(*point);
    after.push(t.point);
  }
  let ratio = before.len() as f64 / points.len() as f64;
  if ratio < p.min_confidence_threshold {
    warn!("Tracking lost for box {}: {}/{} points tracked.", bbox.id, before.len(), points.len());
    return Ok(None);
  }
  if before.is_empty() {
    debug!("No points tracked for box {}, keeping it in place.", bbox.id);
  }

  let transform = if p.outlier_rejection {
    estimate_robust(before, after, p.transform_model, &p.ransac_options())?
  }
  else {
    estimate(before, after, p.transform_model)?
  };
  let updated = update_box(bbox, transform.as_ref(), frame_size[0], frame_size[1], p.bbox_border_width);
  match (&updated, &transform) {
    (None, _) => warn!("Tracking lost for box {}: no area left after the update.", bbox.id),
    (Some(_), Some(t)) => debug!(
      "Box {}: {}/{} points, moved by ({:.2}, {:.2}), scale {:.3}.",
      bbox.id, before.len(), points.len(), t.t[0], t.t[1], t.scale(),
    ),
    (Some(_), None) => {},
  }
  Ok(updated)
}
