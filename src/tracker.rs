use crate::all::*;

use std::mem;

enum TrackerState {
  Uninitialized,
  Ready { previous: Pyramid },
}

// Tracks points from the previously seen frame to the current one. Each
// `track()` moves the current pyramid into the previous slot, the retired
// pyramid's buffers are reused for the next frame.
pub struct OpticalFlowTracker {
  optical_flow: OpticalFlow,
  level_count: usize,
  state: TrackerState,
  unused_pyramid: Option<Pyramid>,
  // Workspace.
  points: Vec<Vector2d>,
  results: Vec<TrackedPoint>,
}

impl OpticalFlowTracker {
  pub fn new(p: &ParameterSet) -> TrackingResult<OpticalFlowTracker> {
    if p.pyramid_levels < 1 {
      return Err(TrackingError::InvalidParameter("At least one pyramid level is required.".to_string()));
    }
    Ok(OpticalFlowTracker {
      optical_flow: OpticalFlow::new(p)?,
      level_count: p.pyramid_levels,
      state: TrackerState::Uninitialized,
      unused_pyramid: None,
      points: vec![],
      results: vec![],
    })
  }

  pub fn is_ready(&self) -> bool {
    matches!(self.state, TrackerState::Ready { .. })
  }

  // Starts (or restarts) tracking from `frame`.
  pub fn init(&mut self, frame: &InputFrame) -> TrackingResult<()> {
    let pyramid = self.build_pyramid(frame)?;
    let old = mem::replace(&mut self.state, TrackerState::Ready { previous: pyramid });
    self.retire(old);
    debug!("Optical flow tracker initialized with a {}x{} frame.", frame.width, frame.height);
    Ok(())
  }

  pub fn reset(&mut self) {
    let old = mem::replace(&mut self.state, TrackerState::Uninitialized);
    self.retire(old);
  }

  // Results keep the grouping and order of `per_box_points`. On error the
  // stored previous frame is left as it was.
  pub fn track(
    &mut self,
    frame: &InputFrame,
    per_box_points: &[Vec<SamplePoint>],
  ) -> TrackingResult<Vec<Vec<TrackedPoint>>> {
    if !self.is_ready() {
      return Err(TrackingError::NotInitialized);
    }
    self.points.clear();
    for points in per_box_points {
      self.points.extend_from_slice(points);
    }
    if self.points.is_empty() {
      return Err(TrackingError::NoPointsToTrack);
    }

    let current = self.build_pyramid(frame)?;
    let previous = match &self.state {
      TrackerState::Ready { previous } => previous,
      TrackerState::Uninitialized => return Err(TrackingError::NotInitialized),
    };
    let (w0, h0) = (previous.get_level(0).width, previous.get_level(0).height);
    if (w0, h0) != (frame.width, frame.height) {
      warn!("Frame size changed from {}x{} to {}x{}.", w0, h0, frame.width, frame.height);
    }

    self.results.clear();
    self.optical_flow.process(previous, &current, &self.points, &mut self.results);
    let success_count = self.results.iter().filter(|t| t.success).count();
    trace!("Tracked {}/{} points.", success_count, self.results.len());

    let mut out = Vec::with_capacity(per_box_points.len());
    let mut offset = 0;
    for points in per_box_points {
      out.push(self.results[offset..offset + points.len()].to_vec());
      offset += points.len();
    }

    let old = mem::replace(&mut self.state, TrackerState::Ready { previous: current });
    self.retire(old);
    Ok(out)
  }

  fn build_pyramid(&mut self, frame: &InputFrame) -> TrackingResult<Pyramid> {
    let mut unused_pyramid = self.unused_pyramid.take();
    let unused_image = unused_pyramid.as_mut().and_then(|p| p.take_base());
    let image = frame.to_image(unused_image)?;
    Pyramid::new(image, unused_pyramid, self.level_count)
  }

  fn retire(&mut self, state: TrackerState) {
    if let TrackerState::Ready { previous } = state {
      self.unused_pyramid = Some(previous);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::image::testing::*;

  fn frame_data(shift: Vector2d) -> Vec<u8> {
    textured_image(160, 120, shift).data
  }

  #[test]
  fn test_not_initialized() {
    let mut tracker = OpticalFlowTracker::new(&ParameterSet::default()).unwrap();
    let data = frame_data(Vector2d::zeros());
    let frame = InputFrame::gray(&data, 160, 120);
    let points = vec![vec![Vector2d::new(50., 50.)]];
    assert_eq!(tracker.track(&frame, &points), Err(TrackingError::NotInitialized));

    tracker.init(&frame).unwrap();
    assert!(tracker.is_ready());
    assert!(tracker.track(&frame, &points).is_ok());

    tracker.reset();
    assert!(!tracker.is_ready());
    assert_eq!(tracker.track(&frame, &points), Err(TrackingError::NotInitialized));
  }

  #[test]
  fn test_no_points() {
    let mut tracker = OpticalFlowTracker::new(&ParameterSet::default()).unwrap();
    let data = frame_data(Vector2d::zeros());
    let frame = InputFrame::gray(&data, 160, 120);
    tracker.init(&frame).unwrap();
    assert_eq!(tracker.track(&frame, &[]), Err(TrackingError::NoPointsToTrack));
    assert_eq!(tracker.track(&frame, &[vec![], vec![]]), Err(TrackingError::NoPointsToTrack));
    assert!(tracker.is_ready());
  }

  #[test]
  fn test_grouping_preserved() {
    let mut tracker = OpticalFlowTracker::new(&ParameterSet::default()).unwrap();
    let data = frame_data(Vector2d::zeros());
    let frame = InputFrame::gray(&data, 160, 120);
    tracker.init(&frame).unwrap();
    let points = vec![
      vec![Vector2d::new(40., 40.), Vector2d::new(45., 42.)],
      vec![],
      vec![Vector2d::new(100., 60.), Vector2d::new(-20., 5.), Vector2d::new(80., 80.)],
    ];
    let results = tracker.track(&frame, &points).unwrap();
    assert_eq!(results.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![2, 0, 3]);
    for (group, input) in results.iter().zip(points.iter()) {
      for (t, p) in group.iter().zip(input.iter()) {
        if t.success {
          assert!((t.point - p).norm() < 1e-6);
        }
      }
    }
    assert!(!results[2][1].success);
    assert!(results[2][0].success);
  }

  #[test]
  fn test_previous_frame_is_swapped() {
    let mut tracker = OpticalFlowTracker::new(&ParameterSet::default()).unwrap();
    let step = Vector2d::new(2., 1.);
    let a = frame_data(Vector2d::zeros());
    let b = frame_data(step);
    let c = frame_data(2. * step);
    tracker.init(&InputFrame::gray(&a, 160, 120)).unwrap();

    let points = vec![vec![Vector2d::new(60., 50.), Vector2d::new(90., 70.)]];
    let results = tracker.track(&InputFrame::gray(&b, 160, 120), &points).unwrap();
    let moved: Vec<Vector2d> = results[0].iter().map(|t| {
      assert!(t.success);
      t.point
    }).collect();

    // The second step must compare against frame `b`, not `a`.
    let results = tracker.track(&InputFrame::gray(&c, 160, 120), &[moved.clone()]).unwrap();
    for (t, p) in results[0].iter().zip(moved.iter()) {
      assert!(t.success);
      assert!((t.point - p - step).norm() < 0.5);
    }
  }

  #[test]
  fn test_invalid_frame_keeps_state() {
    let mut tracker = OpticalFlowTracker::new(&ParameterSet::default()).unwrap();
    let data = frame_data(Vector2d::zeros());
    tracker.init(&InputFrame::gray(&data, 160, 120)).unwrap();
    let points = vec![vec![Vector2d::new(50., 50.)]];
    assert!(matches!(
      tracker.track(&InputFrame::gray(&data[..100], 160, 120), &points),
      Err(TrackingError::InvalidBufferLength { .. }),
    ));
    let results = tracker.track(&InputFrame::gray(&data, 160, 120), &points).unwrap();
    assert!(results[0][0].success);
  }
}
