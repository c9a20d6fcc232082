use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
  #[error("Invalid dimensions {width}x{height} with {levels} pyramid levels.")]
  InvalidDimensions { width: usize, height: usize, levels: usize },

  #[error("Pixel buffer has {actual} bytes, expected {expected}.")]
  InvalidBufferLength { expected: usize, actual: usize },

  #[error("Sample grid needs at least 2 points per dimension, got {0}.")]
  InvalidSampleGrid(usize),

  #[error("Tracker has not been initialized with a first frame.")]
  NotInitialized,

  #[error("No points to track.")]
  NoPointsToTrack,

  #[error("Invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("Point pair count mismatch: {before} before, {after} after.")]
  InvalidPointPairs { before: usize, after: usize },
}

pub type TrackingResult<T> = std::result::Result<T, TrackingError>;
