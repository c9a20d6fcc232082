use crate::all::*;

use std::collections::HashMap;

lazy_static! {
  pub static ref PRESETS: HashMap<&'static str, ParameterSet> = {
    let mut m = HashMap::new();
    m.insert("default", ParameterSet::default());
    m.insert("conservative", ParameterSet::conservative());
    m.insert("aggressive", ParameterSet::aggressive());
    m.insert("high_precision", ParameterSet::high_precision());
    m.insert("fast_tracking", ParameterSet::fast_tracking());
    m
  };
}

// Every field is also a command line flag. The clap defaults must agree with
// `Default`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[derive(clap::Args)]
#[serde(default)]
pub struct ParameterSet {
  // Sample grid, `n x n` points per box.
  #[clap(long, default_value = "11")]
  pub points_per_dimension: usize,

  // Pyramidal Lucas-Kanade feature tracker.
  #[clap(long, default_value = "3")]
  pub pyramid_levels: usize,
  #[clap(long, default_value = "30")]
  pub max_iterations: usize,
  #[clap(long, default_value = "31")]
  pub win_size: usize,
  // Pixels at the level being refined.
  #[clap(long, default_value = "0.01")]
  pub convergence_epsilon: f64,
  // Minimum eigenvalue of the spatial gradient matrix per window pixel.
  #[clap(long, default_value = "0.001")]
  pub min_eigenvalue_threshold: f64,

  // Box update.
  #[clap(long, default_value = "1")]
  pub bbox_border_width: usize,
  // Fraction of successfully tracked points below which a box is lost.
  #[clap(long, default_value = "0")]
  pub min_confidence_threshold: f64,

  // Transform estimation.
  #[clap(long, arg_enum, default_value = "translation")]
  pub transform_model: TransformModel,
  #[clap(long)]
  pub outlier_rejection: bool,
  #[clap(long, default_value = "64")]
  pub ransac_iterations: usize,
  #[clap(long, default_value = "2")]
  pub ransac_threshold: f64,
  #[clap(long, default_value = "0")]
  pub ransac_seed: u64,
}

impl Default for ParameterSet {
  fn default() -> ParameterSet {
    ParameterSet {
      points_per_dimension: 11,
      pyramid_levels: 3,
      max_iterations: 30,
      win_size: 31,
      convergence_epsilon: 0.01,
      min_eigenvalue_threshold: 0.001,
      bbox_border_width: 1,
      min_confidence_threshold: 0.,
      transform_model: TransformModel::Translation,
      outlier_rejection: false,
      ransac_iterations: 64,
      ransac_threshold: 2.,
      ransac_seed: 0,
    }
  }
}

impl ParameterSet {
  // Denser grid and a strict success ratio, gives up on a box early.
  pub fn conservative() -> ParameterSet {
    ParameterSet {
      points_per_dimension: 15,
      max_iterations: 50,
      win_size: 21,
      convergence_epsilon: 0.001,
      min_confidence_threshold: 0.6,
      outlier_rejection: true,
      ransac_threshold: 1.,
      ..ParameterSet::default()
    }
  }

  // Large windows and an extra pyramid level for fast motion.
  pub fn aggressive() -> ParameterSet {
    ParameterSet {
      points_per_dimension: 9,
      pyramid_levels: 4,
      max_iterations: 20,
      win_size: 41,
      convergence_epsilon: 0.03,
      min_confidence_threshold: 0.2,
      ..ParameterSet::default()
    }
  }

  pub fn high_precision() -> ParameterSet {
    ParameterSet {
      points_per_dimension: 15,
      max_iterations: 60,
      convergence_epsilon: 0.001,
      min_confidence_threshold: 0.5,
      outlier_rejection: true,
      ransac_iterations: 128,
      ransac_threshold: 1.,
      ..ParameterSet::default()
    }
  }

  pub fn fast_tracking() -> ParameterSet {
    ParameterSet {
      points_per_dimension: 7,
      pyramid_levels: 2,
      max_iterations: 15,
      win_size: 21,
      convergence_epsilon: 0.05,
      min_confidence_threshold: 0.3,
      ..ParameterSet::default()
    }
  }

  pub fn preset(name: &str) -> TrackingResult<ParameterSet> {
    PRESETS.get(name)
      .cloned()
      .ok_or_else(|| TrackingError::InvalidParameter(format!("Unknown preset {}.", name)))
  }

  pub fn preset_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PRESETS.keys().copied().collect();
    names.sort_unstable();
    names
  }

  // Missing fields take their default values.
  pub fn load(path: &Path) -> Result<ParameterSet> {
    let s = std::fs::read_to_string(path)
      .context(format!("Failed to read file {}.", path.display()))?;
    let p: ParameterSet = serde_json::from_str(&s)
      .context(format!("Failed to parse {}.", path.display()))?;
    Ok(p)
  }

  pub fn validate(&self) -> TrackingResult<()> {
    let fail = |s: &str| Err(TrackingError::InvalidParameter(s.to_string()));
    if self.points_per_dimension < 2 {
      return Err(TrackingError::InvalidSampleGrid(self.points_per_dimension));
    }
    if self.pyramid_levels < 1 { return fail("At least one pyramid level is required.") }
    if self.max_iterations < 1 { return fail("At least one Lucas-Kanade iteration is required.") }
    if self.win_size < 3 || self.win_size % 2 != 1 {
      return fail("Lucas-Kanade window size must be an odd number of at least 3.");
    }
    if !(self.convergence_epsilon > 0.) { return fail("Convergence epsilon must be positive.") }
    if !(self.min_eigenvalue_threshold >= 0.) {
      return fail("Minimum eigenvalue threshold must not be negative.");
    }
    if !(0. ..= 1.).contains(&self.min_confidence_threshold) {
      return fail("Minimum confidence threshold must be within [0, 1].");
    }
    if self.outlier_rejection && !(self.ransac_threshold > 0.) {
      return fail("RANSAC threshold must be positive.");
    }
    Ok(())
  }

  pub fn ransac_options(&self) -> RansacOptions {
    RansacOptions {
      iterations: self.ransac_iterations,
      threshold: self.ransac_threshold,
      seed: self.ransac_seed,
    }
  }
}
