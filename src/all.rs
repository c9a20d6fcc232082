// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  annotation::*,
  bbox::*,
  box_tracker::*,
  error::*,
  estimator::*,
  frame::*,
  image::*,
  optical_flow::*,
  parameters::*,
  pyramid::*,
  sampler::*,
  tracker::*,
  types::*,
  util::*,
  video::*,
};

pub use {
  std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    ops::Index,
    path::{Path, PathBuf},
  },
  log::{debug, error, info, trace, warn, LevelFilter},
  nalgebra::DMatrix,
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
  serde::{Deserialize, Serialize},
};
