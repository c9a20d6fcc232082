// Bounding box tracking for video annotation: pyramidal Lucas-Kanade point
// tracking followed by a per-box rigid motion fit.

#[macro_use] extern crate lazy_static;

pub mod all;
pub mod annotation;
pub mod bbox;
pub mod box_tracker;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod image;
pub mod optical_flow;
pub mod parameters;
pub mod pyramid;
pub mod sampler;
pub mod tracker;
pub mod types;
pub mod util;
pub mod video;
