// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Matrix2d = nalgebra::Matrix2::<f64>;
pub type Matrixd = nalgebra::DMatrix::<f64>;

// Sample points live in frame pixel coordinates, (0, 0) being the center of
// the top-left pixel.
pub type SamplePoint = Vector2d;
