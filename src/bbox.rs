use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub u64);

impl fmt::Display for BoxId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

// Axis-aligned box in frame pixel coordinates, `(x, y)` is the top-left corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub id: BoxId,
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
  #[serde(default = "default_visible")]
  pub visible: bool,
  #[serde(default)]
  pub blocked: bool,
}

fn default_visible() -> bool { true }

impl BoundingBox {
  pub fn new(id: u64, x: f64, y: f64, width: f64, height: f64) -> BoundingBox {
    BoundingBox {
      id: BoxId(id),
      x,
      y,
      width,
      height,
      visible: true,
      blocked: false,
    }
  }

  // Boxes hidden or blocked by the annotator are carried along untouched.
  pub fn is_active(&self) -> bool {
    self.visible && !self.blocked
  }

  pub fn corners(&self) -> [Vector2d; 4] {
    [
      Vector2d::new(self.x, self.y),
      Vector2d::new(self.x + self.width, self.y),
      Vector2d::new(self.x, self.y + self.height),
      Vector2d::new(self.x + self.width, self.y + self.height),
    ]
  }
}

// Moves `bbox` by `transform` and keeps it inside the frame. `None` means
// tracking was lost for the box in this frame: the result would have had no
// area left. Without a transform the box is returned as is.
pub fn update_box(
  bbox: &BoundingBox,
  transform: Option<&Transform>,
  frame_width: usize,
  frame_height: usize,
  border_width: usize,
) -> Option<BoundingBox> {
  let transform = match transform {
    Some(t) => t,
    None => return Some(bbox.clone()),
  };
  let limit_x = frame_width as f64 - 2. * border_width as f64;
  let limit_y = frame_height as f64 - 2. * border_width as f64;
  if limit_x <= 0. || limit_y <= 0. { return None }

  let mut min = Vector2d::repeat(f64::INFINITY);
  let mut max = Vector2d::repeat(f64::NEG_INFINITY);
  for corner in bbox.corners() {
    let p = transform.apply(corner);
    min = min.inf(&p);
    max = max.sup(&p);
  }
  let min_x = min[0].round().clamp(0., limit_x);
  let min_y = min[1].round().clamp(0., limit_y);
  let max_x = max[0].round().clamp(0., limit_x);
  let max_y = max[1].round().clamp(0., limit_y);
  let width = max_x - min_x;
  let height = max_y - min_y;
  if !(width > 0.) || !(height > 0.) {
    return None;
  }
  Some(BoundingBox {
    x: min_x,
    y: min_y,
    width,
    height,
    ..bbox.clone()
  })
}
