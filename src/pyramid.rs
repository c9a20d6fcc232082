use crate::all::*;

// Level 0 is the full resolution grayscale frame, each following level halves
// the previous one (rounding up).
pub struct Pyramid {
  pub levels: Vec<Image>,
}

impl Pyramid {
  // Takes ownership of `image` as level 0. Level buffers of `unused_pyramid`
  // are reused to avoid allocating on every frame.
  pub fn new(
    image: Image,
    unused_pyramid: Option<Pyramid>,
    level_count: usize,
  ) -> TrackingResult<Pyramid> {
    if image.width == 0 || image.height == 0 || level_count < 1 {
      return Err(TrackingError::InvalidDimensions {
        width: image.width,
        height: image.height,
        levels: level_count,
      });
    }
    if image.data.len() != image.width * image.height {
      return Err(TrackingError::InvalidBufferLength {
        expected: image.width * image.height,
        actual: image.data.len(),
      });
    }
    let mut unused_levels = unused_pyramid.map(|x| x.levels).unwrap_or_default().into_iter();
    let mut levels = Vec::with_capacity(level_count);
    levels.push(image);
    for level_ind in 1..level_count {
      let mut child = unused_levels.next().unwrap_or_else(Image::empty);
      downscale(&levels[level_ind - 1], &mut child);
      levels.push(child);
    }
    Ok(Pyramid { levels })
  }

  pub fn build(data: &[u8], width: usize, height: usize, level_count: usize) -> TrackingResult<Pyramid> {
    if width == 0 || height == 0 || level_count < 1 {
      return Err(TrackingError::InvalidDimensions { width, height, levels: level_count });
    }
    Pyramid::new(Image::new(width, height, data.to_vec())?, None, level_count)
  }

  pub fn level_count(&self) -> usize {
    self.levels.len()
  }

  pub fn get_level(&self, level: usize) -> &Image {
    &self.levels[level]
  }

  // Detaches the full resolution level so that its buffer can hold the next
  // frame. The remaining levels are still usable as `unused_pyramid`.
  pub fn take_base(&mut self) -> Option<Image> {
    if self.levels.is_empty() { None } else { Some(self.levels.remove(0)) }
  }
}

// 2x2 box filter. On odd sizes the last row and column are repeated.
fn downscale(parent: &Image, child: &mut Image) {
  let w = (parent.width + 1) / 2;
  let h = (parent.height + 1) / 2;
  child.reset(w, h);
  for y in 0..h {
    let y0 = 2 * y;
    let y1 = usize::min(y0 + 1, parent.height - 1);
    for x in 0..w {
      let x0 = 2 * x;
      let x1 = usize::min(x0 + 1, parent.width - 1);
      let sum = parent.value(x0, y0) as u32
        + parent.value(x1, y0) as u32
        + parent.value(x0, y1) as u32
        + parent.value(x1, y1) as u32;
      child.set_value(x, y, ((sum + 2) / 4) as u8);
    }
  }
}
