use crate::all::*;

// Row-major grayscale image storage.
// Could also have used nalebgra::DMatrix, but the pyramid and the frame
// conversion only need flat byte access.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl Image {
  pub fn empty() -> Image {
    Image {
      data: vec![],
      width: 0,
      height: 0,
    }
  }

  pub fn new(width: usize, height: usize, data: Vec<u8>) -> TrackingResult<Image> {
    if data.len() != width * height {
      return Err(TrackingError::InvalidBufferLength {
        expected: width * height,
        actual: data.len(),
      });
    }
    Ok(Image { data, width, height })
  }

  pub fn from_fn<F: Fn(usize, usize) -> u8>(width: usize, height: usize, f: F) -> Image {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
      for x in 0..width {
        data.push(f(x, y));
      }
    }
    Image { data, width, height }
  }

  // Resize keeping the allocation. Contents are unspecified afterwards.
  pub fn reset(&mut self, width: usize, height: usize) {
    self.data.clear();
    self.data.resize(width * height, 0);
    self.width = width;
    self.height = height;
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
    self.data[y * self.width + x] = value;
  }

  // True when `p` lies within the pixel centers of the image.
  pub fn contains(&self, p: Vector2d) -> bool {
    p[0] >= 0. && p[1] >= 0.
      && p[0] <= (self.width as f64 - 1.)
      && p[1] <= (self.height as f64 - 1.)
  }

  // Bilinear sampling, coordinates outside the image are clamped to the border.
  #[inline(always)]
  pub fn bilinear(&self, u: Vector2d) -> f64 {
    let max_x = (self.width - 1) as f64;
    let max_y = (self.height - 1) as f64;
    let x = u[0].max(0.).min(max_x);
    let y = u[1].max(0.).min(max_y);
    let x0 = x as usize;
    let y0 = y as usize;
    let x1 = usize::min(x0 + 1, self.width - 1);
    let y1 = usize::min(y0 + 1, self.height - 1);
    let xa = x - x0 as f64;
    let ya = y - y0 as f64;
    (1. - xa) * (1. - ya) * self.value(x0, y0) as f64
      + xa * (1. - ya) * self.value(x1, y0) as f64
      + (1. - xa) * ya * self.value(x0, y1) as f64
      + xa * ya * self.value(x1, y1) as f64
  }
}

// Element access in the manner of `image[y][x]`.
impl Index<usize> for Image {
  type Output = [u8];
  fn index(&self, y: usize) -> &Self::Output {
    &self.data[y * self.width .. (y + 1) * self.width]
  }
}
