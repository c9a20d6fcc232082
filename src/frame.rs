use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ArgEnum)]
pub enum PixelFormat {
  Gray,
  Rgba,
}

impl PixelFormat {
  pub fn bytes_per_pixel(&self) -> usize {
    match self {
      PixelFormat::Gray => 1,
      PixelFormat::Rgba => 4,
    }
  }

  // Name understood by `ffmpeg -pix_fmt`.
  pub fn ffmpeg_name(&self) -> &'static str {
    match self {
      PixelFormat::Gray => "gray",
      PixelFormat::Rgba => "rgba",
    }
  }
}

// Raw pixel buffer of the currently displayed video frame as handed over by
// the frame source.
pub struct InputFrame<'a> {
  pub data: &'a [u8],
  pub width: usize,
  pub height: usize,
  pub format: PixelFormat,
}

impl<'a> InputFrame<'a> {
  pub fn gray(data: &'a [u8], width: usize, height: usize) -> InputFrame<'a> {
    InputFrame { data, width, height, format: PixelFormat::Gray }
  }

  pub fn rgba(data: &'a [u8], width: usize, height: usize) -> InputFrame<'a> {
    InputFrame { data, width, height, format: PixelFormat::Rgba }
  }

  // Converts to a grayscale image. The buffer of `unused_image` is reused
  // when given.
  pub fn to_image(&self, unused_image: Option<Image>) -> TrackingResult<Image> {
    if self.width == 0 || self.height == 0 {
      return Err(TrackingError::InvalidDimensions {
        width: self.width,
        height: self.height,
        levels: 0,
      });
    }
    let expected = self.width * self.height * self.format.bytes_per_pixel();
    if self.data.len() != expected {
      return Err(TrackingError::InvalidBufferLength { expected, actual: self.data.len() });
    }
    let mut image = unused_image.unwrap_or_else(Image::empty);
    image.data.clear();
    match self.format {
      PixelFormat::Gray => image.data.extend_from_slice(self.data),
      PixelFormat::Rgba => {
        image.data.extend(self.data.chunks_exact(4).map(|p| luminance(p[0], p[1], p[2])));
      },
    }
    image.width = self.width;
    image.height = self.height;
    Ok(image)
  }
}

#[inline(always)]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
  let y = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
  y.round().min(255.) as u8
}
