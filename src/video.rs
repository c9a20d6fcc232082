use crate::all::*;

use std::io::ErrorKind;
use std::process::{Child, Command, Stdio};

// Raw frames of fixed size, either decoded by an `ffmpeg` child process or
// read directly from an uncompressed stream.
pub struct VideoInput {
  source: Box<dyn Read>,
  child: Option<Child>,
  data: Vec<u8>,
  pub width: usize,
  pub height: usize,
  pub format: PixelFormat,
}

impl VideoInput {
  pub fn ffmpeg(path: &Path, width: usize, height: usize, format: PixelFormat) -> Result<VideoInput> {
    let path = path.to_str().ok_or(anyhow!("Failed to parse video path."))?;
    let scale = format!("scale={}:{}", width, height);
    let mut child = Command::new("ffmpeg")
      .args(["-loglevel", "error", "-i", path, "-vf", scale.as_str(), "-f", "rawvideo"])
      .args(["-vcodec", "rawvideo", "-vsync", "vfr", "-pix_fmt", format.ffmpeg_name(), "-"])
      .stdout(Stdio::piped())
      .spawn()
      .context("Failed to start ffmpeg.")?;
    let stdout = child.stdout.take().ok_or(anyhow!("Failed to capture ffmpeg output."))?;
    let mut input = VideoInput::from_reader(Box::new(stdout), width, height, format);
    input.child = Some(child);
    Ok(input)
  }

  pub fn raw(path: &Path, width: usize, height: usize, format: PixelFormat) -> Result<VideoInput> {
    let file = File::open(path)
      .context(format!("Failed to open raw video {}.", path.display()))?;
    Ok(VideoInput::from_reader(Box::new(BufReader::new(file)), width, height, format))
  }

  pub fn from_reader(source: Box<dyn Read>, width: usize, height: usize, format: PixelFormat) -> VideoInput {
    VideoInput {
      source,
      child: None,
      data: vec![],
      width,
      height,
      format,
    }
  }

  // Returns `None` at the end of the stream. A truncated last frame is
  // dropped.
  pub fn read(&mut self) -> Result<Option<InputFrame>> {
    let n = self.width * self.height * self.format.bytes_per_pixel();
    if self.data.len() != n {
      self.data.resize(n, 0);
    }
    match self.source.read_exact(&mut self.data) {
      Ok(()) => {},
      Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
      Err(err) => return Err(err).context("Reading bytes from video input failed."),
    }
    Ok(Some(InputFrame {
      data: &self.data,
      width: self.width,
      height: self.height,
      format: self.format,
    }))
  }
}

impl Drop for VideoInput {
  fn drop(&mut self) {
    if let Some(child) = &mut self.child {
      if let Err(err) = child.kill().and_then(|_| child.wait()) {
        debug!("Failed to stop ffmpeg: {}", err);
      }
    }
  }
}
