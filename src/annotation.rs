use crate::all::*;

// One line of the annotation input: boxes drawn (or corrected) by the user at
// video frame `frame`. They replace the tracked boxes from that frame on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
  pub frame: usize,
  pub boxes: Vec<BoundingBox>,
}

// One line of output per processed frame, `null` for boxes lost in the frame.
#[derive(Serialize)]
struct TrackingRecord<'a> {
  frame: usize,
  boxes: &'a [Option<BoundingBox>],
}

pub struct AnnotationInput<R: BufRead> {
  reader: R,
  line: String,
  pending: Option<AnnotationRecord>,
  last_frame: Option<usize>,
}

impl AnnotationInput<BufReader<File>> {
  pub fn open(path: &Path) -> Result<AnnotationInput<BufReader<File>>> {
    let file = File::open(path)
      .context(format!("Failed to open annotations {}.", path.display()))?;
    Ok(AnnotationInput::new(BufReader::new(file)))
  }
}

impl<R: BufRead> AnnotationInput<R> {
  pub fn new(reader: R) -> AnnotationInput<R> {
    AnnotationInput {
      reader,
      line: String::new(),
      pending: None,
      last_frame: None,
    }
  }

  // Not using `impl Iterator` to allow returning `Result`.
  // End of data is signaled by `Result::Ok(Option::None)`.
  pub fn next(&mut self) -> Result<Option<AnnotationRecord>> {
    if let Some(record) = self.pending.take() {
      return Ok(Some(record));
    }
    loop {
      self.line.clear();
      match self.reader.read_line(&mut self.line) {
        Ok(0) => return Ok(None),
        Err(err) => bail!("Failed to read line. {}", err),
        _ => {},
      }
      if self.line.trim().is_empty() { continue }
      let record: AnnotationRecord = serde_json::from_str(&self.line)
        .context(format!("AnnotationInput::next JSON deserialization failed for line: {}", self.line))?;
      if let Some(last_frame) = self.last_frame {
        if record.frame <= last_frame {
          warn!("Ignoring unordered/duplicated annotation for frame {}.", record.frame);
          continue;
        }
      }
      self.last_frame = Some(record.frame);
      return Ok(Some(record));
    }
  }

  // Boxes annotated for exactly `frame`, if any. Records for frames already
  // passed are skipped.
  pub fn take_for_frame(&mut self, frame: usize) -> Result<Option<Vec<BoundingBox>>> {
    while let Some(record) = self.next()? {
      if record.frame < frame {
        warn!("Skipping annotation for already processed frame {}.", record.frame);
        continue;
      }
      if record.frame == frame {
        return Ok(Some(record.boxes));
      }
      self.pending = Some(record);
      break;
    }
    Ok(None)
  }
}

pub fn write_record<W: Write>(out: &mut W, frame: usize, boxes: &[Option<BoundingBox>]) -> Result<()> {
  let record = TrackingRecord { frame, boxes };
  serde_json::to_writer(&mut *out, &record).context("Failed to serialize tracking results.")?;
  writeln!(out)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  const INPUT: &str = r#"{"frame": 0, "boxes": [{"id": 1, "x": 10, "y": 20, "width": 30, "height": 40}]}

{"frame": 5, "boxes": [{"id": 1, "x": 12, "y": 20, "width": 30, "height": 40, "blocked": true}]}
{"frame": 3, "boxes": []}
{"frame": 9, "boxes": []}
"#;

  #[test]
  fn test_take_for_frame() {
    let mut input = AnnotationInput::new(Cursor::new(INPUT));
    let boxes = input.take_for_frame(0).unwrap().unwrap();
    assert_eq!(boxes, vec![BoundingBox::new(1, 10., 20., 30., 40.)]);
    for frame in 1..5 {
      assert_eq!(input.take_for_frame(frame).unwrap(), None);
    }
    let boxes = input.take_for_frame(5).unwrap().unwrap();
    assert!(boxes[0].blocked);
    assert_eq!(boxes[0].x, 12.);
    // Frame 3 is out of order and dropped.
    assert_eq!(input.take_for_frame(9).unwrap(), Some(vec![]));
    assert_eq!(input.next().unwrap(), None);
  }

  #[test]
  fn test_invalid_line() {
    let mut input = AnnotationInput::new(Cursor::new("{\"frame\": \"x\"}\n"));
    assert!(input.next().is_err());
  }

  #[test]
  fn test_write_record() {
    let mut out = vec![];
    let boxes = vec![Some(BoundingBox::new(3, 1., 2., 3., 4.)), None];
    write_record(&mut out, 7, &boxes).unwrap();
    let s = String::from_utf8(out).unwrap();
    assert_eq!(
      s,
      "{\"frame\":7,\"boxes\":[{\"id\":3,\"x\":1.0,\"y\":2.0,\"width\":3.0,\"height\":4.0,\"visible\":true,\"blocked\":false},null]}\n",
    );
  }
}
