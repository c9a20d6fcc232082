use flowbox::all::*;

use clap::Parser;

// Propagates annotated bounding boxes through a video and prints one JSON line
// of tracked boxes per frame.
#[derive(Parser)]
#[clap(name = "flowbox")]
struct Args {
  // Video file, decoded with ffmpeg unless `--raw` is given.
  #[clap(short, long)]
  input: PathBuf,
  // JSONL file of `{"frame": n, "boxes": [...]}` lines.
  #[clap(short, long)]
  annotations: PathBuf,
  #[clap(long)]
  width: usize,
  #[clap(long)]
  height: usize,
  #[clap(long, arg_enum, default_value = "gray")]
  pix_fmt: PixelFormat,
  // Input is a stream of uncompressed frames.
  #[clap(long)]
  raw: bool,
  // Named parameter preset, overrides the parameter flags.
  #[clap(long)]
  preset: Option<String>,
  // JSON parameter file, overrides the preset and the parameter flags.
  #[clap(long)]
  config: Option<PathBuf>,
  #[clap(long, default_value = "info")]
  log_level: LevelFilter,
  #[clap(flatten)]
  parameters: ParameterSet,
}

fn handle_error(err: &anyhow::Error) {
  for (i, e) in err.chain().enumerate() {
    eprintln!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn parameters(args: &Args) -> Result<ParameterSet> {
  if let Some(config) = &args.config {
    return ParameterSet::load(config);
  }
  if let Some(name) = &args.preset {
    return ParameterSet::preset(name)
      .context(format!("Available presets: {}.", ParameterSet::preset_names().join(", ")));
  }
  Ok(args.parameters.clone())
}

fn run() -> Result<()> {
  let args = Args::parse();
  init_logging(args.log_level);

  let parameters = parameters(&args)?;
  debug!("{:?}", parameters);
  let mut box_tracker = BoxTracker::new(parameters)?;
  let mut video = if args.raw {
    VideoInput::raw(&args.input, args.width, args.height, args.pix_fmt)?
  }
  else {
    VideoInput::ffmpeg(&args.input, args.width, args.height, args.pix_fmt)?
  };
  let mut annotations = AnnotationInput::open(&args.annotations)?;

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  let mut boxes: Vec<BoundingBox> = vec![];
  let mut frame_number = 0;
  let mut lost_count = 0;
  while let Some(frame) = video.read()? {
    if let Some(annotated) = annotations.take_for_frame(frame_number)? {
      info!("Frame {}: {} annotated boxes.", frame_number, annotated.len());
      boxes = annotated;
      box_tracker.init(&frame)?;
      let results: Vec<Option<BoundingBox>> = boxes.iter().cloned().map(Some).collect();
      write_record(&mut out, frame_number, &results)?;
    }
    else if box_tracker.is_ready() {
      if boxes.iter().any(|b| b.is_active()) {
        let results = box_tracker.process(&frame, &boxes)
          .context(format!("Tracking failed at frame {}.", frame_number))?;
        write_record(&mut out, frame_number, &results)?;
        // Lost boxes keep their last known position, the next frame samples a
        // fresh grid there.
        for (bbox, result) in boxes.iter_mut().zip(results) {
          match result {
            Some(updated) => *bbox = updated,
            None => lost_count += 1,
          }
        }
      }
      else {
        // Keep the previous frame current for when boxes become active again.
        box_tracker.init(&frame)?;
      }
    }
    frame_number += 1;
  }
  info!("Processed {} frames, {} box losses.", frame_number, lost_count);
  Ok(())
}
