// Colored `LEVEL file:line message` lines for `env_logger`.
pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  let mut style = buf.style();
  use env_logger::fmt::Color::*;
  use log::Level::*;
  style.set_color(match record.level() {
    Error => Red,
    Warn => Yellow,
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });

  let s = format!("{:<5} {:30}{}",
    record.level(),
    format!("{}:{}",
      record.file().unwrap_or("?"),
      record.line().unwrap_or(0),
    ),
    record.args()
  );
  writeln!(buf, "{}", style.value(s))
}

pub fn init_logging(level: log::LevelFilter) {
  // Ignores repeated initialization.
  let _ = env_logger::Builder::new()
    .filter_level(level)
    .format(format_log)
    .try_init();
}
