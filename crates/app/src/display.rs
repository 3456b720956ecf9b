use anyhow::Result;
use micmeter_core::constants::METER_FLOOR_DB;
use micmeter_core::{LevelSink, LevelTracker};
use std::io::{self, Write};

/// Width of the terminal level bar in characters.
const BAR_WIDTH: usize = 30;

/// Status lines are padded to this width so shorter lines fully
/// overwrite longer ones when rewriting in place.
const LINE_WIDTH: usize = 78;

/// Rounds a reading to two decimals, ties away from zero.
pub(crate) fn round2(db: f32) -> f64 {
    (f64::from(db) * 100.0).round() / 100.0
}

/// Display text for a reading, e.g. `dB: -42.17`.
pub fn format_reading(db: f32) -> String {
    format!("dB: {:.2}", round2(db))
}

/// ASCII level bar over the display range, floor to 0 dB.
fn level_bar(db: f32, width: usize) -> String {
    let fraction = ((db - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0);
    let filled = ((fraction * width as f32).round() as usize).min(width);

    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for i in 0..width {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');
    bar
}

/// Terminal sink: rewrites a single status line per reading.
///
/// The printed value is always the raw reading; the bar and the rolling
/// statistics follow the smoothed level so the display does not jitter.
pub struct ConsoleSink {
    tracker: LevelTracker,
    show_bar: bool,
    wrote_line: bool,
}

impl ConsoleSink {
    pub fn new(smoothing: f32, history_len: usize, show_bar: bool) -> Result<Self> {
        Ok(Self {
            tracker: LevelTracker::new(smoothing, history_len)?,
            show_bar,
            wrote_line: false,
        })
    }

    fn render(&mut self, db: f32) -> String {
        let smoothed = self.tracker.update(db);
        let mut line = String::new();
        if self.show_bar {
            line.push_str(&level_bar(smoothed, BAR_WIDTH));
            line.push(' ');
        }
        line.push_str(&format_reading(db));
        if let (Some(avg), Some(peak)) = (self.tracker.average(), self.tracker.peak()) {
            line.push_str(&format!(
                "  avg: {:.2}  max: {:.2}",
                round2(avg),
                round2(peak)
            ));
        }
        line
    }
}

impl LevelSink for ConsoleSink {
    fn deliver(&mut self, db: f32) {
        let line = self.render(db);
        let mut out = io::stdout();
        let _ = write!(out, "\r{:<width$}", line, width = LINE_WIDTH);
        let _ = out.flush();
        self.wrote_line = true;
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        // Leave the last reading on its own line instead of under the cursor.
        if self.wrote_line {
            println!();
        }
    }
}

/// Machine-readable sink: one JSON object per reading on stdout.
pub struct JsonSink;

impl LevelSink for JsonSink {
    fn deliver(&mut self, db: f32) {
        let mut out = io::stdout();
        let _ = writeln!(out, "{}", serde_json::json!({ "db": db }));
        let _ = out.flush();
    }
}
