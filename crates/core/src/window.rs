use crate::constants::{BYTE_MIDPOINT, MAX_WINDOW_LEN, MIN_WINDOW_LEN};
use anyhow::{ensure, Result};

pub(crate) fn validate_window_len(window_len: usize) -> Result<()> {
    ensure!(
        (MIN_WINDOW_LEN..=MAX_WINDOW_LEN).contains(&window_len),
        "analysis window must be {} to {} samples, got {}",
        MIN_WINDOW_LEN,
        MAX_WINDOW_LEN,
        window_len
    );
    Ok(())
}

/// Fixed-size ring of the most recent capture samples.
///
/// Allocates once at construction and overwrites the oldest sample when
/// full. `copy_bytes` snapshots the window as an unsigned byte waveform
/// centered at 128, which is the domain the loudness math works in.
pub struct AnalysisWindow {
    samples: Box<[f32]>,
    write_idx: usize,
    filled: usize,
}

impl AnalysisWindow {
    pub fn new(window_len: usize) -> Result<Self> {
        validate_window_len(window_len)?;
        Ok(Self {
            samples: vec![0.0; window_len].into_boxed_slice(),
            write_idx: 0,
            filled: 0,
        })
    }

    pub fn window_len(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples captured so far, saturating at the window length.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Appends captured samples, overwriting the oldest once full.
    pub fn push(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.samples[self.write_idx] = sample;
            self.write_idx = (self.write_idx + 1) % self.samples.len();
        }
        self.filled = (self.filled + samples.len()).min(self.samples.len());
    }

    /// Writes the most recent samples into `frame` as byte amplitudes,
    /// oldest first. Positions with nothing captured yet read as 128.
    pub fn copy_bytes(&self, frame: &mut [u8]) {
        let take = frame.len().min(self.filled);
        let lead = frame.len() - take;
        for slot in &mut frame[..lead] {
            *slot = BYTE_MIDPOINT as u8;
        }

        let len = self.samples.len();
        let mut pos = (self.write_idx + len - take) % len;
        for slot in &mut frame[lead..] {
            *slot = to_byte(self.samples[pos]);
            pos = (pos + 1) % len;
        }
    }
}

/// Maps a float sample (full scale 1.0) to the unsigned byte domain.
fn to_byte(sample: f32) -> u8 {
    (BYTE_MIDPOINT * (1.0 + sample)).round().clamp(0.0, 255.0) as u8
}
