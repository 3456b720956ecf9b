use crate::constants::{BYTE_MIDPOINT, DB_EPSILON};
use crate::window::{validate_window_len, AnalysisWindow};
use anyhow::Result;

/// Converts a linear RMS amplitude (full scale 1.0) to decibels.
///
/// The `DB_EPSILON` term keeps the logarithm finite for silent input; it
/// is not a calibration reference, so readings are relative rather than
/// dB(SPL).
pub fn db_from_rms(rms: f32) -> f32 {
    20.0 * (rms + DB_EPSILON).log10()
}

/// Reading reported for silence, about -120 dB.
pub fn silence_db() -> f32 {
    db_from_rms(0.0)
}

/// RMS loudness of float samples (full scale 1.0) in decibels.
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return silence_db();
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    db_from_rms(mean_square.sqrt())
}

/// Loudness of one byte-domain frame (unsigned samples centered at 128).
///
/// Each sample is normalized via `(s - 128) / 128`, the normalized values
/// are squared and averaged, and the reading is `20 * log10(rms + eps)`.
/// Depends only on the frame contents, so equal frames always produce
/// equal readings.
pub fn sample(frame: &[u8]) -> f32 {
    if frame.is_empty() {
        return silence_db();
    }
    let sum_squares: f32 = frame
        .iter()
        .map(|&s| {
            let normalized = (f32::from(s) - BYTE_MIDPOINT) / BYTE_MIDPOINT;
            normalized * normalized
        })
        .sum();
    db_from_rms((sum_squares / frame.len() as f32).sqrt())
}

/// Owns the fixed byte frame examined on every sampling tick.
///
/// The frame is allocated once and overwritten in place, so steady-state
/// sampling does not allocate.
pub struct LoudnessSampler {
    frame: Box<[u8]>,
}

impl LoudnessSampler {
    pub fn new(window_len: usize) -> Result<Self> {
        validate_window_len(window_len)?;
        Ok(Self {
            frame: vec![BYTE_MIDPOINT as u8; window_len].into_boxed_slice(),
        })
    }

    pub fn window_len(&self) -> usize {
        self.frame.len()
    }

    /// Byte waveform captured by the last `sample_window` call.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Snapshots the current waveform out of `window` and computes the
    /// loudness reading for it.
    pub fn sample_window(&mut self, window: &AnalysisWindow) -> f32 {
        window.copy_bytes(&mut self.frame);
        sample(&self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_wave(len: usize) -> Vec<u8> {
        (0..len).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect()
    }

    // ── Pure loudness math ───────────────────────────────────────

    #[test]
    fn test_silence_reads_the_epsilon_floor() {
        assert_eq!(sample(&[128u8; 2048]), silence_db());
        assert!(
            (silence_db() + 120.0).abs() < 1e-3,
            "floor should sit at about -120 dB, got {}",
            silence_db()
        );
    }

    #[test]
    fn test_empty_frame_reads_the_epsilon_floor() {
        assert_eq!(sample(&[]), silence_db());
    }

    #[test]
    fn test_full_scale_square_wave() {
        // Normalized amplitudes are -1.0 and 127/128, so the mean square
        // is (1 + 0.9921875^2) / 2 and the reading lands at -0.0339 dB.
        let db = sample(&square_wave(2048));
        assert!((db + 0.0339).abs() < 1e-3, "expected about -0.0339 dB, got {}", db);
    }

    #[test]
    fn test_reading_is_independent_of_frame_length() {
        assert!((sample(&[0, 255, 0, 255]) - sample(&square_wave(2048))).abs() < 1e-3);
    }

    #[test]
    fn test_half_scale_amplitude() {
        // 192 normalizes to 0.5, and 20 * log10(0.5) is -6.0206.
        let db = sample(&[192u8; 1024]);
        assert!((db + 6.0206).abs() < 1e-3, "expected about -6.02 dB, got {}", db);
    }

    #[test]
    fn test_halving_deviation_drops_six_db() {
        let wide: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 28 } else { 228 }).collect();
        let narrow: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 78 } else { 178 }).collect();
        let drop = sample(&wide) - sample(&narrow);
        assert!(
            (drop - 6.0206).abs() < 0.01,
            "halving the deviation should cost about 6 dB, got {}",
            drop
        );
    }

    #[test]
    fn test_equal_frames_give_equal_readings() {
        let frame = square_wave(512);
        assert_eq!(sample(&frame), sample(&frame));
    }

    #[test]
    fn test_db_from_rms_at_unity() {
        assert!(db_from_rms(1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rms_db_of_floats() {
        assert_eq!(rms_db(&[]), silence_db());
        let db = rms_db(&[0.5; 128]);
        assert!((db + 6.0206).abs() < 1e-3, "expected about -6.02 dB, got {}", db);
    }

    // ── LoudnessSampler ──────────────────────────────────────────

    #[test]
    fn test_sampler_window_bounds() {
        assert!(LoudnessSampler::new(16).is_err());
        assert!(LoudnessSampler::new(2048).is_ok());
        assert!(LoudnessSampler::new(100_000).is_err());
    }

    #[test]
    fn test_unfed_window_samples_as_silence() {
        let window = AnalysisWindow::new(2048).unwrap();
        let mut sampler = LoudnessSampler::new(2048).unwrap();
        assert_eq!(sampler.sample_window(&window), silence_db());
    }

    #[test]
    fn test_sample_window_tracks_newest_audio() {
        let mut window = AnalysisWindow::new(32).unwrap();
        let mut sampler = LoudnessSampler::new(32).unwrap();

        window.push(&[0.0; 32]);
        let quiet = sampler.sample_window(&window);
        assert_eq!(quiet, silence_db());

        let loud_input: Vec<f32> = (0..32).map(|i| if i % 2 == 0 { -1.0 } else { 1.0 }).collect();
        window.push(&loud_input);
        let loud = sampler.sample_window(&window);
        assert!((loud + 0.0339).abs() < 1e-3, "expected about -0.0339 dB, got {}", loud);
        assert_eq!(sampler.frame().len(), 32);
    }
}
