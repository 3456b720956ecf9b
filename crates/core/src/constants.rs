//! Shared constants for micmeter sampling and reporting.

/// Sample rate used for microphone capture (48kHz)
pub const SAMPLE_RATE: u32 = 48_000;

/// Default analysis window length in samples (~43ms at 48kHz)
pub const DEFAULT_WINDOW_LEN: usize = 2048;

/// Smallest accepted analysis window
pub const MIN_WINDOW_LEN: usize = 32;

/// Largest accepted analysis window
pub const MAX_WINDOW_LEN: usize = 32_768;

/// Floor added to the RMS before taking the logarithm so silence maps
/// to a finite reading (about -120 dB) instead of negative infinity.
pub const DB_EPSILON: f32 = 1e-6;

/// Default sampling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 200;

/// Default weight of the previous reading in the smoothed display level
pub const DEFAULT_SMOOTHING: f32 = 0.3;

/// Default number of readings kept for the rolling average
pub const DEFAULT_HISTORY_LEN: usize = 50;

/// Lower edge of the display range for level bars (dB)
pub const METER_FLOOR_DB: f32 = -100.0;

/// Center value of an unsigned 8-bit waveform sample
pub const BYTE_MIDPOINT: f32 = 128.0;
