pub mod constants;
pub mod sampler;
pub mod sink;
pub mod tracker;
pub mod window;

pub use sampler::{db_from_rms, rms_db, sample, silence_db, LoudnessSampler};
pub use sink::{ChannelSink, FnSink, LevelSink, LiveMeter};
pub use tracker::LevelTracker;
pub use window::AnalysisWindow;
