use crate::sampler::silence_db;
use crossbeam_channel::{Sender, TrySendError};
use log::warn;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Output port for loudness readings.
///
/// The sampling thread calls `deliver` once per tick with the raw
/// reading. Each reading replaces the previous one as far as consumers
/// are concerned, so implementations may drop readings they cannot take,
/// but they must never block.
pub trait LevelSink {
    fn deliver(&mut self, db: f32);
}

/// Adapts any closure into a sink, for callers that just want the number.
pub struct FnSink<F: FnMut(f32)>(pub F);

impl<F: FnMut(f32)> LevelSink for FnSink<F> {
    fn deliver(&mut self, db: f32) {
        (self.0)(db)
    }
}

/// Cloneable cell holding the most recent reading as `f32` bits.
///
/// Readers poll `level_db` from any thread without locking. Starts at
/// the silence floor until the first reading arrives.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(silence_db().to_bits())),
        }
    }

    pub fn set_db(&self, db: f32) {
        self.level_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn level_db(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelSink for LiveMeter {
    fn deliver(&mut self, db: f32) {
        self.set_db(db);
    }
}

/// Feeds readings into a bounded channel without ever blocking.
///
/// A full channel drops the incoming reading, not the queued ones.
/// A disconnected receiver disables the sink after a single warning.
pub struct ChannelSink {
    tx: Sender<f32>,
    disconnected: bool,
}

impl ChannelSink {
    pub fn new(tx: Sender<f32>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl LevelSink for ChannelSink {
    fn deliver(&mut self, db: f32) {
        if self.disconnected {
            return;
        }
        if let Err(TrySendError::Disconnected(_)) = self.tx.try_send(db) {
            warn!("Reading receiver disconnected, disabling sink");
            self.disconnected = true;
        }
    }
}
