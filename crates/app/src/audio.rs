use anyhow::{ensure, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use micmeter_core::constants::SAMPLE_RATE;
use micmeter_core::{AnalysisWindow, LevelSink, LiveMeter, LoudnessSampler};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Boxed sink the sampling thread takes ownership of.
pub type BoxedSink = Box<dyn LevelSink + Send>;

/// How many samples get drained from the capture ring per read.
const DRAIN_CHUNK: usize = 1024;

/// Live metering engine.
///
/// Owns the microphone capture stream and a sampling thread that emits
/// one loudness reading per interval to every registered sink. Both run
/// until `stop` is called or the engine is dropped.
pub struct MeterEngine {
    _input_stream: cpal::Stream,
    is_running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    meter: LiveMeter,
}

impl MeterEngine {
    /// Acquires the default microphone and starts metering.
    ///
    /// Fails with the denial reason when no capture stream can be
    /// opened; in that case no sampling thread is spawned and no
    /// reading is ever delivered.
    pub fn start(
        interval: Duration,
        window_len: usize,
        mut sinks: Vec<BoxedSink>,
    ) -> Result<Self> {
        // Latency management (100ms buffer)
        let buffer_size = (SAMPLE_RATE as usize) / 10;
        let rb = HeapRb::<f32>::new(buffer_size);
        let (mut producer, consumer) = rb.split();

        let meter = LiveMeter::new();
        sinks.push(Box::new(meter.clone()));

        // Validate parameters before touching any audio device.
        let mut sampler_loop = MeterLoop::new(consumer, window_len, interval, sinks)?;

        let host = cpal::default_host();
        info!("Audio host: {}", host.id().name());

        let input_device = host
            .default_input_device()
            .context("No default input device available (microphone missing or capture denied)")?;
        info!(
            "Using input device: {}",
            input_device.name().unwrap_or_default()
        );

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let input_stream = input_device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    let _ = producer.push_slice(data);
                },
                |err| warn!("Input error: {}", err),
                None,
            )
            .context("Failed to open capture stream")?;

        // Start capture before spawning the sampler, so a denied stream
        // means no loop ever runs.
        input_stream
            .play()
            .context("Failed to start capture stream")?;

        let is_running = Arc::new(AtomicBool::new(true));
        let run_flag = is_running.clone();

        let worker = thread::Builder::new()
            .name("micmeter-sampler".into())
            .spawn(move || {
                while run_flag.load(Ordering::Relaxed) {
                    sampler_loop.poll();
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .context("Failed to spawn sampling thread")?;

        Ok(Self {
            _input_stream: input_stream,
            is_running,
            worker: Some(worker),
            meter,
        })
    }

    /// Most recent reading delivered by the sampling thread.
    pub fn level_db(&self) -> f32 {
        self.meter.level_db()
    }

    /// Stops the sampling thread and releases the capture stream.
    pub fn stop(mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Sampling thread panicked during shutdown");
            }
        }
    }
}

impl Drop for MeterEngine {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}

/// Device-free sampling loop: drains captured samples into the analysis
/// window and emits a reading once per interval.
struct MeterLoop<C: Consumer<Item = f32>> {
    consumer: C,
    window: AnalysisWindow,
    sampler: LoudnessSampler,
    sinks: Vec<BoxedSink>,
    interval: Duration,
    last_tick: Instant,
    scratch: [f32; DRAIN_CHUNK],
}

impl<C: Consumer<Item = f32>> MeterLoop<C> {
    fn new(
        consumer: C,
        window_len: usize,
        interval: Duration,
        sinks: Vec<BoxedSink>,
    ) -> Result<Self> {
        ensure!(!interval.is_zero(), "sampling interval must be non-zero");
        Ok(Self {
            consumer,
            window: AnalysisWindow::new(window_len)?,
            sampler: LoudnessSampler::new(window_len)?,
            sinks,
            interval,
            last_tick: Instant::now(),
            scratch: [0.0; DRAIN_CHUNK],
        })
    }

    /// Drains pending capture data, then ticks if the interval elapsed.
    fn poll(&mut self) {
        self.drain();
        if self.last_tick.elapsed() >= self.interval {
            self.tick();
            self.last_tick = Instant::now();
        }
    }

    fn drain(&mut self) {
        loop {
            let read = self.consumer.pop_slice(&mut self.scratch);
            if read == 0 {
                break;
            }
            self.window.push(&self.scratch[..read]);
        }
    }

    /// One sampling step: snapshot the window, compute the reading and
    /// hand it to every sink.
    fn tick(&mut self) {
        let db = self.sampler.sample_window(&self.window);
        for sink in &mut self.sinks {
            sink.deliver(db);
        }
    }
}
