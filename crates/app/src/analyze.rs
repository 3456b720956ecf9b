//! Offline loudness reports for audio files.
//!
//! Folds every sample of a file into one RMS figure on the same decibel
//! scale the live meter uses, alongside the basic stream metadata. WAV
//! files are read directly with hound; compressed formats (mp3, ogg,
//! flac) go through symphonia's probe.

use crate::display::round2;
use anyhow::{ensure, Context, Result};
use hound::{SampleFormat, WavReader};
use micmeter_core::db_from_rms;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Overall loudness report for an audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioReport {
    pub db: f32,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bit depth as declared by the container, absent for lossy codecs.
    pub bits_per_sample: Option<u16>,
}

/// Computes the overall RMS loudness of WAV data from any reader.
///
/// Integer formats are normalized by their full scale, floats taken
/// as-is, and all channels contribute to a single mean square.
pub fn analyze_wav<R: Read>(reader: R) -> Result<AudioReport> {
    let mut reader = WavReader::new(reader).context("Failed to read WAV header")?;
    let spec = reader.spec();
    ensure!(spec.sample_rate > 0, "WAV reports a zero sample rate");
    ensure!(
        (1..=32).contains(&spec.bits_per_sample),
        "unsupported bit depth: {}",
        spec.bits_per_sample
    );
    let frames = reader.duration();

    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    match spec.sample_format {
        SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                let sample = f64::from(sample.context("Failed to decode sample")?);
                sum_squares += sample * sample;
                count += 1;
            }
        }
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            for sample in reader.samples::<i32>() {
                let sample = f64::from(sample.context("Failed to decode sample")?) / full_scale;
                sum_squares += sample * sample;
                count += 1;
            }
        }
    }

    let rms = if count == 0 {
        0.0
    } else {
        (sum_squares / count as f64).sqrt() as f32
    };

    Ok(AudioReport {
        db: db_from_rms(rms),
        duration_secs: f64::from(frames) / f64::from(spec.sample_rate),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: Some(spec.bits_per_sample),
    })
}

/// Computes the overall RMS loudness of any stream symphonia can probe.
///
/// Every packet is decoded to interleaved `f32` and folded into the same
/// mean square the WAV path accumulates. Packets that fail to decode are
/// skipped.
pub fn analyze_media(source: Box<dyn MediaSource>, hint: Hint) -> Result<AudioReport> {
    let mss = MediaSourceStream::new(source, Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe the audio format")?;
    let mut format = probed.format;

    let track = format.default_track().context("No audio track found")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Stream does not declare a sample rate")?;
    let channels = track
        .codec_params
        .channels
        .context("Stream does not declare its channel layout")?
        .count();
    ensure!(channels > 0, "stream declares an empty channel layout");
    let bits_per_sample = track.codec_params.bits_per_sample.map(|bits| bits as u16);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("No decoder available for this codec")?;

    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                for &sample in buf.samples() {
                    let sample = f64::from(sample);
                    sum_squares += sample * sample;
                    count += 1;
                }
            }
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    let rms = if count == 0 {
        0.0
    } else {
        (sum_squares / count as f64).sqrt() as f32
    };
    let frames = count / channels;

    Ok(AudioReport {
        db: db_from_rms(rms),
        duration_secs: frames as f64 / f64::from(sample_rate),
        sample_rate,
        channels: channels as u16,
        bits_per_sample,
    })
}

/// Analyzes an audio file on disk, picking the decoder by extension.
pub fn analyze_file(path: &Path) -> Result<AudioReport> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    match ext.as_deref() {
        Some("wav") => analyze_wav(BufReader::new(file)),
        _ => {
            let mut hint = Hint::new();
            if let Some(ext) = ext.as_deref() {
                hint.with_extension(ext);
            }
            analyze_media(Box::new(file), hint)
        }
    }
}

pub fn print_report(report: &AudioReport) {
    println!("Duration:    {:.2} s", report.duration_secs);
    println!("Sample rate: {} Hz", report.sample_rate);
    println!("Channels:    {}", report.channels);
    if let Some(bits) = report.bits_per_sample {
        println!("Bit depth:   {}", bits);
    }
    println!("Sound level: {:.2} dB", round2(report.db));
}
