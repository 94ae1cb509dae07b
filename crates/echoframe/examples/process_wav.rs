//! Run echo cancellation over a pair of WAV files.
//!
//! Both inputs must be 16-bit PCM with the same rate and channel count. The
//! reference file holds what was played out, the capture file what the
//! microphone recorded.
//!
//! ```sh
//! cargo run -p echoframe --features examples --example process_wav -- \
//!     --reference far.wav --capture near.wav --output out.wav
//! ```

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;

use echoframe::{LINEAR_OUTPUT_RATE_HZ, LINEAR_OUTPUT_SAMPLES, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(about = "Remove the echo of a reference recording from a capture recording")]
struct Args {
    /// Far-end (played out) recording.
    #[arg(long)]
    reference: String,

    /// Near-end (microphone) recording.
    #[arg(long)]
    capture: String,

    /// Path for the processed capture.
    #[arg(long, default_value = "processed.wav")]
    output: String,

    /// Optional path for the 16 kHz linear filter output.
    #[arg(long)]
    linear_output: Option<String>,

    /// Suppression level in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    suppression_level: f32,

    /// Render-to-capture buffering delay in ms.
    #[arg(long, default_value_t = 0)]
    buffer_delay: i32,
}

fn read_samples(path: &str) -> Result<(WavSpec, Vec<i16>)> {
    let mut reader = WavReader::open(path).with_context(|| format!("opening {path}"))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!("{path}: expected 16-bit PCM, got {spec:?}");
    }
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading {path}"))?;
    Ok((spec, samples))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let (spec, reference) = read_samples(&args.reference)?;
    let (capture_spec, capture) = read_samples(&args.capture)?;
    ensure!(
        spec.sample_rate == capture_spec.sample_rate && spec.channels == capture_spec.channels,
        "reference and capture formats differ: {spec:?} vs {capture_spec:?}"
    );

    let config = SessionConfig {
        sample_rate_hz: spec.sample_rate,
        num_channels: usize::from(spec.channels),
        export_linear: args.linear_output.is_some(),
        suppression_level: args.suppression_level,
    };
    let mut session = Session::new(&config).context("creating session")?;
    let frame_size = session.frame_size();
    let chunk = frame_size * config.num_channels;
    info!(
        sample_rate_hz = config.sample_rate_hz,
        num_channels = config.num_channels,
        tier = ?session.suppression_tier().kind,
        "processing"
    );

    let mut writer = WavWriter::create(&args.output, spec)?;
    let mut linear_writer = args
        .linear_output
        .as_deref()
        .map(|path| {
            let linear_spec = WavSpec {
                channels: 1,
                sample_rate: LINEAR_OUTPUT_RATE_HZ,
                ..spec
            };
            WavWriter::create(path, linear_spec)
        })
        .transpose()?;

    let mut output = vec![0i16; chunk];
    let mut linear = vec![0i16; LINEAR_OUTPUT_SAMPLES];
    let mut frames = 0usize;
    // Trailing samples that do not fill a whole frame are dropped.
    for (reference, capture) in reference.chunks_exact(chunk).zip(capture.chunks_exact(chunk)) {
        let linear_output = linear_writer.is_some().then_some(linear.as_mut_slice());
        session.process(
            reference,
            capture,
            &mut output,
            linear_output,
            frame_size,
            args.buffer_delay,
        )?;
        for &s in &output {
            writer.write_sample(s)?;
        }
        if let Some(linear_writer) = &mut linear_writer {
            for &s in &linear {
                linear_writer.write_sample(s)?;
            }
        }
        frames += 1;
    }

    writer.finalize()?;
    if let Some(linear_writer) = linear_writer {
        linear_writer.finalize()?;
    }
    info!(frames, stats = ?session.statistics(), "done");
    Ok(())
}
