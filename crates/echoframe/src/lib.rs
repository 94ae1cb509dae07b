#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod audio_buffer;
pub mod audio_frame;
pub mod config;
pub mod error;
pub mod high_pass_filter;
pub mod session;
pub mod stats;
pub mod tuning;

mod splitting_filter;
mod three_band_filter_bank;

pub use config::SessionConfig;
pub use error::Error;
pub use session::{LINEAR_OUTPUT_RATE_HZ, LINEAR_OUTPUT_SAMPLES, Session};
pub use stats::EchoStats;
pub use tuning::{SUPPRESSION_TIERS, SuppressionTier, TierKind, TuningProfile};
