#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod common;
pub mod config;
pub mod echo_control;

mod adaptive_fir_filter;
mod echo_canceller3;
mod echo_remover_metrics;
mod erle_estimator;
mod frequency_regions;
mod nearend_detector;
mod refined_filter_update_gain;
mod render_buffer;
mod suppression_gain;

pub use config::EchoCanceller3Config;
pub use echo_canceller3::{EchoCanceller3, EchoCanceller3Factory};
pub use echo_control::{EchoControl, Metrics};
