//! C API for the echoframe echo cancellation pipeline.
//!
//! # Symbol prefix
//!
//! - Functions: `aec3_*`
//! - Types: `Aec3*`
//!
//! # Thread safety
//!
//! **NOT thread-safe.** All calls on the same [`Aec3Handle`] must be
//! serialized by the caller. Distinct handles share no state.

pub mod functions;
pub mod types;

mod panic_guard;

pub use functions::*;
pub use types::{Aec3Config, Aec3Error, Aec3Handle, Aec3Stats};
