//! Reef Player Core
//!
//! Domain types shared across the Reef Player crates.
//!
//! This crate defines:
//! - **Identifiers**: [`TrackId`]
//! - **Domain Types**: [`Track`]
//! - **Capability Traits**: [`TrackResolver`]
//!
//! It deliberately knows nothing about playback, audio I/O, or persistence
//! encodings; those concerns live in the crates that consume these types.

#![forbid(unsafe_code)]

pub mod traits;
pub mod types;

pub use traits::TrackResolver;
pub use types::{Track, TrackId, TrackIndex};
