//! Domain types for Reef Player

mod ids;
mod track;

pub use ids::TrackId;
pub use track::{Track, TrackIndex};
