//! Container and track writer abstractions
//!
//! The recorder never encodes or muxes; it hands ready samples to the writers
//! defined here.

pub mod traits;
pub mod types;

pub use traits::{ContainerWriter, TrackWriter};
pub use types::{TrackSettings, WriterError, WriterStatus};
