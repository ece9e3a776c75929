//! Fotofest Processing Library
//!
//! Image re-encoding for storage: each compression class maps to a fixed
//! quality/max-dimension profile applied before a write.

pub mod compression;

pub use compression::{
    CompressionEngine, CompressionOutcome, CompressionProfile, CompressionProfiles,
};
