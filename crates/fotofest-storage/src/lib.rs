//! Fotofest Storage Library
//!
//! This crate provides the provider abstraction and the three tier backends:
//! object store (S3-compatible), drive store, and local filesystem.
//!
//! # Logical path format
//!
//! Event photos use `events/{event_id}/{album}/{timestamp}_{random}_{name}.{ext}`,
//! homepage photos use `homepage/{timestamp}_{random}_{name}.{ext}`. The object
//! and local backends store under these paths verbatim so downstream code can
//! treat them as portable; the drive backend mirrors the grouping as a folder
//! hierarchy and returns opaque file ids instead. Paths must not contain `..`
//! or a leading `/`. Path generation is centralized in the `keys` module.

pub mod drive;
pub mod factory;
pub mod keys;
pub mod local;
pub mod object;
pub mod traits;

// Re-export commonly used types
pub use drive::DriveProvider;
pub use factory::build_providers;
pub use fotofest_core::StorageTier;
pub use local::LocalProvider;
pub use object::ObjectStoreProvider;
pub use traits::{
    ContainerRef, ObjectMeta, ProviderAdapter, ProviderError, ProviderResult, PutOutcome,
    StoredObject, UsageSnapshot,
};
