//! Domain logic for the ABRAhub generation platform.
//!
//! This crate holds everything that does not touch I/O: the error taxonomy,
//! shared type aliases, plan/metering policy, reference-type resolution for
//! generation requests, retry classification for the model provider, and the
//! on-disk rendition layout for generated images.

pub mod error;
pub mod plan;
pub mod reference;
pub mod retry;
pub mod storage;
pub mod types;
