//! Utility modules

pub mod cache_key;

pub use cache_key::{cache_key, CacheParams, FileFingerprint};
