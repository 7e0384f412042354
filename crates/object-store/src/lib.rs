//! SQLite + Object Storage Backend
//!
//! This crate provides the production [`StorageBackend`](common::backend::StorageBackend)
//! for linx-gate: SQLite for per-file metadata and pluggable object storage
//! (S3/MinIO/local filesystem/memory) for file bytes.
//!
//! # Features
//!
//! - SHA-256 content hashes computed on ingestion, served as ETags
//! - Single byte-range reads straight from object storage
//! - Corrupt metadata rows are reported, never silently served
//! - Multiple storage backends: S3, MinIO, local filesystem, in-memory

mod database;
mod error;
mod file_store;
mod storage;

pub use error::{Result, StoreError};
pub use file_store::{FileOptions, FileStore};
pub use storage::ObjectStoreConfig;
