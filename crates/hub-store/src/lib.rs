//! # hub-store
//!
//! A self-contained persistence service for InfluenceHub.
//!
//! Rows live as JSON documents in SQLite, media in a directory tree, and
//! every mutation is echoed on an in-process change bus. [`LocalBackend`]
//! ties the three together behind the boundary traits from `hub-shared`, so
//! the client core can run against it exactly as it would against the
//! hosted service.

pub mod blobs;
pub mod database;
pub mod feed;
pub mod local;
pub mod migrations;
pub mod rows;

mod error;

pub use blobs::BlobStore;
pub use database::Database;
pub use error::StoreError;
pub use feed::ChangeBus;
pub use local::LocalBackend;
