//! # Host Bridge Traits
//!
//! Capability contracts shared by the sync core and its adapters.
//!
//! ## Overview
//!
//! The core never talks to the network or to a concrete remote store
//! directly. It is handed implementations of the traits below at startup:
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP transport
//! - [`FileRepository`](storage::FileRepository) - Remote table mirroring the local tree
//! - [`LinkGenerator`](links::LinkGenerator) - URL strategy for the "magic link" column
//!
//! The data model exchanged across these seams ([`FileRecord`](storage::FileRecord),
//! [`RelativeId`](storage::RelativeId)) lives here as well.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters convert
//! their own error types into it at the boundary.

pub mod error;
pub mod http;
pub mod links;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use links::LinkGenerator;
pub use storage::{FileRecord, FileRepository, RelativeId, UpsertOutcome, DIRECTORY_EXTENSION};
