//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and container hosts.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `LinkGenerator` as either a passive `file://` URI or an active
//!   localhost-server URL
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileUriGenerator, ReqwestHttpClient};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let links = FileUriGenerator::new("/data/watch");
//! ```

mod http;
mod links;

pub use http::ReqwestHttpClient;
pub use links::{FileUriGenerator, LocalServerLinkGenerator, DEFAULT_LINK_SERVER_PORT};
