//! Magic Link Generation
//!
//! Strategy for turning a root-relative identifier into the URL stored on a
//! remote row, so the row can open the local entry.

use crate::error::Result;
use crate::storage::RelativeId;

/// Link generation strategy
///
/// Implementations must be deterministic: the same identifier always yields
/// the same URL.
pub trait LinkGenerator: Send + Sync {
    fn generate(&self, relative_path: &RelativeId) -> Result<String>;
}
