//! # Notion Provider
//!
//! Implements `FileRepository` for a Notion database.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated listing of active rows keyed by their `RelativeID`
//! - Row creation and update with automatic parent-folder rows
//! - Parent relation written under `ítem principal` or `Parent item`, with
//!   a fallback chain that ends with no relation
//! - Soft deletion through the `archived` flag
//! - Schema bootstrap that creates the self relation when missing

pub mod error;
pub mod repository;
pub mod types;

pub use error::{NotionError, Result};
pub use repository::{
    NotionRepository, RelationTarget, NOTION_VERSION, RELATION_PROPERTY_EN,
    RELATION_PROPERTY_ES,
};
pub use types::DatabaseId;
