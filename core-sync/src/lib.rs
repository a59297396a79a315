//! # Sync Module
//!
//! Mirrors a local directory tree into a remote table, one way.
//!
//! ## Components
//!
//! - **Record Factory** (`factory`): Builds root-relative snapshots of local entries
//!   and filters hidden and temporary files
//! - **Synchronizer** (`synchronizer`): Runs the fetch, walk and reconcile pass
//!   against any [`FileRepository`](bridge_traits::storage::FileRepository)

pub mod error;
pub mod factory;
pub mod synchronizer;

pub use error::{Result, SyncError};
pub use factory::FileRecordFactory;
pub use synchronizer::{SyncReport, Synchronizer};
