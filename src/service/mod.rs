//! Service layer
//!
//! The sync loop and the console report built on top of it.

pub mod report;
pub mod sync;

pub use report::{render_collection_stats, render_filter_options, render_summary};
pub use sync::{SyncOptions, SyncStats, Synchronizer};
