//! Sheet-driven content publishing workflow.
//!
//! Rows are pulled from a content store, normalized and grouped by content id,
//! filtered for eligibility, rendered, handed to per-platform publishers, and
//! the outcomes written back. `dispatch::run_workflow` is the entry point for
//! adapters; everything it needs arrives through an explicit `Config`.
pub mod config;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod model;
pub mod normalize;
pub mod publish;
pub mod render;
pub mod report;
pub mod store;

pub use config::Config;
pub use dispatch::{run_with, run_workflow};
pub use error::RunError;
pub use model::{GroupReport, GroupStatus, Platform, PlatformResult, RunOptions, RunReport};
