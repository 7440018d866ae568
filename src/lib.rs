//! Terminal explorer for bucket storage usage.
//!
//! Directory listings and per-tier summaries come from the metadata API
//! through [`client::DataSource`]. [`navigation::Navigator`] owns the path
//! stack, and [`bucket::bucket`] reduces a listing to the treemap dataset.

pub mod bucket;
pub mod chart_tree;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod model;
pub mod navigation;
pub mod render_tree;
pub mod treemap;

pub use error::{Error, Result};
