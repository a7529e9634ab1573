//! Client-side views computed from backend document lists.

pub mod selector;
pub mod stats;

pub use selector::{select, FileFilter};
pub use stats::{compute_stats, DashboardStats};
