//! HTTP client for the document-processing backend.

pub mod client;
pub mod endpoints;

pub use client::{ApiClient, ListQuery};
