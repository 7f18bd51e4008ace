//! Integration tests for Marquee
//!
//! These tests drive the pipeline end to end through the catalog service and
//! the HTTP router, with scripted upstream pages and metadata.

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/catalog_serving.rs"]
mod catalog_serving;
#[path = "integration/classification_flow.rs"]
mod classification_flow;
#[path = "integration/persistence.rs"]
mod persistence;
