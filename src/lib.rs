//! Hiring-pipeline tracker over a simulated backend.
//!
//! Jobs, candidates and assessments live in a local SQLite document store.
//! Every call reaches that store through a transport that adds latency and
//! random server errors, and a client-side query cache keeps fetched views
//! with optimistic updates layered on top.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod ordering;
pub mod query;
pub mod seed;

pub use error::{Error, Result};
