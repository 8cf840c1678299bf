//! Client-side query cache.
//!
//! Modeled on TanStack Query: views are cached by [`QueryKey`], fetched
//! cache-first, and mutations write into the cache directly or mark keys
//! stale.

mod client;
mod key;
mod state;

pub use client::{CacheEvent, QueryClient};
pub use key::{QueryKey, CANDIDATE_LISTS, JOB_LISTS};
pub use state::{CacheResult, CacheSource, QueryState};
