//! Cached queries and mutations over the simulated backend.

mod cached_client;
mod reorder;

pub use cached_client::CachedClient;
pub use reorder::{ReorderContext, ReorderJob};
