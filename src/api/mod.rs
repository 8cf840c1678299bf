//! Simulated backend: routes, fault-injecting transport and handlers.

mod client;
pub mod handlers;
mod route;
mod transport;

pub use client::ApiClient;
pub use route::Route;
pub use transport::{FaultSettings, Outcome, ScriptedTransport, SimulatedTransport, Transport};
