//! Fault-injecting transport between the API client and the route handlers.

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use super::route::Route;
use crate::error::{Error, Result};

/// Carries a request to the backend.
///
/// Resolving `Ok` means the handler may run; `Err` means the server answered
/// with an error instead and the handler must not touch the store.
pub trait Transport: Send + Sync {
  fn deliver(&self, route: Route) -> BoxFuture<'_, Result<()>>;
}

fn server_error(route: Route) -> Error {
  Error::Transport {
    route: route.name(),
    message: "Internal Server Error: Something went wrong".to_string(),
  }
}

/// Settings for [`SimulatedTransport`]
#[derive(Debug, Clone)]
pub struct FaultSettings {
  pub min_latency: Duration,
  pub max_latency: Duration,
  /// Applies to every route unless overridden in `route_error_rates`
  pub error_rate: Option<f64>,
  pub route_error_rates: BTreeMap<Route, f64>,
  pub seed: Option<u64>,
}

impl Default for FaultSettings {
  fn default() -> Self {
    Self {
      min_latency: Duration::from_millis(200),
      max_latency: Duration::from_millis(1200),
      error_rate: None,
      route_error_rates: BTreeMap::new(),
      seed: None,
    }
  }
}

impl FaultSettings {
  /// Effective failure probability for `route`, always within `0.0..=1.0`.
  /// A NaN rate counts as never failing.
  pub fn error_rate_for(&self, route: Route) -> f64 {
    let rate = self
      .route_error_rates
      .get(&route)
      .copied()
      .or(self.error_rate)
      .unwrap_or_else(|| route.default_error_rate());
    if rate.is_nan() {
      0.0
    } else {
      rate.clamp(0.0, 1.0)
    }
  }
}

/// Adds random latency and fails a share of calls per route.
pub struct SimulatedTransport {
  settings: FaultSettings,
  rng: Mutex<StdRng>,
}

impl SimulatedTransport {
  pub fn new(settings: FaultSettings) -> Self {
    let rng = match settings.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Self {
      settings,
      rng: Mutex::new(rng),
    }
  }

  fn roll(&self, route: Route) -> (Duration, bool) {
    let min = self.settings.min_latency;
    let max = self.settings.max_latency.max(min);
    let rate = self.settings.error_rate_for(route);

    // A poisoned rng is still a usable rng
    let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
    let latency = if max > min { rng.gen_range(min..=max) } else { min };
    let fail = rng.gen_bool(rate);
    (latency, fail)
  }
}

impl Transport for SimulatedTransport {
  fn deliver(&self, route: Route) -> BoxFuture<'_, Result<()>> {
    let (latency, fail) = self.roll(route);
    Box::pin(async move {
      tokio::time::sleep(latency).await;
      let latency_ms = latency.as_millis() as u64;
      if fail {
        warn!(route = route.name(), latency_ms, "injected server error");
        Err(server_error(route))
      } else {
        debug!(route = route.name(), latency_ms, "delivered");
        Ok(())
      }
    })
  }
}

/// Scripted outcome for one call through a [`ScriptedTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Deliver,
  Fail,
  DeliverAfter(Duration),
  FailAfter(Duration),
}

/// Deterministic transport: calls follow a script, then succeed immediately.
#[derive(Default)]
pub struct ScriptedTransport {
  script: Mutex<VecDeque<Outcome>>,
  calls: Mutex<Vec<Route>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue outcomes for the next calls, in order.
  pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
    let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
    script.extend(outcomes);
  }

  pub fn fail_next(&self) {
    self.script([Outcome::Fail]);
  }

  /// Routes called so far, in order
  pub fn calls(&self) -> Vec<Route> {
    self
      .calls
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }
}

impl Transport for ScriptedTransport {
  fn deliver(&self, route: Route) -> BoxFuture<'_, Result<()>> {
    self
      .calls
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(route);
    let outcome = self
      .script
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .pop_front()
      .unwrap_or(Outcome::Deliver);

    Box::pin(async move {
      match outcome {
        Outcome::Deliver => Ok(()),
        Outcome::Fail => Err(server_error(route)),
        Outcome::DeliverAfter(delay) => {
          tokio::time::sleep(delay).await;
          Ok(())
        }
        Outcome::FailAfter(delay) => {
          tokio::time::sleep(delay).await;
          Err(server_error(route))
        }
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quiet(error_rate: f64) -> FaultSettings {
    FaultSettings {
      min_latency: Duration::ZERO,
      max_latency: Duration::ZERO,
      error_rate: Some(error_rate),
      route_error_rates: BTreeMap::new(),
      seed: Some(7),
    }
  }

  #[tokio::test]
  async fn test_never_fails_at_zero_rate() {
    let transport = SimulatedTransport::new(quiet(0.0));
    for _ in 0..50 {
      assert!(transport.deliver(Route::ReorderJob).await.is_ok());
    }
  }

  #[tokio::test]
  async fn test_always_fails_at_full_rate() {
    let transport = SimulatedTransport::new(quiet(1.0));
    let err = transport.deliver(Route::ListJobs).await.unwrap_err();
    assert!(err.is_transient());
  }

  #[test]
  fn test_route_override_wins() {
    let mut settings = quiet(0.5);
    settings.route_error_rates.insert(Route::ReorderJob, 0.9);
    assert_eq!(settings.error_rate_for(Route::ReorderJob), 0.9);
    assert_eq!(settings.error_rate_for(Route::ListJobs), 0.5);

    let defaults = FaultSettings::default();
    assert_eq!(defaults.error_rate_for(Route::ReorderJob), 0.15);
    assert_eq!(defaults.error_rate_for(Route::CreateJob), 0.08);
  }

  #[tokio::test]
  async fn test_out_of_range_rates_are_usable() {
    let mut settings = quiet(f64::NAN);
    settings.route_error_rates.insert(Route::ListJobs, 3.0);
    assert_eq!(settings.error_rate_for(Route::GetJob), 0.0);
    assert_eq!(settings.error_rate_for(Route::ListJobs), 1.0);

    let transport = SimulatedTransport::new(settings);
    assert!(transport.deliver(Route::GetJob).await.is_ok());
    assert!(transport.deliver(Route::ListJobs).await.is_err());
  }

  #[tokio::test]
  async fn test_scripted_outcomes_then_default() {
    let transport = ScriptedTransport::new();
    transport.script([Outcome::Fail, Outcome::Deliver]);

    assert!(transport.deliver(Route::GetJob).await.is_err());
    assert!(transport.deliver(Route::GetJob).await.is_ok());
    assert!(transport.deliver(Route::ListUsers).await.is_ok());
    assert_eq!(
      transport.calls(),
      vec![Route::GetJob, Route::GetJob, Route::ListUsers]
    );
  }
}
