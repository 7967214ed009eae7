//! Ordered fallback over persistence strategies.
//!
//! The resolver serializes the catalog once and hands the payload to each
//! applicable strategy in turn. The first strategy that saves, or fails
//! terminally, decides the outcome.
//!
//! Concurrent saves of an identical payload share one in-flight run, so a
//! double click never produces two POSTs. Runs for different payloads are
//! queued behind each other in call order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use herbari_core::environment::Environment;
use herbari_core::import::serialize_catalog;
use herbari_core::model::PlantRecord;

use crate::error::PersistError;
use crate::handle::{HandleSlot, HeldFileStrategy};
use crate::legacy::LegacyEndpointStrategy;
use crate::strategy::{Attempt, NoOpStrategy, PersistStrategy, SaveOutcome, StrategyKind};

type SharedSave = Shared<BoxFuture<'static, SaveOutcome>>;

struct InFlight {
    payload: Arc<str>,
    future: SharedSave,
}

pub struct PersistenceResolver {
    environment: Environment,
    strategies: Arc<[Arc<dyn PersistStrategy>]>,
    in_flight: Mutex<Option<InFlight>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl PersistenceResolver {
    /// Build a resolver over `strategies`, tried in the given order.
    pub fn new(environment: Environment, strategies: Vec<Arc<dyn PersistStrategy>>) -> Self {
        Self {
            environment,
            strategies: strategies.into(),
            in_flight: Mutex::new(None),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// The standard chain: held file, legacy endpoint (when configured),
    /// no-op.
    pub fn standard(
        environment: Environment,
        handles: Arc<HandleSlot>,
        legacy: Option<LegacyEndpointStrategy>,
    ) -> Self {
        let mut strategies: Vec<Arc<dyn PersistStrategy>> =
            vec![Arc::new(HeldFileStrategy::new(handles))];
        if let Some(legacy) = legacy {
            strategies.push(Arc::new(legacy));
        }
        strategies.push(Arc::new(NoOpStrategy));
        Self::new(environment, strategies)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Serialize `records` and record them with the first strategy that
    /// succeeds.
    ///
    /// Only a serialization failure is an `Err`; every strategy result is
    /// reported through [`SaveOutcome`].
    pub async fn save(&self, records: &[PlantRecord]) -> Result<SaveOutcome, PersistError> {
        let payload = serialize_catalog(records)?;
        Ok(self.save_payload(payload).await)
    }

    /// Record an already serialized catalog.
    pub async fn save_payload(&self, payload: impl Into<Arc<str>>) -> SaveOutcome {
        let payload = payload.into();
        let future = {
            let mut slot = self.lock_in_flight();
            match slot.as_ref() {
                Some(current) if *current.payload == *payload => {
                    tracing::debug!("Joining in-flight save of identical catalog");
                    current.future.clone()
                }
                _ => {
                    let future = run_chain(
                        self.environment,
                        Arc::clone(&self.strategies),
                        Arc::clone(&self.gate),
                        Arc::clone(&payload),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        payload,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        let outcome = future.clone().await;

        let mut slot = self.lock_in_flight();
        if slot
            .as_ref()
            .is_some_and(|current| Shared::ptr_eq(&current.future, &future))
        {
            *slot = None;
        }
        outcome
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_chain(
    environment: Environment,
    strategies: Arc<[Arc<dyn PersistStrategy>]>,
    gate: Arc<tokio::sync::Mutex<()>>,
    payload: Arc<str>,
) -> SaveOutcome {
    let _turn = gate.lock().await;

    for strategy in strategies.iter() {
        let kind = strategy.kind();
        if !strategy.is_applicable(&environment) {
            tracing::trace!(strategy = %kind, "Strategy not applicable");
            continue;
        }

        match strategy.attempt(&payload).await {
            Attempt::Saved(outcome) => {
                tracing::info!(strategy = %kind, bytes = payload.len(), "Catalog save resolved");
                return outcome;
            }
            Attempt::Fallthrough(reason) => {
                tracing::debug!(strategy = %kind, %reason, "Strategy unavailable, trying next");
            }
            Attempt::Failed(e) => {
                tracing::warn!(strategy = %kind, error = %e, "Catalog save failed");
                return SaveOutcome::Failed {
                    strategy: kind,
                    message: e.to_string(),
                };
            }
        }
    }

    SaveOutcome::Skipped {
        reason: "No persistence strategy is available".into(),
    }
}
