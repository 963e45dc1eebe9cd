//! One ingestion run per trigger: fetch, parse, merge, persist, report.
//!
//! A run never fails. Fetch and parse failures fall back to a synthetic
//! record, persistence failures leave the in-memory history authoritative,
//! and every outcome is described by the returned `RunStatus`. A stored
//! history that could not be loaded is never overwritten.

use chrono::{DateTime, FixedOffset, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::messages::{DataSource, Notice, RunStatus};
use shared::models::WindObservation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::retention::{merge, RetentionPolicy};
use crate::source::PageSource;
use crate::store::ObservationStore;
use crate::strategies::{run_chain, ParseContext};
use crate::synthetic;
use crate::text::to_plain_text;

pub const FALLBACK_NOTICE: &str = "Using fallback data - website structure may have changed";
pub const PERSIST_FAILED_NOTICE: &str = "Failed to persist wind history";
pub const HISTORY_UNAVAILABLE_NOTICE: &str =
    "Stored wind history unavailable - new data not saved";

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct OwnerSlot {
    /// `None` until loaded from the store.
    history: Option<Vec<WindObservation>>,
    last_update_millis: Option<i64>,
    status: Option<RunStatus>,
}

#[derive(Default)]
struct OwnerState {
    in_flight: AtomicBool,
    slot: Mutex<OwnerSlot>,
}

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Pipeline {
    source: Arc<dyn PageSource>,
    store: Arc<dyn ObservationStore>,
    policy: RetentionPolicy,
    offset: FixedOffset,
    rng: Mutex<StdRng>,
    clock: Clock,
    owners: Mutex<HashMap<String, Arc<OwnerState>>>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn PageSource>,
        store: Arc<dyn ObservationStore>,
        config: &Config,
    ) -> Self {
        Pipeline {
            source,
            store,
            policy: RetentionPolicy::from(config),
            offset: config.source_offset(),
            rng: Mutex::new(StdRng::from_os_rng()),
            clock: Box::new(Utc::now),
            owners: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    fn owner(&self, owner_id: &str) -> Arc<OwnerState> {
        let mut owners = self.owners.lock().unwrap_or_else(|e| e.into_inner());
        owners.entry(owner_id.to_string()).or_default().clone()
    }

    #[cfg(test)]
    pub fn is_running(&self, owner_id: &str) -> bool {
        self.owner(owner_id).in_flight.load(Ordering::Acquire)
    }

    /// Retained history, loading it from the store on first access.
    pub async fn history(&self, owner_id: &str) -> Vec<WindObservation> {
        let owner = self.owner(owner_id);
        self.load_history(owner_id, &owner)
            .await
            .unwrap_or_default()
    }

    /// Status of the last completed run.
    pub fn status(&self, owner_id: &str) -> Option<RunStatus> {
        let owner = self.owner(owner_id);
        let slot = owner.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.status.clone()
    }

    /// Last run time, or the newest loaded record before any run.
    pub fn last_update_millis(&self, owner_id: &str) -> Option<i64> {
        let owner = self.owner(owner_id);
        let slot = owner.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.last_update_millis
    }

    /// `None` when the store could not be read. Not cached, so the next
    /// access tries the store again.
    async fn load_history(
        &self,
        owner_id: &str,
        owner: &OwnerState,
    ) -> Option<Vec<WindObservation>> {
        {
            let slot = owner.slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(history) = &slot.history {
                return Some(history.clone());
            }
        }

        match self.store.load(owner_id).await {
            Ok(history) => {
                log::info!(
                    "Loaded {} wind observations for {}",
                    history.len(),
                    owner_id
                );
                let mut slot = owner.slot.lock().unwrap_or_else(|e| e.into_inner());
                slot.last_update_millis = history.first().map(|o| o.timestamp_millis);
                slot.history = Some(history.clone());
                Some(history)
            }
            Err(e) => {
                log::warn!("Failed to load wind history for {}: {:#}", owner_id, e);
                None
            }
        }
    }

    fn synthetic(&self, owner_id: &str, now: DateTime<Utc>) -> WindObservation {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        synthetic::generate(&mut *rng, owner_id, now.with_timezone(&self.offset))
    }

    /// Run the pipeline once for `owner_id`. Returns `None` without doing
    /// anything when a run for that owner is already in flight.
    pub async fn run(&self, owner_id: &str) -> Option<RunStatus> {
        let owner = self.owner(owner_id);
        let Some(_in_flight) = InFlight::acquire(&owner.in_flight) else {
            log::info!("Refresh for {} already in flight, skipping", owner_id);
            return None;
        };

        let loaded = self.load_history(owner_id, &owner).await;
        let history_known = loaded.is_some();
        let history = loaded.unwrap_or_default();
        let source_name = self.source.name();
        let mut notices = Vec::new();
        let ctx = ParseContext {
            owner_id: owner_id.to_string(),
            offset: self.offset,
            limit: self.policy.limit,
        };

        let (candidates, source, connected) = match self.source.fetch().await {
            Ok(raw) => match run_chain(&to_plain_text(&raw), &ctx) {
                Some(parsed) => (
                    parsed.observations,
                    DataSource::Live {
                        strategy: parsed.strategy.to_string(),
                    },
                    true,
                ),
                None => {
                    log::warn!("No wind data found in page from {}", source_name);
                    notices.push(Notice::warning(FALLBACK_NOTICE));
                    let now = (self.clock)();
                    (
                        vec![self.synthetic(owner_id, now)],
                        DataSource::Fallback,
                        true,
                    )
                }
            },
            Err(e) => {
                log::error!("Failed to scrape wind data: {:#}", e);
                notices.push(Notice::warning(format!(
                    "Failed to scrape wind data from {}",
                    source_name
                )));
                let now = (self.clock)();
                (
                    vec![self.synthetic(owner_id, now)],
                    DataSource::Disconnected,
                    false,
                )
            }
        };

        let new_records = candidates.len();
        let merged = merge(&history, candidates, &self.policy);

        let persisted = if !history_known {
            log::warn!(
                "Not saving wind history for {}: stored history was not loaded",
                owner_id
            );
            notices.push(Notice::warning(HISTORY_UNAVAILABLE_NOTICE));
            false
        } else {
            match self.store.save(owner_id, &merged).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Failed to save wind history for {}: {:#}", owner_id, e);
                    notices.push(Notice::warning(PERSIST_FAILED_NOTICE));
                    false
                }
            }
        };

        if connected {
            let text = format!(
                "Updated with {} new data points from {}",
                new_records, source_name
            );
            log::info!("{} ({} retained for {})", text, merged.len(), owner_id);
            notices.push(Notice::info(text));
        }

        let now_millis = (self.clock)().timestamp_millis();
        let status = RunStatus {
            owner_id: owner_id.to_string(),
            connected,
            last_update_millis: Some(now_millis),
            source,
            new_records,
            retained: merged.len(),
            persisted,
            notices,
        };

        let mut slot = owner.slot.lock().unwrap_or_else(|e| e.into_inner());
        if history_known {
            slot.history = Some(merged);
        }
        slot.last_update_millis = Some(now_millis);
        slot.status = Some(status.clone());

        Some(status)
    }

    /// Run now, then every `interval`, forever. Each run is spawned so a slow
    /// fetch does not delay the schedule; overlapping ticks are skipped by
    /// the in-flight guard.
    pub async fn watch(self: Arc<Self>, owner_id: String, interval: Duration) {
        let interval = interval.max(Duration::from_secs(1));
        log::info!("Watching {} every {:?}", owner_id, interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let pipeline = self.clone();
            let owner_id = owner_id.clone();
            tokio::spawn(async move {
                pipeline.run(&owner_id).await;
            });
        }
    }
}
