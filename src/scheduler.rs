//! Scheduled generation with a hard cutoff
//!
//! Two states: Armed (interval task running) and Disarmed (terminal). The
//! cutoff is a fixed calendar instant that bounds unattended provider spend.
//! A failed generation is logged and never stops the timer.

use chrono::{DateTime, TimeZone, Utc};
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, DEFAULT_INTERVAL_SECS};
use crate::domain::DomainRegistry;
use crate::generator::Generator;

/// 2026-02-01T00:00:00Z
pub fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub cutoff: DateTime<Utc>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            cutoff: default_cutoff(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.auto_generate,
            interval: config.interval(),
            cutoff: default_cutoff(),
        }
    }
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Generated { invention_id: String, domain_key: String },
    Failed { domain_key: String, message: String },
    /// The cutoff was reached on this tick; the scheduler is now disarmed.
    Disarmed,
    /// Already disarmed; nothing happened.
    Inactive,
}

#[derive(Debug, Default)]
struct Counters {
    generated: AtomicU64,
    failed: AtomicU64,
}

struct Shared {
    generator: Arc<Generator>,
    registry: DomainRegistry,
    clock: Arc<dyn Clock>,
    cutoff: DateTime<Utc>,
    armed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    counters: Counters,
}

impl Shared {
    /// Flip to Disarmed once; later calls are no-ops.
    fn disarm(&self) -> bool {
        let was_armed = self.armed.swap(false, Ordering::SeqCst);
        if was_armed {
            let _ = self.shutdown_tx.send(true);
        }
        was_armed
    }

    /// Uniformly random (key, display name)
    fn pick_domain(&self) -> Option<(&'static str, &'static str)> {
        let keys = self.registry.keys();
        let key = *keys.choose(&mut rand::thread_rng())?;
        let name = self.registry.get(key).map(|info| info.name).unwrap_or(key);
        Some((key, name))
    }

    async fn tick(&self) -> TickOutcome {
        if !self.armed.load(Ordering::SeqCst) {
            return TickOutcome::Inactive;
        }

        if self.clock.now() >= self.cutoff {
            if self.disarm() {
                tracing::info!(cutoff = %self.cutoff, "Auto-generation stopped: reached cutoff date");
                return TickOutcome::Disarmed;
            }
            return TickOutcome::Inactive;
        }

        let Some((domain_key, domain_name)) = self.pick_domain() else {
            tracing::warn!("Domain registry is empty; nothing to generate");
            return TickOutcome::Inactive;
        };

        match self.generator.generate(domain_key, domain_name).await {
            Ok(invention_id) => {
                self.counters.generated.fetch_add(1, Ordering::Relaxed);
                tracing::info!(invention_id = %invention_id, domain = %domain_name, "Auto-generated invention");
                TickOutcome::Generated {
                    invention_id,
                    domain_key: domain_key.to_string(),
                }
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, domain = %domain_key, "Auto-generation error");
                TickOutcome::Failed {
                    domain_key: domain_key.to_string(),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Owned handle to the background generation loop.
///
/// Dropping the handle stops the loop.
pub struct Scheduler {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Build and, unless disabled or past the cutoff, arm the scheduler.
    /// Must be called inside a tokio runtime when it may arm.
    pub fn start(config: SchedulerConfig, registry: DomainRegistry, generator: Arc<Generator>) -> Self {
        Self::start_with_clock(config, registry, generator, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: SchedulerConfig,
        registry: DomainRegistry,
        generator: Arc<Generator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = Self::new_disarmed(&config, registry, generator, clock);
        let now = scheduler.shared.clock.now();

        if !config.enabled {
            tracing::info!("Auto-generation disabled");
            return scheduler;
        }
        if now >= config.cutoff {
            tracing::info!(cutoff = %config.cutoff, "Auto-generation disabled: past cutoff date");
            return scheduler;
        }

        scheduler.shared.armed.store(true, Ordering::SeqCst);
        let task = tokio::spawn(run_loop(
            Arc::clone(&scheduler.shared),
            config.interval,
            scheduler.shared.shutdown_tx.subscribe(),
        ));
        if let Ok(mut slot) = scheduler.task.lock() {
            *slot = Some(task);
        }

        let days_remaining = (config.cutoff - now).num_days();
        tracing::info!(
            interval_secs = config.interval.as_secs(),
            days_remaining,
            cutoff = %config.cutoff,
            "Auto-generation enabled"
        );
        scheduler
    }

    /// Armed state without a timer task, for driving ticks by hand.
    pub fn manual(
        config: SchedulerConfig,
        registry: DomainRegistry,
        generator: Arc<Generator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = Self::new_disarmed(&config, registry, generator, clock);
        scheduler.shared.armed.store(true, Ordering::SeqCst);
        scheduler
    }

    fn new_disarmed(
        config: &SchedulerConfig,
        registry: DomainRegistry,
        generator: Arc<Generator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                generator,
                registry,
                clock,
                cutoff: config.cutoff,
                armed: AtomicBool::new(false),
                shutdown_tx,
                counters: Counters::default(),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.shared.armed.load(Ordering::SeqCst)
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.shared.cutoff
    }

    /// Run one tick now, exactly as the timer would.
    pub async fn tick(&self) -> TickOutcome {
        self.shared.tick().await
    }

    /// (generated, failed) since start
    pub fn counts(&self) -> (u64, u64) {
        (
            self.shared.counters.generated.load(Ordering::Relaxed),
            self.shared.counters.failed.load(Ordering::Relaxed),
        )
    }

    /// Disarm and let the loop exit. An in-flight generation finishes first.
    pub fn stop(&self) {
        if self.shared.disarm() {
            tracing::info!("Scheduler stopped");
        }
    }

    /// Stop and wait for the loop task to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(shared: Arc<Shared>, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    // First tick one full period after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if shared.tick().await == TickOutcome::Disarmed {
                    break;
                }
            }
        }
    }

    tracing::debug!("Scheduler loop exited");
}
