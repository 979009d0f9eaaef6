//! Process-wide loader for the external mapping capability.
//!
//! Every widget calls [`ResourceLoader::ensure_loaded`]; only the first call
//! while `Unloaded` starts a load, everyone else waits on the same outcome.
//! The state check and the switch to `Loading` happen under one lock with no
//! await in between, so concurrent callers can never start a second load.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::app::ports::CapabilitySource;
use crate::constants::DEFAULT_LOAD_TIMEOUT_MS;
use crate::error::LoadFailure;
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed(LoadFailure),
}

type Waiter = oneshot::Sender<Result<(), LoadFailure>>;

struct Inner {
    state: LoadState,
    waiters: Vec<Waiter>,
    attempts: u64,
    // Bumped by reset() so a superseded attempt cannot settle the new one
    generation: u64,
}

pub struct ResourceLoader {
    source: Arc<dyn CapabilitySource>,
    timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

/// Source used by a disabled loader; every attempt fails with the same reason.
struct Unavailable(LoadFailure);

#[async_trait]
impl CapabilitySource for Unavailable {
    async fn load(&self) -> Result<(), LoadFailure> {
        Err(self.0.clone())
    }
}

impl ResourceLoader {
    pub fn new(source: Arc<dyn CapabilitySource>, timeout: Duration) -> Self {
        Self::with_state(source, timeout, LoadState::Unloaded)
    }

    /// A loader that starts out `Failed`, e.g. when no API key is configured.
    pub fn disabled(reason: LoadFailure) -> Self {
        warn!("Mapping capability disabled: {}", reason);
        metrics::loader::failed(reason.kind());
        Self::with_state(
            Arc::new(Unavailable(reason.clone())),
            Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
            LoadState::Failed(reason),
        )
    }

    fn with_state(source: Arc<dyn CapabilitySource>, timeout: Duration, state: LoadState) -> Self {
        Self {
            source,
            timeout,
            inner: Arc::new(Mutex::new(Inner {
                state,
                waiters: Vec::new(),
                attempts: 0,
                generation: 0,
            })),
        }
    }

    pub fn state(&self) -> LoadState {
        lock(&self.inner).state.clone()
    }

    /// Number of external load operations this loader has started
    pub fn load_attempts(&self) -> u64 {
        lock(&self.inner).attempts
    }

    pub async fn ensure_loaded(&self) -> Result<(), LoadFailure> {
        let receiver = {
            let mut inner = lock(&self.inner);
            let current = inner.state.clone();
            match current {
                LoadState::Loaded => return Ok(()),
                LoadState::Failed(failure) => return Err(failure),
                LoadState::Loading => {
                    let (tx, rx) = oneshot::channel();
                    inner.waiters.push(tx);
                    debug!(waiters = inner.waiters.len(), "Capability load in progress, waiting");
                    rx
                }
                LoadState::Unloaded => {
                    inner.state = LoadState::Loading;
                    inner.attempts += 1;
                    let (tx, rx) = oneshot::channel();
                    inner.waiters.push(tx);
                    self.spawn_load(inner.generation);
                    rx
                }
            }
        };

        // A dropped sender means the loader itself went away mid-load
        receiver.await.unwrap_or(Err(LoadFailure::Reset))
    }

    /// Returns the loader to `Unloaded`. Pending waiters are rejected with
    /// [`LoadFailure::Reset`] and the in-flight attempt, if any, is ignored.
    pub fn reset(&self) {
        let waiters = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            inner.state = LoadState::Unloaded;
            std::mem::take(&mut inner.waiters)
        };
        info!(rejected = waiters.len(), "Mapping capability loader reset");
        for waiter in waiters {
            let _ = waiter.send(Err(LoadFailure::Reset));
        }
    }

    fn spawn_load(&self, generation: u64) {
        let source = Arc::clone(&self.source);
        let inner = Arc::clone(&self.inner);
        let timeout = self.timeout;

        metrics::loader::attempt();
        info!(?timeout, "Loading mapping capability");

        tokio::spawn(async move {
            // The load runs as its own task so giving up on it does not cancel it
            let mut load = tokio::spawn(async move { source.load().await });
            let (outcome, timed_out) = tokio::select! {
                joined = &mut load => (flatten(joined), false),
                _ = tokio::time::sleep(timeout) => (Err(LoadFailure::Timeout(timeout)), true),
            };
            settle(&inner, generation, outcome);

            if timed_out {
                let late = flatten(load.await);
                warn!(?late, "Mapping capability settled after the loader gave up; ignoring");
                metrics::loader::late_settle();
            }
        });
    }
}

fn flatten(joined: Result<Result<(), LoadFailure>, JoinError>) -> Result<(), LoadFailure> {
    joined.unwrap_or_else(|e| Err(LoadFailure::Rejected(format!("load task aborted: {}", e))))
}

fn settle(inner: &Mutex<Inner>, generation: u64, outcome: Result<(), LoadFailure>) {
    let waiters = {
        let mut inner = lock(inner);
        if inner.generation != generation || inner.state != LoadState::Loading {
            debug!("Ignoring outcome of a superseded capability load");
            return;
        }
        inner.state = match &outcome {
            Ok(()) => LoadState::Loaded,
            Err(failure) => LoadState::Failed(failure.clone()),
        };
        std::mem::take(&mut inner.waiters)
    };

    match &outcome {
        Ok(()) => {
            info!(waiters = waiters.len(), "Mapping capability loaded");
            metrics::loader::loaded();
        }
        Err(failure) => {
            warn!(waiters = waiters.len(), "Mapping capability failed to load: {}", failure);
            metrics::loader::failed(failure.kind());
        }
    }

    // Registration order; a waiter whose caller went away is skipped
    for waiter in waiters {
        let _ = waiter.send(outcome.clone());
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

static GLOBAL_LOADER: OnceCell<Arc<ResourceLoader>> = OnceCell::new();

/// Installs the process-wide loader. The first installation wins; later
/// calls get the already-installed loader back.
pub fn install_global(loader: ResourceLoader) -> Arc<ResourceLoader> {
    let mut installed = false;
    let global = GLOBAL_LOADER.get_or_init(|| {
        installed = true;
        Arc::new(loader)
    });
    if !installed {
        debug!("Global loader already installed; keeping the existing one");
    }
    Arc::clone(global)
}

pub fn global() -> Option<Arc<ResourceLoader>> {
    GLOBAL_LOADER.get().cloned()
}
