use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use newsdesk_core::{NewsId, ProcessingEntry, ProcessingMap, ProcessingStatus, ProcessingUpdate};
use newsdesk_logging::{desk_debug, desk_info, desk_warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::clock::Clock;
use crate::store::{RegistryStore, StoreError};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Proof of ownership of one registry entry.
///
/// Writes carrying a token from an older run are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken {
    pub news_id: NewsId,
    pub epoch: u64,
}

/// Shared record of unattended runs.
///
/// Every mutation is saved through the [`RegistryStore`] and republished to
/// subscribers. While any entry is running a single ticker task refreshes
/// elapsed times once per second.
#[derive(Clone)]
pub struct ProcessingRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<RegistryState>,
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    updates: watch::Sender<ProcessingMap>,
}

struct RegistryState {
    map: ProcessingMap,
    next_epoch: u64,
    ticker: Option<JoinHandle<()>>,
    disposed: bool,
}

impl ProcessingRegistry {
    /// Rehydrates from `store`. Elapsed times are recomputed from the stored
    /// start times, so progress carries across restarts.
    pub fn init(store: Arc<dyn RegistryStore>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let mut map = store.load()?;
        map.tick(clock.now_ms());
        desk_info!("Processing registry loaded with {} entries", map.len());
        let (updates, _) = watch::channel(map.clone());
        let registry = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RegistryState {
                    next_epoch: map.max_epoch() + 1,
                    map,
                    ticker: None,
                    disposed: false,
                }),
                store,
                clock,
                updates,
            }),
        };
        {
            let mut state = registry.inner.lock();
            registry.ensure_ticker(&mut state);
        }
        Ok(registry)
    }

    /// Begins (or restarts) the entry for `news_id`; any older run of the
    /// same item loses its right to write.
    pub fn start(&self, news_id: NewsId) -> RunToken {
        let mut state = self.inner.lock();
        let epoch = state.next_epoch;
        state.next_epoch += 1;
        state.map.start(news_id, self.inner.clock.now_ms(), epoch);
        self.inner.commit(&state.map);
        self.ensure_ticker(&mut state);
        desk_info!("Run {} started for news {}", epoch, news_id);
        RunToken { news_id, epoch }
    }

    /// Merges `update` into the token's entry. Returns false when the run was
    /// superseded or its entry is gone.
    pub fn update(&self, token: &RunToken, update: ProcessingUpdate) -> bool {
        let mut state = self.inner.lock();
        if !owns(&state.map, token) {
            desk_debug!("Dropping update from stale run {:?}", token);
            return false;
        }
        state.map.update(token.news_id, update);
        self.inner.commit(&state.map);
        self.ensure_ticker(&mut state);
        true
    }

    pub fn remove(&self, token: &RunToken) -> bool {
        let mut state = self.inner.lock();
        if !owns(&state.map, token) {
            desk_debug!("Ignoring removal from stale run {:?}", token);
            return false;
        }
        state.map.remove(token.news_id);
        self.inner.commit(&state.map);
        true
    }

    /// User-driven removal, regardless of which run wrote the entry.
    pub fn dismiss(&self, news_id: NewsId) -> Option<ProcessingEntry> {
        let mut state = self.inner.lock();
        let removed = state.map.remove(news_id);
        if removed.is_some() {
            self.inner.commit(&state.map);
            desk_info!("Dismissed processing entry for news {}", news_id);
        }
        removed
    }

    pub fn is_current(&self, token: &RunToken) -> bool {
        owns(&self.inner.lock().map, token)
    }

    /// Whether an entry for `news_id` is currently running.
    pub fn is_running(&self, news_id: NewsId) -> bool {
        self.inner
            .lock()
            .map
            .get(news_id)
            .is_some_and(|entry| entry.status == ProcessingStatus::Running)
    }

    pub fn snapshot(&self) -> ProcessingMap {
        self.inner.lock().map.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessingMap> {
        self.inner.updates.subscribe()
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.lock().ticker.is_some()
    }

    /// Stops the ticker. Later mutations are still recorded and saved.
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        state.disposed = true;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
    }

    fn ensure_ticker(&self, state: &mut RegistryState) {
        if state.disposed || state.ticker.is_some() || !state.map.has_running() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            desk_warn!("No async runtime; processing registry will not tick");
            return;
        };
        desk_debug!("Starting processing ticker");
        state.ticker = Some(handle.spawn(run_ticker(Arc::downgrade(&self.inner))));
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, map: &ProcessingMap) {
        if let Err(err) = self.store.save(map) {
            desk_warn!("Failed to save processing registry: {}", err);
        }
        self.updates.send_replace(map.clone());
    }

    /// One ticker step. Returns false once the ticker should stop.
    fn tick(&self) -> bool {
        let mut state = self.lock();
        if state.disposed {
            return false;
        }
        if state.map.tick(self.clock.now_ms()) {
            self.commit(&state.map);
        }
        if state.map.has_running() {
            return true;
        }
        desk_debug!("No running entries; stopping processing ticker");
        state.ticker = None;
        false
    }
}

fn owns(map: &ProcessingMap, token: &RunToken) -> bool {
    map.get(token.news_id)
        .is_some_and(|entry| entry.run_epoch == token.epoch)
}

async fn run_ticker(inner: Weak<Inner>) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if !inner.tick() {
            return;
        }
    }
}
