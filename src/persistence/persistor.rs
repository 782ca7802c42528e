//! Change-driven writes of the flattened state.
//!
//! Every notification re-flattens the whole live tree against the registry
//! and overwrites the single storage entry. Writes are retried according to
//! [`RetryPolicy`](crate::settings::RetryPolicy); with debounce enabled the
//! latest flattened state is held until the quiet period passes. On native
//! targets a timer thread writes it once due; on wasm32 it is written by the
//! next due notification, [`Persistor::flush`], or [`Attachment::detach`].
//! State still pending when the last handle is dropped is flushed then.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Result, TattooError};
use crate::persistence::codec::{FlatState, encode};
use crate::persistence::flatten::flatten;
use crate::platform::Storage;
use crate::registry::Registry;
use crate::settings::PersistSettings;
use crate::store::{ListenerId, StateContainer};
use crate::tree::Tree;

/// Writes registered state to storage.
///
/// Cloning yields another handle to the same persistor.
#[derive(Clone)]
pub struct Persistor {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    storage: Box<dyn Storage + Send + Sync>,
    settings: PersistSettings,
    pending: Mutex<PendingWrite>,
    /// Held across take + write so flushes land in change order.
    flushing: Mutex<()>,
}

/// Unsaved state held back by the debounce window.
#[derive(Debug, Default)]
struct PendingWrite {
    state: Option<FlatState>,
    last_change: Option<Instant>,
    first_unsaved_change: Option<Instant>,
    timer_armed: bool,
}

impl PendingWrite {
    fn record(&mut self, state: FlatState) {
        let now = Instant::now();
        self.state = Some(state);
        self.last_change = Some(now);
        self.first_unsaved_change.get_or_insert(now);
    }

    fn is_due(&self, settings: &PersistSettings) -> bool {
        match (self.last_change, self.first_unsaved_change) {
            (Some(last), Some(first)) => settings
                .debounce
                .should_write(elapsed_ms(last), elapsed_ms(first)),
            _ => false,
        }
    }

    /// When the pending state becomes due.
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fn deadline(&self, settings: &PersistSettings) -> Option<Instant> {
        let debounce = &settings.debounce;
        let last = self.last_change?;
        let quiet = last.checked_add(Duration::from_millis(debounce.debounce_ms));
        let cap = self
            .first_unsaved_change?
            .checked_add(Duration::from_millis(debounce.max_delay_ms));
        match (quiet, cap) {
            (Some(quiet), Some(cap)) => Some(quiet.min(cap)),
            (Some(at), None) | (None, Some(at)) => Some(at),
            (None, None) => Some(last + MAX_TIMER_WAIT),
        }
    }

    fn take(&mut self) -> Option<FlatState> {
        self.last_change = None;
        self.first_unsaved_change = None;
        self.state.take()
    }
}

/// Longest single sleep of the debounce timer.
const MAX_TIMER_WAIT: Duration = Duration::from_secs(3600);

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

impl Persistor {
    pub fn new(
        registry: Registry,
        storage: impl Storage + Send + Sync + 'static,
        settings: PersistSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                storage: Box::new(storage),
                settings,
                pending: Mutex::new(PendingWrite::default()),
                flushing: Mutex::new(()),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &PersistSettings {
        &self.inner.settings
    }

    /// Registered entries of `snapshot`, as they would be written.
    pub fn flatten(&self, snapshot: Option<&Tree>) -> FlatState {
        flatten(&self.inner.registry, snapshot)
    }

    /// Handle one state change.
    ///
    /// Without debounce the flattened state is written immediately. With
    /// debounce it replaces any pending state and is written once due.
    pub fn persist(&self, snapshot: Option<&Tree>) -> Result<()> {
        let state = self.flatten(snapshot);
        if !self.inner.settings.debounce.enabled {
            return self.inner.write(&state);
        }

        let (due, arm) = {
            let mut pending = self.inner.pending.lock();
            pending.record(state);
            let due = pending.is_due(&self.inner.settings);
            let arm = !due && !pending.timer_armed;
            if arm {
                pending.timer_armed = true;
            }
            (due, arm)
        };
        if due {
            return self.flush();
        }
        if arm {
            self.arm_timer();
        }
        Ok(())
    }

    /// Write pending debounced state now, if any.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Whether debounced state is waiting to be written.
    pub fn has_pending(&self) -> bool {
        self.inner.pending.lock().state.is_some()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn arm_timer(&self) {
        let inner = Arc::downgrade(&self.inner);
        let spawned = std::thread::Builder::new()
            .name("tattoo-debounce".to_string())
            .spawn(move || run_timer(inner));
        if let Err(e) = spawned {
            log::warn!("Could not start debounce timer: {}", e);
            self.inner.pending.lock().timer_armed = false;
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn arm_timer(&self) {
        // No threads in the browser; the next notification or flush writes
        self.inner.pending.lock().timer_armed = false;
    }
}

/// Sleep until pending state is due and write it, until nothing is pending
/// or every persistor handle is gone.
#[cfg(not(target_arch = "wasm32"))]
fn run_timer(inner: std::sync::Weak<Inner>) {
    loop {
        let wait = {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut pending = inner.pending.lock();
            match pending.deadline(&inner.settings) {
                None => {
                    pending.timer_armed = false;
                    return;
                }
                Some(deadline) => deadline
                    .saturating_duration_since(Instant::now())
                    .min(MAX_TIMER_WAIT),
            }
        };

        if !wait.is_zero() {
            std::thread::sleep(wait);
            continue;
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };
        if let Err(e) = inner.flush() {
            // Left pending for the next change, flush, or drop
            log::error!("Debounced write failed: {}", e);
            inner.pending.lock().timer_armed = false;
            return;
        }
    }
}

impl Inner {
    fn flush(&self) -> Result<()> {
        let _flushing = self.flushing.lock();
        let Some(state) = self.pending.lock().take() else {
            return Ok(());
        };

        self.write(&state).inspect_err(|_| {
            // Keep the unsaved state unless a newer change replaced it
            let mut pending = self.pending.lock();
            if pending.state.is_none() {
                pending.record(state.clone());
            }
        })
    }

    fn write(&self, state: &FlatState) -> Result<()> {
        let key = &self.settings.storage_key;
        let text = encode(state)?;
        let retry = &self.settings.retry;
        let attempts = retry.attempts();

        let mut attempt = 1;
        loop {
            match self.storage.set(key, &text) {
                Ok(()) => {
                    log::debug!("Persisted {} values to '{}'", state.len(), key);
                    return Ok(());
                }
                Err(e) if attempt >= attempts => {
                    return Err(if attempts == 1 {
                        e
                    } else {
                        TattooError::RetriesExhausted {
                            key: key.clone(),
                            attempts,
                            source: Box::new(e),
                        }
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Write to '{}' failed (attempt {}/{}): {}",
                        key,
                        attempt,
                        attempts,
                        e
                    );
                    backoff(retry.backoff(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.pending.get_mut().state.is_none() {
            return;
        }
        log::debug!("Flushing pending state on drop");
        if let Err(e) = self.flush() {
            log::error!("Pending state lost on drop: {}", e);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn backoff(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(target_arch = "wasm32")]
fn backoff(_delay: Duration) {
    // No blocking sleep in the browser; retry immediately
}

impl std::fmt::Debug for Persistor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistor")
            .field("settings", &self.inner.settings)
            .field("registered", &self.inner.registry.len())
            .finish()
    }
}

/// A persistor subscribed to a state container.
#[derive(Debug)]
pub struct Attachment {
    id: ListenerId,
    persistor: Persistor,
}

impl Attachment {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn persistor(&self) -> &Persistor {
        &self.persistor
    }

    /// Write pending state, then unsubscribe.
    ///
    /// Returns whether the listener was still subscribed.
    pub fn detach<C: StateContainer + ?Sized>(self, container: &C) -> Result<bool> {
        self.persistor.flush()?;
        let removed = container.unsubscribe(self.id);
        log::info!("Persistor detached");
        Ok(removed)
    }
}

/// Subscribe `persistor` to every state change of `container`.
///
/// Write errors are returned from the notification, i.e. to whoever
/// triggered the state change.
pub fn attach<C: StateContainer + ?Sized>(container: &C, persistor: &Persistor) -> Attachment {
    let listener = persistor.clone();
    let id = container.subscribe(Box::new(move |state: Option<&Tree>| {
        listener.persist(state)
    }));
    log::info!(
        "Persistor attached ({} registered paths, key '{}')",
        persistor.registry().len(),
        persistor.settings().storage_key
    );
    Attachment {
        id,
        persistor: persistor.clone(),
    }
}
