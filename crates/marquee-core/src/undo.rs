//! Optimistic favorites removal with a deferred, cancellable commit.
//!
//! Removing a favorite hides it immediately and arms a timer (6 s by
//! default). Until the timer fires the user can undo without any network
//! traffic. When it fires, or when the user dismisses the undo affordance,
//! the removal is committed remotely. An undo that arrives after the commit
//! already went out re-adds the favorite remotely as a compensating action.
//!
//! Pending removals are tracked per id, so several undo windows can be open
//! at once. Each one moves through [`Phase`]:
//!
//! ```text
//!   remove ──► Armed ──hold──► Held ──release──► Armed
//!                │                │
//!          timer / commit_now ◄───┘
//!                ▼
//!           Committing ──ok──► Committed
//!                └──err──► (restored, dropped)
//! ```
//!
//! `undo` is accepted in every phase; from `Committing` or `Committed` it
//! also issues the compensating remote add.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cache::{CardCache, MovieCard};
use crate::messages::{Locale, Message};
use crate::models::FavoriteItem;
use crate::poster::PosterResolver;
use crate::remote::{FavoritesService, RemoteError};
use crate::{Config, EventSink, FavoritesEvent};

/// Grace period between a removal and its remote commit.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_millis(6000);

/// Where a pending removal is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Commit timer running.
    Armed,
    /// Timer cancelled while the undo affordance has pointer or keyboard focus.
    Held,
    /// Remote remove in flight.
    Committing,
    /// Remote remove succeeded; kept only so a late undo can compensate.
    Committed,
}

impl Phase {
    /// Whether the remote remove has been issued.
    pub fn is_committed(self) -> bool {
        matches!(self, Phase::Committing | Phase::Committed)
    }

    fn is_awaiting_commit(self) -> bool {
        matches!(self, Phase::Armed | Phase::Held)
    }
}

struct PendingRemoval {
    item: FavoriteItem,
    /// List rank of the item, used to find its slot again on restore.
    rank: u64,
    phase: Phase,
    /// Removal order; the highest is the one the undo affordance shows.
    seq: u64,
    /// Bumped on every arm. A firing timer or finishing commit must match it.
    generation: u64,
    timer: Option<CancellationToken>,
}

impl PendingRemoval {
    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

#[derive(Default)]
struct State {
    /// Always sorted by `ranks`.
    items: Vec<FavoriteItem>,
    /// Stable position of every id that was listed since the last load.
    ranks: HashMap<String, u64>,
    next_rank: u64,
    pending: HashMap<String, PendingRemoval>,
    cards: CardCache,
    counter: u64,
    disposed: bool,
}

impl State {
    fn next(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn rank_next(&mut self, id: &str) {
        self.ranks.insert(id.to_string(), self.next_rank);
        self.next_rank += 1;
    }

    /// Put a removed item back between its former neighbours.
    fn restore(&mut self, pending: PendingRemoval) -> bool {
        restore_item(&mut self.items, &self.ranks, pending.item, pending.rank)
    }

    fn latest(&self, accept: impl Fn(Phase) -> bool) -> Option<String> {
        self.pending
            .iter()
            .filter(|(_, p)| accept(p.phase))
            .max_by_key(|(_, p)| p.seq)
            .map(|(id, _)| id.clone())
    }

    fn cancel_all(&mut self) {
        for pending in self.pending.values_mut() {
            pending.cancel_timer();
        }
        self.pending.clear();
    }
}

struct Inner {
    service: Arc<dyn FavoritesService>,
    events: EventSink,
    window: Duration,
    locale: Locale,
    resolver: PosterResolver,
    state: Mutex<State>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        state.cancel_all();
    }
}

/// Owns one favorites view's list and its pending removals.
///
/// Construct one per view mount and call [`dispose`](Self::dispose) on
/// unmount. Cloning is cheap and shares state. Methods that arm timers
/// must be called from within a tokio runtime.
#[derive(Clone)]
pub struct FavoritesController {
    inner: Arc<Inner>,
}

impl FavoritesController {
    pub fn new(service: Arc<dyn FavoritesService>, events: EventSink) -> Self {
        Self::from_config(service, events, &Config::default())
    }

    pub fn from_config(
        service: Arc<dyn FavoritesService>,
        events: EventSink,
        config: &Config,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                events,
                window: config.undo_window,
                locale: config.locale,
                resolver: config.resolver(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: FavoritesEvent) {
        (self.inner.events)(event);
    }

    fn emit_error(&self, id: Option<&str>, message: Message, err: &RemoteError) {
        let message = match err {
            RemoteError::NotAuthenticated => Message::NotAuthenticated,
            _ => message,
        };
        self.emit(FavoritesEvent::Error {
            id: id.map(str::to_string),
            message: message.text(self.inner.locale),
        });
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn locale(&self) -> Locale {
        self.inner.locale
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Fetch the remote list and replace the local one.
    ///
    /// Any pending removals are dropped. A failed fetch leaves the list
    /// empty and emits an error. Returns the number of favorites loaded.
    pub async fn load(&self) -> usize {
        self.emit(FavoritesEvent::LoadingStarted);
        let result = self.inner.service.list().await;

        let outcome = {
            let mut guard = self.state();
            let state = &mut *guard;
            if state.disposed {
                return 0;
            }
            state.cancel_all();
            state.cards.clear();
            match result {
                Ok(mut items) => {
                    let mut seen = HashSet::new();
                    items.retain(|i| seen.insert(i.id.clone()));
                    state.ranks.clear();
                    state.next_rank = 0;
                    for item in &items {
                        state.rank_next(&item.id);
                    }
                    state.items = items;
                    Ok(state.items.len())
                }
                Err(err) => {
                    state.items.clear();
                    Err(err)
                }
            }
        };

        let count = match outcome {
            Ok(count) => {
                tracing::debug!(count, "favorites loaded");
                count
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load favorites");
                self.emit_error(None, Message::ListFailed, &err);
                0
            }
        };
        self.emit(FavoritesEvent::LoadingFinished { count });
        count
    }

    /// Cancel every live timer. Later timer firings and remote completions
    /// no longer touch the list.
    pub fn dispose(&self) {
        let mut state = self.state();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.cancel_all();
        tracing::debug!("favorites controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    // ── Removal cycle ───────────────────────────────────────────────────

    /// Optimistically remove `id` and schedule its remote commit.
    ///
    /// Returns `false` without side effects if `id` is not in the list.
    pub fn remove(&self, id: &str) -> bool {
        let title = {
            let mut guard = self.state();
            let state = &mut *guard;
            if state.disposed {
                return false;
            }
            let Some(index) = state.items.iter().position(|i| i.id == id) else {
                tracing::debug!(id, "remove ignored: not in list");
                return false;
            };
            let item = state.items.remove(index);
            let rank = state.ranks.get(id).copied().unwrap_or(index as u64);

            // Committed records only serve a late undo; a new removal supersedes them.
            state.pending.retain(|_, p| p.phase != Phase::Committed);
            if let Some(mut previous) = state.pending.remove(id) {
                previous.cancel_timer();
            }

            let title = item.title.clone();
            let seq = state.next();
            state.pending.insert(
                id.to_string(),
                PendingRemoval {
                    item,
                    rank,
                    phase: Phase::Armed,
                    seq,
                    generation: 0,
                    timer: None,
                },
            );
            self.arm(state, id);
            title
        };

        tracing::debug!(id, "favorite hidden, commit scheduled");
        self.emit(FavoritesEvent::UndoOffered {
            id: id.to_string(),
            title,
        });
        true
    }

    /// (Re)arm the commit timer for a pending removal of `id`.
    ///
    /// Any existing timer is cancelled first. Returns `false` if `id` has
    /// no removal awaiting commit.
    pub fn schedule_commit(&self, id: &str) -> bool {
        let mut state = self.state();
        if state.disposed {
            return false;
        }
        let awaiting = state
            .pending
            .get(id)
            .is_some_and(|p| p.phase.is_awaiting_commit());
        if awaiting {
            self.arm(&mut state, id);
        }
        awaiting
    }

    fn arm(&self, state: &mut State, id: &str) {
        let generation = state.next();
        let Some(pending) = state.pending.get_mut(id) else {
            return;
        };
        pending.cancel_timer();
        let token = CancellationToken::new();
        pending.phase = Phase::Armed;
        pending.generation = generation;
        pending.timer = Some(token.clone());

        let inner = Arc::downgrade(&self.inner);
        let window = self.inner.window;
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    if let Some(inner) = inner.upgrade() {
                        FavoritesController { inner }.commit(&id, Some(generation)).await;
                    }
                }
            }
        });
    }

    /// Commit the removal of `id` now, skipping the rest of the window.
    pub async fn commit_now(&self, id: &str) -> bool {
        self.commit(id, None).await
    }

    /// The user dismissed the undo affordance: commit the most recent
    /// removal still awaiting commit. No-op when there is none.
    pub async fn force_commit_now(&self) -> bool {
        let latest = self.state().latest(Phase::is_awaiting_commit);
        match latest {
            Some(id) => self.commit(&id, None).await,
            None => false,
        }
    }

    /// With `timer = Some(generation)` only that exact armed cycle commits.
    async fn commit(&self, id: &str, timer: Option<u64>) -> bool {
        let (title, cycle) = {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            let Some(pending) = state.pending.get_mut(id) else {
                return false;
            };
            let due = match timer {
                Some(generation) => {
                    pending.phase == Phase::Armed && pending.generation == generation
                }
                None => pending.phase.is_awaiting_commit(),
            };
            if !due {
                return false;
            }
            pending.cancel_timer();
            pending.phase = Phase::Committing;
            (pending.item.title.clone(), pending.generation)
        };

        tracing::debug!(id, "committing removal");
        self.emit(FavoritesEvent::UndoWithdrawn { id: id.to_string() });

        match self.inner.service.remove(id).await {
            Ok(()) => {
                let committed = {
                    let mut state = self.state();
                    if state.disposed {
                        return true;
                    }
                    state.cards.purge(id);
                    match state.pending.get_mut(id) {
                        Some(p) if p.phase == Phase::Committing && p.generation == cycle => {
                            p.phase = Phase::Committed;
                            true
                        }
                        _ => false,
                    }
                };
                if committed {
                    self.emit(FavoritesEvent::Committed { id: id.to_string() });
                } else {
                    tracing::debug!(id, "removal committed after the cycle was undone");
                }
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "remote remove failed, restoring favorite");
                let restored = {
                    let mut state = self.state();
                    if state.disposed {
                        return true;
                    }
                    let current = state
                        .pending
                        .get(id)
                        .is_some_and(|p| p.phase == Phase::Committing && p.generation == cycle);
                    let removed = if current {
                        state.pending.remove(id)
                    } else {
                        None
                    };
                    removed.is_some_and(|pending| state.restore(pending))
                };
                if restored {
                    self.emit(FavoritesEvent::Restored { id: id.to_string() });
                    self.emit_error(Some(id), Message::RemoveFailed { title }, &err);
                }
            }
        }
        true
    }

    /// Undo the removal of `id`: put it back where it was, and re-add it
    /// remotely if the commit already went out.
    ///
    /// A failed compensating add leaves the local list restored and emits
    /// an error; it is not retried.
    pub async fn undo(&self, id: &str) -> bool {
        let (phase, title) = {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            let Some(mut pending) = state.pending.remove(id) else {
                return false;
            };
            pending.cancel_timer();
            let phase = pending.phase;
            let title = pending.item.title.clone();
            state.restore(pending);
            (phase, title)
        };

        if phase.is_awaiting_commit() {
            self.emit(FavoritesEvent::UndoWithdrawn { id: id.to_string() });
        }
        self.emit(FavoritesEvent::Restored { id: id.to_string() });

        if phase.is_committed() {
            tracing::debug!(id, ?phase, "undo after commit, re-adding remotely");
            if let Err(err) = self.inner.service.add(id).await {
                tracing::warn!(id, error = %err, "compensating add failed; server still has the removal");
                self.emit_error(Some(id), Message::RestoreFailed { title }, &err);
            }
        } else {
            tracing::debug!(id, "undo before commit");
        }
        true
    }

    /// Undo the most recent removal, committed or not.
    pub async fn undo_remove(&self) -> bool {
        let latest = self.state().latest(|_| true);
        match latest {
            Some(id) => self.undo(&id).await,
            None => false,
        }
    }

    /// Pause the commit timer for `id` while its undo affordance has focus.
    pub fn hold(&self, id: &str) -> bool {
        let mut state = self.state();
        match state.pending.get_mut(id) {
            Some(pending) if pending.phase == Phase::Armed => {
                pending.cancel_timer();
                pending.phase = Phase::Held;
                tracing::trace!(id, "commit timer held");
                true
            }
            _ => false,
        }
    }

    /// Focus left the undo affordance: re-arm for the full window.
    pub fn release(&self, id: &str) -> bool {
        let mut state = self.state();
        if state.disposed {
            return false;
        }
        let held = state
            .pending
            .get(id)
            .is_some_and(|p| p.phase == Phase::Held);
        if held {
            self.arm(&mut state, id);
            tracing::trace!(id, "commit timer re-armed");
        }
        held
    }

    pub fn hold_latest(&self) -> bool {
        let latest = self.state().latest(|p| p == Phase::Armed);
        latest.is_some_and(|id| self.hold(&id))
    }

    pub fn release_latest(&self) -> bool {
        let latest = self.state().latest(|p| p == Phase::Held);
        latest.is_some_and(|id| self.release(&id))
    }

    // ── Adding ──────────────────────────────────────────────────────────

    /// Add a favorite remotely, then append it locally.
    ///
    /// Returns `false` if it is already listed or the remote add failed.
    pub async fn add(&self, item: FavoriteItem) -> bool {
        let id = item.id.clone();
        if self.contains(&id) {
            return false;
        }
        if let Err(err) = self.inner.service.add(&id).await {
            tracing::warn!(id = %id, error = %err, "failed to add favorite");
            self.emit_error(Some(&id), Message::AddFailed { title: item.title }, &err);
            return false;
        }
        {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            if let Some(mut pending) = state.pending.remove(&id) {
                pending.cancel_timer();
            }
            if !state.items.iter().any(|i| i.id == id) {
                state.rank_next(&id);
                state.items.push(item);
            }
        }
        self.emit(FavoritesEvent::Added { id });
        true
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn items(&self) -> Vec<FavoriteItem> {
        self.state().items.clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state().items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state().items.iter().any(|i| i.id == id)
    }

    pub fn phase(&self, id: &str) -> Option<Phase> {
        self.state().pending.get(id).map(|p| p.phase)
    }

    /// Whether `id` has a removal that has not committed yet.
    pub fn is_pending(&self, id: &str) -> bool {
        self.phase(id).is_some_and(Phase::is_awaiting_commit)
    }

    /// The removal the undo affordance currently names, if any.
    pub fn latest_pending(&self) -> Option<String> {
        self.state().latest(Phase::is_awaiting_commit)
    }

    /// Card view model for a listed favorite.
    pub fn card(&self, id: &str) -> Option<MovieCard> {
        let mut guard = self.state();
        let state = &mut *guard;
        let item = state.items.iter().find(|i| i.id == id)?;
        Some(state.cards.get_or_build(item, &self.inner.resolver))
    }

    /// Cards for the whole list, in order.
    pub fn cards(&self) -> Vec<MovieCard> {
        let mut guard = self.state();
        let state = &mut *guard;
        state
            .items
            .iter()
            .map(|item| state.cards.get_or_build(item, &self.inner.resolver))
            .collect()
    }

    /// Whether a card for `id` is memoized.
    pub fn has_cached_card(&self, id: &str) -> bool {
        self.state().cards.contains(id)
    }
}

/// Insert `item` before the first listed item ranked after it, unless its
/// id is already listed.
fn restore_item(
    items: &mut Vec<FavoriteItem>,
    ranks: &HashMap<String, u64>,
    item: FavoriteItem,
    rank: u64,
) -> bool {
    if items.iter().any(|i| i.id == item.id) {
        return false;
    }
    let index = items
        .iter()
        .position(|i| ranks.get(&i.id).is_some_and(|&r| r > rank))
        .unwrap_or(items.len());
    items.insert(index, item);
    true
}
