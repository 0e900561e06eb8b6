//! In-memory favorites backend for tests and offline runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{FavoritesService, RemoteError, ServiceFuture};
use crate::models::FavoriteItem;

/// A recorded call against [`MockFavorites`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Add(String),
    Remove(String),
    Has(String),
}

/// A hand-rolled [`FavoritesService`] that keeps favorites in memory.
///
/// Supports:
/// - Failure switches per operation (flip them at any time).
/// - Optional per-call latency.
/// - A call log via [`calls()`](MockFavorites::calls).
pub struct MockFavorites {
    items: Mutex<Vec<FavoriteItem>>,
    calls: Mutex<Vec<Call>>,
    fail_list: AtomicBool,
    fail_add: AtomicBool,
    fail_remove: AtomicBool,
    delay: Option<Duration>,
}

impl MockFavorites {
    pub fn new(items: Vec<FavoriteItem>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            fail_add: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Only the `add` and `remove` calls, in order.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List | Call::Has(_)))
            .collect()
    }

    /// Ids currently stored on the "server".
    pub fn stored_ids(&self) -> Vec<String> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    async fn latency(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }
}

fn simulated(op: &str) -> RemoteError {
    RemoteError::Other(format!("simulated {op} failure"))
}

impl FavoritesService for MockFavorites {
    fn list(&self) -> ServiceFuture<'_, Vec<FavoriteItem>> {
        self.record(Call::List);
        Box::pin(async move {
            self.latency().await;
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(simulated("list"));
            }
            Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()).clone())
        })
    }

    fn add<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()> {
        self.record(Call::Add(movie_id.to_string()));
        Box::pin(async move {
            self.latency().await;
            if self.fail_add.load(Ordering::SeqCst) {
                return Err(simulated("add"));
            }
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            if !items.iter().any(|i| i.id == movie_id) {
                items.push(FavoriteItem::new(movie_id, movie_id));
            }
            Ok(())
        })
    }

    fn remove<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()> {
        self.record(Call::Remove(movie_id.to_string()));
        Box::pin(async move {
            self.latency().await;
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(simulated("remove"));
            }
            self.items
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|i| i.id != movie_id);
            Ok(())
        })
    }

    fn has<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, bool> {
        self.record(Call::Has(movie_id.to_string()));
        Box::pin(async move {
            self.latency().await;
            Ok(self
                .items
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .any(|i| i.id == movie_id))
        })
    }
}
