//! Remote favorites service trait and implementations.

pub mod mock;
pub mod rest;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::models::FavoriteItem;

pub use mock::{Call, MockFavorites};
pub use rest::RestFavorites;

/// Errors from the favorites REST resource.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// No bearer token; raised before any network attempt.
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

/// Boxed future returned by [`FavoritesService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// The favorites backend the controller talks to.
pub trait FavoritesService: Send + Sync {
    /// Current favorites. Empty (not an error) when unauthenticated.
    fn list(&self) -> ServiceFuture<'_, Vec<FavoriteItem>>;

    fn add<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()>;

    fn remove<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()>;

    fn has<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, bool>;
}
