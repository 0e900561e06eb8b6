use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;

use super::{FavoritesService, RemoteError, ServiceFuture};
use crate::models::{FavoriteItem, favorites_from_value};

/// Favorites backed by the `/favorites` REST resource.
///
/// Every request carries `Authorization: Bearer <token>`. Without a token,
/// reads come back empty and writes fail with
/// [`RemoteError::NotAuthenticated`] before touching the network.
pub struct RestFavorites {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl RestFavorites {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: reqwest::Client::new(),
            timeout: None,
        }
    }

    /// Per-request timeout. Requests rely on the transport's own behavior
    /// when unset.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).bearer_auth(token);
        match self.timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        }
    }

    fn token(&self) -> Result<&str, RemoteError> {
        self.token.as_deref().ok_or(RemoteError::NotAuthenticated)
    }
}

/// Turn non-2xx responses into [`RemoteError::Status`].
async fn check_status(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

impl FavoritesService for RestFavorites {
    fn list(&self) -> ServiceFuture<'_, Vec<FavoriteItem>> {
        Box::pin(async move {
            let Some(token) = self.token.as_deref() else {
                tracing::debug!("no token, favorites list is empty");
                return Ok(Vec::new());
            };
            let resp = self
                .request(Method::GET, &self.url("favorites"), token)
                .send()
                .await?;
            let resp = check_status(resp).await?;
            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| RemoteError::Decode(e.to_string()))?;
            if !data.is_array() && !data["items"].is_array() {
                return Err(RemoteError::Decode(
                    "expected an array or an object with `items`".into(),
                ));
            }
            let items = favorites_from_value(&data);
            tracing::debug!(count = items.len(), "fetched favorites");
            Ok(items)
        })
    }

    fn add<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let token = self.token()?;
            let resp = self
                .request(Method::POST, &self.url("favorites"), token)
                .json(&json!({ "movieId": movie_id }))
                .send()
                .await?;
            check_status(resp).await?;
            tracing::debug!(id = movie_id, "favorite added");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let token = self.token()?;
            let encoded = urlencoding::encode(movie_id);
            let resp = self
                .request(
                    Method::DELETE,
                    &self.url(&format!("favorites/{encoded}")),
                    token,
                )
                .send()
                .await?;

            // Older deployments only route the query-string form.
            let resp = if matches!(
                resp.status(),
                StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
            ) {
                tracing::debug!(id = movie_id, status = %resp.status(), "falling back to query-string delete");
                self.request(
                    Method::DELETE,
                    &self.url(&format!("favorites?movieId={encoded}")),
                    token,
                )
                .send()
                .await?
            } else {
                resp
            };

            let resp = check_status(resp).await?;
            let removed = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["removed"].as_u64());
            tracing::debug!(id = movie_id, ?removed, "favorite removed");
            Ok(())
        })
    }

    fn has<'a>(&'a self, movie_id: &'a str) -> ServiceFuture<'a, bool> {
        Box::pin(async move {
            let Some(token) = self.token.as_deref() else {
                return Ok(false);
            };
            let encoded = urlencoding::encode(movie_id);
            let resp = self
                .request(
                    Method::GET,
                    &self.url(&format!("favorites/{encoded}")),
                    token,
                )
                .send()
                .await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(false);
            }
            let resp = check_status(resp).await?;
            let data = resp.json::<serde_json::Value>().await.ok();
            Ok(data
                .and_then(|v| v["favorite"].as_bool())
                .unwrap_or(true))
        })
    }
}
