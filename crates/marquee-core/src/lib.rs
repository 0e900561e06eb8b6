use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub mod cache;
pub mod config_file;
pub mod messages;
pub mod models;
pub mod poster;
pub mod remote;
pub mod undo;

// Re-export for convenience
pub use cache::{CardCache, MovieCard};
pub use messages::{Locale, Message};
pub use models::{FavoriteItem, Year, favorites_from_value};
pub use poster::{PosterFields, PosterResolver};
pub use remote::{FavoritesService, MockFavorites, RemoteError, RestFavorites};
pub use undo::{DEFAULT_UNDO_WINDOW, FavoritesController, Phase};

/// Events emitted by [`FavoritesController`] for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesEvent {
    LoadingStarted,
    LoadingFinished {
        count: usize,
    },
    /// Show the undo affordance for a just-removed favorite.
    UndoOffered {
        id: String,
        title: String,
    },
    /// Hide the undo affordance for `id`.
    UndoWithdrawn {
        id: String,
    },
    /// The removal of `id` is persisted remotely.
    Committed {
        id: String,
    },
    /// `id` is back in the list (undo or failed commit).
    Restored {
        id: String,
    },
    Added {
        id: String,
    },
    /// A non-fatal, already localized error notification.
    Error {
        id: Option<String>,
        message: String,
    },
}

/// Callback receiving [`FavoritesEvent`]s. Must not call back into the
/// controller synchronously.
pub type EventSink = Arc<dyn Fn(FavoritesEvent) + Send + Sync>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("API base URL is not configured (set MARQUEE_API_URL or [api].base_url)")]
    MissingApiUrl,
    #[error("invalid config: {0}")]
    Config(String),
}

/// Resolved client configuration.
#[derive(Clone)]
pub struct Config {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub undo_window: Duration,
    pub image_base: Option<String>,
    pub poster_dir: String,
    pub locale: Locale,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("undo_window", &self.undo_window)
            .field("image_base", &self.image_base)
            .field("poster_dir", &self.poster_dir)
            .field("locale", &self.locale)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            timeout: None,
            undo_window: DEFAULT_UNDO_WINDOW,
            image_base: None,
            poster_dir: poster::DEFAULT_LOCAL_DIR.to_string(),
            locale: Locale::default(),
        }
    }
}

impl Config {
    /// Resolve a [`ConfigFile`](config_file::ConfigFile) over the defaults.
    pub fn from_file(file: &config_file::ConfigFile) -> Result<Self, CoreError> {
        let mut config = Config::default();

        if let Some(api) = &file.api {
            config.api_url = api.base_url.clone();
            config.token = api.token.clone();
            config.timeout = api.timeout_secs.map(Duration::from_secs);
        }
        if let Some(ms) = file.favorites.as_ref().and_then(|f| f.undo_window_ms) {
            if ms == 0 {
                return Err(CoreError::Config(
                    "favorites.undo_window_ms must be greater than zero".into(),
                ));
            }
            config.undo_window = Duration::from_millis(ms);
        }
        if let Some(posters) = &file.posters {
            config.image_base = posters.image_base.clone();
            if let Some(dir) = &posters.local_dir {
                config.poster_dir = dir.clone();
            }
        }
        if let Some(locale) = file.display.as_ref().and_then(|d| d.locale.as_deref()) {
            config.locale = locale.parse().map_err(CoreError::Config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `MARQUEE_API_URL`, `MARQUEE_TOKEN` and `MARQUEE_LANG` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MARQUEE_API_URL") {
            self.api_url = Some(url);
        }
        if let Ok(token) = std::env::var("MARQUEE_TOKEN") {
            self.token = Some(token);
        }
        if let Ok(lang) = std::env::var("MARQUEE_LANG") {
            match lang.parse() {
                Ok(locale) => self.locale = locale,
                Err(e) => tracing::warn!(error = %e, "ignoring MARQUEE_LANG"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(url) = &self.api_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(CoreError::Config(format!(
                "api base URL must start with http:// or https://, got {url}"
            )));
        }
        Ok(())
    }

    pub fn resolver(&self) -> PosterResolver {
        PosterResolver::new(self.image_base.clone(), self.poster_dir.clone())
    }

    /// HTTP favorites service for the configured API.
    pub fn rest_service(&self) -> Result<RestFavorites, CoreError> {
        self.validate()?;
        let url = self.api_url.as_deref().ok_or(CoreError::MissingApiUrl)?;
        let service = RestFavorites::new(url, self.token.clone());
        Ok(match self.timeout {
            Some(t) => service.with_timeout(t),
            None => service,
        })
    }
}
