use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub favorites: Option<FavoritesConfig>,
    pub posters: Option<PostersConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavoritesConfig {
    pub undo_window_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostersConfig {
    pub image_base: Option<String>,
    pub local_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub locale: Option<String>,
}

/// Platform config directory path: `<config_dir>/marquee/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("marquee").join("config.toml"))
}

/// Load config by cascading CWD `.marquee.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".marquee.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config");
            None
        }
    }
}

/// Pick a section field from `overlay`, falling back to `base`.
fn pick<S, T: Clone>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> &Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(|s| field(s).clone())
        .or_else(|| base.as_ref().and_then(|s| field(s).clone()))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            base_url: pick(&overlay.api, &base.api, |a| &a.base_url),
            token: pick(&overlay.api, &base.api, |a| &a.token),
            timeout_secs: pick(&overlay.api, &base.api, |a| &a.timeout_secs),
        }),
        favorites: Some(FavoritesConfig {
            undo_window_ms: pick(&overlay.favorites, &base.favorites, |f| &f.undo_window_ms),
        }),
        posters: Some(PostersConfig {
            image_base: pick(&overlay.posters, &base.posters, |p| &p.image_base),
            local_dir: pick(&overlay.posters, &base.posters, |p| &p.local_dir),
        }),
        display: Some(DisplayConfig {
            locale: pick(&overlay.display, &base.display, |d| &d.locale),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let config: ConfigFile = toml::from_str(
            r#"
            [api]
            base_url = "https://api.example.com"

            [favorites]
            undo_window_ms = 3000
            "#,
        )
        .unwrap();
        let api = config.api.unwrap();
        assert_eq!(api.base_url.as_deref(), Some("https://api.example.com"));
        assert!(api.token.is_none());
        assert_eq!(config.favorites.unwrap().undo_window_ms, Some(3000));
        assert!(config.posters.is_none());
    }

    #[test]
    fn overlay_wins_and_base_fills_gaps() {
        let base = ConfigFile {
            api: Some(ApiConfig {
                base_url: Some("https://base".into()),
                token: Some("base-token".into()),
                timeout_secs: None,
            }),
            display: Some(DisplayConfig {
                locale: Some("en".into()),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            api: Some(ApiConfig {
                base_url: Some("https://overlay".into()),
                ..Default::default()
            }),
            display: Some(DisplayConfig {
                locale: Some("es".into()),
            }),
            ..Default::default()
        };

        let merged = merge(base, overlay);
        let api = merged.api.unwrap();
        assert_eq!(api.base_url.as_deref(), Some("https://overlay"));
        assert_eq!(api.token.as_deref(), Some("base-token"));
        assert_eq!(merged.display.unwrap().locale.as_deref(), Some("es"));
        assert!(merged.favorites.unwrap().undo_window_ms.is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[posters]\nimage_base = \"https://img\"\nlocal_dir = \"/static/posters\"\n",
        )
        .unwrap();

        let loaded = load_from_path(&path).unwrap();
        let posters = loaded.posters.unwrap();
        assert_eq!(posters.image_base.as_deref(), Some("https://img"));
        assert_eq!(posters.local_dir.as_deref(), Some("/static/posters"));
    }

    #[test]
    fn missing_or_broken_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("absent.toml")).is_none());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[api\nbase_url = ").unwrap();
        assert!(load_from_path(&broken).is_none());
    }
}
