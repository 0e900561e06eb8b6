//! User-facing notification strings (English and Spanish).

use std::str::FromStr;

/// Display language for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = String;

    /// Accepts `en`, `es`, and region-tagged forms like `es-MX` or `en_US.UTF-8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .trim()
            .split(['-', '_', '.'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match lang.as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            _ => Err(format!("unsupported locale: {s}")),
        }
    }
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NotAuthenticated,
    ListFailed,
    AddFailed { title: String },
    RemoveFailed { title: String },
    RestoreFailed { title: String },
    Removed { title: String },
}

impl Message {
    pub fn text(&self, locale: Locale) -> String {
        match (self, locale) {
            (Message::NotAuthenticated, Locale::En) => "Please sign in to manage favorites.".into(),
            (Message::NotAuthenticated, Locale::Es) => {
                "Inicia sesión para gestionar tus favoritos.".into()
            }
            (Message::ListFailed, Locale::En) => "Could not load your favorites.".into(),
            (Message::ListFailed, Locale::Es) => "No se pudieron cargar tus favoritos.".into(),
            (Message::AddFailed { title }, Locale::En) => {
                format!("Could not add \"{title}\" to favorites.")
            }
            (Message::AddFailed { title }, Locale::Es) => {
                format!("No se pudo añadir \"{title}\" a favoritos.")
            }
            (Message::RemoveFailed { title }, Locale::En) => {
                format!("Could not remove \"{title}\". It has been restored.")
            }
            (Message::RemoveFailed { title }, Locale::Es) => {
                format!("No se pudo eliminar \"{title}\". Se ha restaurado.")
            }
            (Message::RestoreFailed { title }, Locale::En) => {
                format!("\"{title}\" was restored here but could not be saved again.")
            }
            (Message::RestoreFailed { title }, Locale::Es) => {
                format!("\"{title}\" se restauró aquí pero no se pudo volver a guardar.")
            }
            (Message::Removed { title }, Locale::En) => format!("Removed \"{title}\"."),
            (Message::Removed { title }, Locale::Es) => format!("Se eliminó \"{title}\"."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locale_tags() {
        assert_eq!("en".parse::<Locale>(), Ok(Locale::En));
        assert_eq!("ES".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!("es-MX".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!("en_US.UTF-8".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
        assert!("".parse::<Locale>().is_err());
    }

    #[test]
    fn messages_are_localized() {
        let msg = Message::RemoveFailed {
            title: "Heat".into(),
        };
        assert_eq!(
            msg.text(Locale::En),
            "Could not remove \"Heat\". It has been restored."
        );
        assert!(msg.text(Locale::Es).starts_with("No se pudo eliminar"));
    }
}
