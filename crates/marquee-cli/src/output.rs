use std::io::Write;
use std::time::Duration;

use marquee_core::{FavoritesEvent, Locale, Message, MovieCard};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print one line per favorite card.
pub fn print_cards(w: &mut dyn Write, cards: &[MovieCard], color: ColorMode) -> std::io::Result<()> {
    if cards.is_empty() {
        writeln!(w, "No favorites yet.")?;
        return Ok(());
    }

    for card in cards {
        let year = card
            .year_label
            .as_deref()
            .map(|y| format!(" ({y})"))
            .unwrap_or_default();
        let rating = format!("★ {}", card.rating_label);
        if color.enabled() {
            writeln!(
                w,
                "{} {}{}  {}",
                format!("[{}]", card.id).dimmed(),
                card.title.bold(),
                year,
                rating.yellow()
            )?;
        } else {
            writeln!(w, "[{}] {}{}  {}", card.id, card.title, year, rating)?;
        }
        if !card.genres_label.is_empty() {
            writeln!(w, "    {}", card.genres_label)?;
        }
        if let Some(poster) = card.poster_candidates.first() {
            if color.enabled() {
                writeln!(w, "    {}", poster.dimmed())?;
            } else {
                writeln!(w, "    {}", poster)?;
            }
        }
    }
    writeln!(w)?;
    writeln!(w, "{} favorites", cards.len())?;
    Ok(())
}

/// Print a controller event. Loading and withdrawal events are not shown.
pub fn print_event(
    w: &mut dyn Write,
    event: &FavoritesEvent,
    locale: Locale,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        FavoritesEvent::UndoOffered { title, .. } => {
            let text = Message::Removed {
                title: title.clone(),
            }
            .text(locale);
            if color.enabled() {
                writeln!(w, "{}", text.yellow())?;
            } else {
                writeln!(w, "{}", text)?;
            }
        }
        FavoritesEvent::Committed { id } => {
            if color.enabled() {
                writeln!(w, "{} {}", "-> REMOVED".red(), id)?;
            } else {
                writeln!(w, "-> REMOVED {}", id)?;
            }
        }
        FavoritesEvent::Restored { id } => {
            if color.enabled() {
                writeln!(w, "{} {}", "-> RESTORED".green(), id)?;
            } else {
                writeln!(w, "-> RESTORED {}", id)?;
            }
        }
        FavoritesEvent::Added { id } => {
            if color.enabled() {
                writeln!(w, "{} {}", "-> ADDED".green(), id)?;
            } else {
                writeln!(w, "-> ADDED {}", id)?;
            }
        }
        FavoritesEvent::Error { message, .. } => {
            if color.enabled() {
                writeln!(w, "{} {}", "ERROR:".red().bold(), message)?;
            } else {
                writeln!(w, "ERROR: {}", message)?;
            }
        }
        FavoritesEvent::LoadingStarted
        | FavoritesEvent::LoadingFinished { .. }
        | FavoritesEvent::UndoWithdrawn { .. } => {}
    }
    Ok(())
}

/// Print the key hints shown while a removal can still be undone.
pub fn print_undo_prompt(
    w: &mut dyn Write,
    window: Duration,
    color: ColorMode,
) -> std::io::Result<()> {
    let hint = format!(
        "Committing in {:.1}s. [u] undo  [d] remove now  [Enter] wait",
        window.as_secs_f64()
    );
    if color.enabled() {
        writeln!(w, "{}", hint.dimmed())?;
    } else {
        writeln!(w, "{}", hint)?;
    }
    w.flush()
}

/// Print poster candidates for one record, in try-order.
pub fn print_candidates(
    w: &mut dyn Write,
    label: &str,
    candidates: &[String],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", label.bold())?;
    } else {
        writeln!(w, "{}", label)?;
    }
    if candidates.is_empty() {
        writeln!(w, "  (no poster candidates)")?;
    }
    for (i, candidate) in candidates.iter().enumerate() {
        writeln!(w, "  {}. {}", i + 1, candidate)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn cards_plain() {
        let card = MovieCard {
            id: "7".into(),
            title: "Alien".into(),
            rating_label: "4.5".into(),
            year_label: Some("1979".into()),
            genres_label: "Horror · Sci-Fi".into(),
            poster_candidates: vec!["/posters/alien-1979.jpg".into()],
        };
        let out = render(|w| print_cards(w, &[card], ColorMode(false)));
        assert!(out.starts_with("[7] Alien (1979)  ★ 4.5\n"));
        assert!(out.contains("    Horror · Sci-Fi\n"));
        assert!(out.contains("    /posters/alien-1979.jpg\n"));
        assert!(out.ends_with("1 favorites\n"));
    }

    #[test]
    fn empty_list() {
        let out = render(|w| print_cards(w, &[], ColorMode(false)));
        assert_eq!(out, "No favorites yet.\n");
    }

    #[test]
    fn quiet_events_print_nothing() {
        let out = render(|w| {
            print_event(w, &FavoritesEvent::LoadingStarted, Locale::En, ColorMode(false))?;
            print_event(
                w,
                &FavoritesEvent::UndoWithdrawn { id: "1".into() },
                Locale::En,
                ColorMode(false),
            )
        });
        assert!(out.is_empty());
    }

    #[test]
    fn error_event() {
        let event = FavoritesEvent::Error {
            id: Some("1".into()),
            message: "Could not remove \"Alien\". It has been restored.".into(),
        };
        let out = render(|w| print_event(w, &event, Locale::En, ColorMode(false)));
        assert_eq!(out, "ERROR: Could not remove \"Alien\". It has been restored.\n");
    }

    #[test]
    fn removal_notice_is_localized() {
        let event = FavoritesEvent::UndoOffered {
            id: "1".into(),
            title: "Alien".into(),
        };
        let en = render(|w| print_event(w, &event, Locale::En, ColorMode(false)));
        let es = render(|w| print_event(w, &event, Locale::Es, ColorMode(false)));
        assert_eq!(en, "Removed \"Alien\".\n");
        assert_eq!(es, "Se eliminó \"Alien\".\n");
    }

    #[test]
    fn candidates_are_numbered() {
        let list = vec!["https://img/a.jpg".to_string(), "/posters/a.jpg".to_string()];
        let out = render(|w| print_candidates(w, "A", &list, ColorMode(false)));
        assert_eq!(out, "A\n  1. https://img/a.jpg\n  2. /posters/a.jpg\n");
    }
}
