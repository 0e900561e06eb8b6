//! Card view-model cache keyed by favorite id.
//!
//! Building a [`MovieCard`] resolves poster candidates and formats labels,
//! so the controller memoizes them per id. Entries are purged when a
//! removal commits; everything else is rebuilt lazily on the next lookup.

use std::collections::HashMap;

use crate::models::FavoriteItem;
use crate::poster::PosterResolver;

/// What a favorites card renders.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieCard {
    pub id: String,
    pub title: String,
    /// One decimal place, e.g. `"4.5"`.
    pub rating_label: String,
    pub year_label: Option<String>,
    /// Genres joined with `" · "`.
    pub genres_label: String,
    pub poster_candidates: Vec<String>,
}

impl MovieCard {
    pub fn build(item: &FavoriteItem, resolver: &PosterResolver) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            rating_label: format!("{:.1}", item.rating),
            year_label: item.year.as_ref().map(|y| y.to_string()),
            genres_label: item.genres.join(" · "),
            poster_candidates: resolver.resolve(&item.poster),
        }
    }
}

/// Memoized [`MovieCard`]s with hit/miss counters.
#[derive(Debug, Default)]
pub struct CardCache {
    cards: HashMap<String, MovieCard>,
    hits: u64,
    misses: u64,
}

impl CardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached card for `item`, building it on a miss.
    ///
    /// A cached card whose title no longer matches the item is treated as
    /// stale and rebuilt.
    pub fn get_or_build(&mut self, item: &FavoriteItem, resolver: &PosterResolver) -> MovieCard {
        if let Some(card) = self.cards.get(&item.id)
            && card.title == item.title
        {
            self.hits += 1;
            tracing::trace!(id = %item.id, "card cache hit");
            return card.clone();
        }
        self.misses += 1;
        tracing::trace!(id = %item.id, "card cache miss");
        let card = MovieCard::build(item, resolver);
        self.cards.insert(item.id.clone(), card.clone());
        card
    }

    /// Drop the entry for `id`. Returns whether one existed.
    pub fn purge(&mut self, id: &str) -> bool {
        self.cards.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
