//! Favorites data model and normalization of remote records.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::poster::PosterFields;

/// Highest rating shown on a card.
pub const MAX_RATING: f32 = 5.0;

/// A release year as it came from the API: usually a number, sometimes free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Year {
    Numeric(i32),
    Text(String),
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Numeric(y) => write!(f, "{y}"),
            Year::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One entry of the user's favorites list. Identity is [`id`](Self::id).
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteItem {
    pub id: String,
    pub title: String,
    /// Raw image fields, resolved lazily by [`PosterResolver`](crate::poster::PosterResolver).
    pub poster: PosterFields,
    /// Always within `0.0..=5.0`.
    pub rating: f32,
    pub year: Option<Year>,
    pub genres: Vec<String>,
}

impl FavoriteItem {
    /// Minimal item with just an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            poster: PosterFields {
                title: Some(title.clone()),
                ..Default::default()
            },
            title,
            rating: 0.0,
            year: None,
            genres: Vec::new(),
        }
    }

    /// Normalize one favorites record.
    ///
    /// Records look like either a movie (`{id, title, ...}`) or a favorite
    /// wrapping one (`{movieId, movie: {...}}`). Fields on the nested movie
    /// win over the wrapper. Returns `None` when no id can be found.
    pub fn from_value(record: &Value) -> Option<Self> {
        if !record.is_object() {
            return None;
        }
        let movie = if record["movie"].is_object() {
            &record["movie"]
        } else {
            record
        };

        let id = ["id", "movieId", "movie_id", "_id"]
            .iter()
            .find_map(|key| id_field(&movie[*key]))
            .or_else(|| {
                ["movieId", "movie_id", "id", "_id"]
                    .iter()
                    .find_map(|key| id_field(&record[*key]))
            })?;

        let title = ["title", "name", "original_title"]
            .iter()
            .find_map(|key| movie[*key].as_str().or_else(|| record[*key].as_str()))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string();

        let mut poster = PosterFields::from_value(movie);
        if !std::ptr::eq(movie, record) {
            poster = poster.or(PosterFields::from_value(record));
        }
        if poster.title.is_none() {
            poster.title = Some(title.clone());
        }

        Some(Self {
            id,
            title,
            poster,
            rating: rating_field(movie),
            year: year_field(movie),
            genres: genres_field(&movie["genres"]),
        })
    }
}

fn id_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn rating_field(movie: &Value) -> f32 {
    let rating = movie["rating"]
        .as_f64()
        .or_else(|| movie["vote_average"].as_f64().map(|v| v / 2.0))
        .unwrap_or(0.0) as f32;
    if rating.is_finite() {
        rating.clamp(0.0, MAX_RATING)
    } else {
        0.0
    }
}

fn year_field(movie: &Value) -> Option<Year> {
    match &movie["year"] {
        Value::Number(n) => Some(
            n.as_i64()
                .and_then(|y| i32::try_from(y).ok())
                .map_or_else(|| Year::Text(n.to_string()), Year::Numeric),
        ),
        Value::String(s) if !s.trim().is_empty() => {
            let s = s.trim();
            Some(match s.parse::<i32>() {
                Ok(y) => Year::Numeric(y),
                Err(_) => Year::Text(s.to_string()),
            })
        }
        _ => movie["release_date"]
            .as_str()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse::<i32>().ok())
            .map(Year::Numeric),
    }
}

fn genres_field(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|g| g.as_str().or_else(|| g["name"].as_str()))
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize a favorites payload: a bare array or `{ "items": [...] }`.
///
/// Records without an id are dropped and duplicate ids keep their first
/// occurrence, so the result never repeats an id.
pub fn favorites_from_value(payload: &Value) -> Vec<FavoriteItem> {
    let records = payload
        .as_array()
        .or_else(|| payload["items"].as_array());
    let Some(records) = records else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(FavoriteItem::from_value)
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
