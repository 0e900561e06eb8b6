//! Poster image candidate resolution.
//!
//! Movie records coming from the favorites API, the catalog, and older
//! cached payloads disagree on where the poster lives (`poster`,
//! `posterUrl`, `poster_url`, `images.poster`, ...). [`candidates`] turns
//! whatever is present into an ordered list of URLs or local paths, most
//! specific first. Consumers try them in order and keep the first one that
//! loads.

use serde_json::Value;

/// Local directory used for derived fallback paths when none is configured.
pub const DEFAULT_LOCAL_DIR: &str = "/posters";

/// Explicit image fields in priority order.
const EXPLICIT_FIELDS: [&str; 7] = [
    "poster",
    "posterUrl",
    "poster_url",
    "images.poster",
    "image",
    "cover",
    "thumbnail",
];

/// The subset of a movie record that poster resolution looks at.
///
/// Every field is optional; a record with none of them simply produces no
/// candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterFields {
    pub poster: Option<String>,
    pub poster_url_camel: Option<String>,
    pub poster_url: Option<String>,
    pub images_poster: Option<String>,
    pub image: Option<String>,
    pub cover: Option<String>,
    pub thumbnail: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub year: Option<String>,
    pub release_date: Option<String>,
}

impl PosterFields {
    /// Extract poster-related fields from an arbitrary JSON record.
    ///
    /// Non-string values are ignored, except `year` which may be a number.
    pub fn from_value(value: &Value) -> Self {
        let year = match &value["year"] {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        };
        Self {
            poster: string_field(value, "poster"),
            poster_url_camel: string_field(value, "posterUrl"),
            poster_url: string_field(value, "poster_url"),
            images_poster: value["images"]["poster"].as_str().map(str::to_string),
            image: string_field(value, "image"),
            cover: string_field(value, "cover"),
            thumbnail: string_field(value, "thumbnail"),
            title: string_field(value, "title"),
            slug: string_field(value, "slug"),
            year,
            release_date: string_field(value, "release_date"),
        }
    }

    /// Fill fields that are unset here from `other`.
    pub fn or(self, other: PosterFields) -> Self {
        Self {
            poster: self.poster.or(other.poster),
            poster_url_camel: self.poster_url_camel.or(other.poster_url_camel),
            poster_url: self.poster_url.or(other.poster_url),
            images_poster: self.images_poster.or(other.images_poster),
            image: self.image.or(other.image),
            cover: self.cover.or(other.cover),
            thumbnail: self.thumbnail.or(other.thumbnail),
            title: self.title.or(other.title),
            slug: self.slug.or(other.slug),
            year: self.year.or(other.year),
            release_date: self.release_date.or(other.release_date),
        }
    }

    fn explicit(&self, key: &str) -> Option<&str> {
        let field = match key {
            "poster" => self.poster.as_deref(),
            "posterUrl" => self.poster_url_camel.as_deref(),
            "poster_url" => self.poster_url.as_deref(),
            "images.poster" => self.images_poster.as_deref(),
            "image" => self.image.as_deref(),
            "cover" => self.cover.as_deref(),
            "thumbnail" => self.thumbnail.as_deref(),
            _ => None,
        };
        field.map(str::trim).filter(|s| !s.is_empty())
    }

    /// Four-digit release year from `year`, falling back to `release_date`.
    pub fn release_year(&self) -> Option<String> {
        self.year
            .as_deref()
            .and_then(leading_year)
            .or_else(|| self.release_date.as_deref().and_then(leading_year))
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(str::to_string)
}

fn leading_year(s: &str) -> Option<String> {
    let s = s.trim();
    let digits: String = s.chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Resolves poster candidates against an optional remote image base and a
/// local fallback directory.
#[derive(Debug, Clone)]
pub struct PosterResolver {
    image_base: Option<String>,
    local_dir: String,
}

impl Default for PosterResolver {
    fn default() -> Self {
        Self {
            image_base: None,
            local_dir: DEFAULT_LOCAL_DIR.to_string(),
        }
    }
}

impl PosterResolver {
    pub fn new(image_base: Option<String>, local_dir: impl Into<String>) -> Self {
        let local_dir: String = local_dir.into();
        Self {
            image_base: image_base
                .map(|b| b.trim_end_matches('/').to_string())
                .filter(|b| !b.is_empty()),
            local_dir: local_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Ordered, deduplicated candidate list for `fields`.
    pub fn resolve(&self, fields: &PosterFields) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        };

        let explicit: Vec<&str> = EXPLICIT_FIELDS
            .iter()
            .filter_map(|key| fields.explicit(key))
            .collect();

        for value in &explicit {
            push((*value).to_string());
        }

        if let Some(base) = &self.image_base {
            for value in &explicit {
                if is_root_relative(value) {
                    push(format!("{base}{value}"));
                }
            }
        }

        let slug = fields
            .slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                fields
                    .title
                    .as_deref()
                    .map(slugify)
                    .filter(|s| !s.is_empty())
            });
        if let Some(slug) = slug {
            if let Some(year) = fields.release_year() {
                push(format!("{}/{slug}-{year}.jpg", self.local_dir));
            }
            push(format!("{}/{slug}.jpg", self.local_dir));
        }

        out
    }
}

/// `/abc.jpg` style paths, as opposed to absolute URLs or `data:` URIs.
fn is_root_relative(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}

/// Candidates using the default resolver (no image base, `/posters` fallbacks).
pub fn candidates(fields: &PosterFields) -> Vec<String> {
    PosterResolver::default().resolve(fields)
}

/// Candidates straight from a JSON movie record.
pub fn candidates_from_value(value: &Value) -> Vec<String> {
    candidates(&PosterFields::from_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_poster_url_comes_first() {
        let fields = PosterFields::from_value(&json!({ "poster_url": "https://cdn/x.jpg" }));
        let c = candidates(&fields);
        assert_eq!(c.first().map(String::as_str), Some("https://cdn/x.jpg"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn no_fields_yields_empty() {
        assert!(candidates_from_value(&json!({})).is_empty());
        assert!(candidates_from_value(&json!(null)).is_empty());
        assert!(candidates_from_value(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn wrong_types_are_ignored() {
        let c = candidates_from_value(&json!({
            "poster": 42,
            "images": "not an object",
            "cover": ["a"],
            "thumbnail": "https://cdn/t.jpg"
        }));
        assert_eq!(c, vec!["https://cdn/t.jpg".to_string()]);
    }

    #[test]
    fn explicit_field_order() {
        let c = candidates_from_value(&json!({
            "thumbnail": "t",
            "cover": "c",
            "image": "i",
            "images": { "poster": "ip" },
            "poster_url": "pu",
            "posterUrl": "pU",
            "poster": "p"
        }));
        assert_eq!(c, vec!["p", "pU", "pu", "ip", "i", "c", "t"]);
    }

    #[test]
    fn duplicates_are_removed() {
        let c = candidates_from_value(&json!({
            "poster": "https://cdn/a.jpg",
            "posterUrl": "https://cdn/a.jpg",
            "cover": "  https://cdn/a.jpg  ",
            "slug": "heat",
            "title": "Heat"
        }));
        assert_eq!(c, vec!["https://cdn/a.jpg", "/posters/heat.jpg"]);
    }

    #[test]
    fn blank_values_skipped() {
        let c = candidates_from_value(&json!({ "poster": "   ", "image": "" }));
        assert!(c.is_empty());
    }

    #[test]
    fn derived_paths_use_slug_then_title() {
        let c = candidates_from_value(&json!({ "title": "The Godfather: Part II", "year": 1974 }));
        assert_eq!(
            c,
            vec![
                "/posters/the-godfather-part-ii-1974.jpg",
                "/posters/the-godfather-part-ii.jpg"
            ]
        );

        let c = candidates_from_value(&json!({ "title": "Ignored", "slug": "godfather-2" }));
        assert_eq!(c, vec!["/posters/godfather-2.jpg"]);
    }

    #[test]
    fn year_from_release_date() {
        let fields = PosterFields::from_value(&json!({
            "slug": "alien",
            "release_date": "1979-05-25"
        }));
        assert_eq!(fields.release_year().as_deref(), Some("1979"));
        assert_eq!(
            candidates(&fields),
            vec!["/posters/alien-1979.jpg", "/posters/alien.jpg"]
        );
    }

    #[test]
    fn image_base_joins_relative_paths() {
        let resolver = PosterResolver::new(Some("https://img.example/w500/".into()), "/static/");
        let fields = PosterFields::from_value(&json!({
            "poster": "/abc.jpg",
            "cover": "https://cdn/full.jpg",
            "thumbnail": "//cdn/proto-relative.jpg",
            "slug": "x"
        }));
        assert_eq!(
            resolver.resolve(&fields),
            vec![
                "/abc.jpg",
                "https://cdn/full.jpg",
                "//cdn/proto-relative.jpg",
                "https://img.example/w500/abc.jpg",
                "/static/x.jpg"
            ]
        );
    }

    #[test]
    fn or_prefers_self() {
        let a = PosterFields {
            poster: Some("a".into()),
            ..Default::default()
        };
        let b = PosterFields {
            poster: Some("b".into()),
            title: Some("B".into()),
            ..Default::default()
        };
        let merged = a.or(b);
        assert_eq!(merged.poster.as_deref(), Some("a"));
        assert_eq!(merged.title.as_deref(), Some("B"));
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Amélie -- (2001)!"), "am-lie-2001");
        assert_eq!(slugify("???"), "");
    }
}
