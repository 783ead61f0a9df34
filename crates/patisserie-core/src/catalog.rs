//! Filter/Sort Engine for learning paths and techniques.
//!
//! Filtering and sorting are pure functions over borrowed slices. Sorting is
//! stable in both directions: ties keep their input order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::curriculum::{Difficulty, LearningPath, Technique};

/// `<number> <unit>` pairs inside a free-form duration.
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(weeks?|wks?|w|days?|d|hours?|hrs?|h|minutes?|mins?|m)?\b")
        .unwrap()
});

const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 24.0 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: f64 = 7.0 * MINUTES_PER_DAY;

/// Parse a duration such as "45 min", "1 hour 30 minutes" or "6 weeks" into
/// minutes.
///
/// Unit-bearing components are summed. Without any unit the first number is
/// read as minutes. Unparsable input yields 0.
pub fn parse_duration_minutes(duration: &str) -> u32 {
    let mut total = 0.0;
    let mut bare = None;

    for caps in DURATION_RE.captures_iter(duration) {
        let Ok(value) = caps[1].parse::<f64>() else {
            continue;
        };
        let Some(unit) = caps.get(2) else {
            bare.get_or_insert(value);
            continue;
        };
        let unit = unit.as_str().to_lowercase();
        let scale = match unit.chars().next() {
            Some('w') => MINUTES_PER_WEEK,
            Some('d') => MINUTES_PER_DAY,
            Some('h') => MINUTES_PER_HOUR,
            _ => 1.0,
        };
        total += value * scale;
    }

    if total == 0.0 {
        total = bare.unwrap_or(0.0);
    }
    total.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Common view over catalogue entries.
pub trait Listing {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn tags(&self) -> &[String];
    fn category(&self) -> &str;
    fn difficulty(&self) -> Difficulty;
    fn duration(&self) -> &str;
    fn rating(&self) -> f32;
    fn featured(&self) -> bool;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn instructor(&self) -> &str {
        ""
    }

    fn student_count(&self) -> u32 {
        0
    }

    fn completion_rate(&self) -> f32 {
        0.0
    }

    fn certificate(&self) -> bool {
        false
    }

    fn duration_minutes(&self) -> u32 {
        parse_duration_minutes(self.duration())
    }
}

impl Listing for LearningPath {
    fn title(&self) -> &str {
        &self.title
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    fn duration(&self) -> &str {
        &self.duration
    }
    fn rating(&self) -> f32 {
        self.rating
    }
    fn featured(&self) -> bool {
        self.featured
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
    fn instructor(&self) -> &str {
        &self.instructor
    }
    fn student_count(&self) -> u32 {
        self.student_count
    }
    fn completion_rate(&self) -> f32 {
        self.completion_rate
    }
    fn certificate(&self) -> bool {
        self.certificate
    }
}

impl Listing for Technique {
    fn title(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    fn duration(&self) -> &str {
        &self.duration
    }
    fn rating(&self) -> f32 {
        self.rating
    }
    fn featured(&self) -> bool {
        self.featured
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Filter criteria. Unset fields match everything; set fields are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Case-insensitive substring over title, description and tags.
    pub search: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub instructor: Option<String>,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
    pub min_rating: Option<f32>,
    pub max_rating: Option<f32>,
    pub min_duration_minutes: Option<u32>,
    pub max_duration_minutes: Option<u32>,
    pub min_students: Option<u32>,
    pub featured: Option<bool>,
    pub certificate: Option<bool>,
}

impl FilterCriteria {
    pub fn matches<T: Listing + ?Sized>(&self, item: &T) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() && !matches_search(item, &search.to_lowercase()) {
                return false;
            }
        }
        if !equals_ignoring_case(self.category.as_deref(), item.category()) {
            return false;
        }
        if !equals_ignoring_case(self.instructor.as_deref(), item.instructor()) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != item.difficulty()) {
            return false;
        }
        let all_tags = self.tags.iter().all(|wanted| {
            item.tags()
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(wanted))
        });
        if !all_tags {
            return false;
        }
        if !in_range(item.rating(), self.min_rating, self.max_rating) {
            return false;
        }
        if self.min_duration_minutes.is_some() || self.max_duration_minutes.is_some() {
            let minutes = item.duration_minutes();
            if !in_range(minutes, self.min_duration_minutes, self.max_duration_minutes) {
                return false;
            }
        }
        if self.min_students.is_some_and(|min| item.student_count() < min) {
            return false;
        }
        if self.featured.is_some_and(|f| f != item.featured()) {
            return false;
        }
        if self.certificate.is_some_and(|c| c != item.certificate()) {
            return false;
        }
        true
    }
}

fn matches_search<T: Listing + ?Sized>(item: &T, needle: &str) -> bool {
    item.title().to_lowercase().contains(needle)
        || item.description().to_lowercase().contains(needle)
        || item
            .tags()
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

fn equals_ignoring_case(wanted: Option<&str>, actual: &str) -> bool {
    wanted.map_or(true, |w| w.trim().eq_ignore_ascii_case(actual.trim()))
}

/// Inclusive on both ends.
fn in_range<N: PartialOrd>(value: N, min: Option<N>, max: Option<N>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

/// Keep the items matching `criteria`, in input order.
pub fn filter<'a, T: Listing>(items: &'a [T], criteria: &FilterCriteria) -> Vec<&'a T> {
    items.iter().filter(|item| criteria.matches(*item)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Name,
    Rating,
    Difficulty,
    Duration,
    Students,
    CompletionRate,
    Created,
    Updated,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Name => "name",
            SortKey::Rating => "rating",
            SortKey::Difficulty => "difficulty",
            SortKey::Duration => "duration",
            SortKey::Students => "students",
            SortKey::CompletionRate => "completion-rate",
            SortKey::Created => "created",
            SortKey::Updated => "updated",
        };
        f.write_str(name)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "name" | "title" => Ok(SortKey::Name),
            "rating" => Ok(SortKey::Rating),
            "difficulty" => Ok(SortKey::Difficulty),
            "duration" => Ok(SortKey::Duration),
            "students" | "student-count" => Ok(SortKey::Students),
            "completion-rate" | "completion" => Ok(SortKey::CompletionRate),
            "created" | "created-at" => Ok(SortKey::Created),
            "updated" | "updated-at" => Ok(SortKey::Updated),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Compare two listings on one key, ascending.
pub fn compare<T: Listing + ?Sized>(a: &T, b: &T, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        SortKey::Rating => a.rating().total_cmp(&b.rating()),
        SortKey::Difficulty => a.difficulty().cmp(&b.difficulty()),
        SortKey::Duration => a.duration_minutes().cmp(&b.duration_minutes()),
        SortKey::Students => a.student_count().cmp(&b.student_count()),
        SortKey::CompletionRate => a.completion_rate().total_cmp(&b.completion_rate()),
        SortKey::Created => a.created_at().cmp(&b.created_at()),
        SortKey::Updated => a.updated_at().cmp(&b.updated_at()),
    }
}

/// Stable sort on `key`.
pub fn sort<T: Listing>(mut items: Vec<&T>, key: SortKey, direction: SortDirection) -> Vec<&T> {
    items.sort_by(|a, b| {
        let ordering = compare(*a, *b, key);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    items
}
