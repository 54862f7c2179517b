//! Review entities shared by the store gateway and the HTTP API.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::CoreError;

const TITLE_MAX_CHARS: usize = 100;
const COMMENT_MIN_CHARS: usize = 10;

/// Star rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRating`] when `value` is outside 1–5.
    pub fn new(value: i64) -> Result<Self, CoreError> {
        match u8::try_from(value) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(CoreError::InvalidRating(value)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// User-supplied review content for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub title: String,
    pub comment: String,
    pub rating: Rating,
    #[serde(default)]
    pub restaurant_name: String,
}

impl ReviewDraft {
    /// Trim text fields and check their lengths.
    ///
    /// An empty `restaurant_name` becomes `"this restaurant"`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the title is empty or longer
    /// than 100 characters, or the comment is shorter than 10 characters.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let title = self.title.trim().to_string();
        let comment = self.comment.trim().to_string();
        let restaurant_name = match self.restaurant_name.trim() {
            "" => "this restaurant".to_string(),
            name => name.to_string(),
        };

        if title.is_empty() {
            return Err(CoreError::Validation {
                field: "title",
                reason: "must not be empty".to_string(),
            });
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(CoreError::Validation {
                field: "title",
                reason: format!("must be at most {TITLE_MAX_CHARS} characters"),
            });
        }
        if comment.chars().count() < COMMENT_MIN_CHARS {
            return Err(CoreError::Validation {
                field: "comment",
                reason: format!("must be at least {COMMENT_MIN_CHARS} characters"),
            });
        }

        Ok(Self {
            title,
            comment,
            rating: self.rating,
            restaurant_name,
        })
    }
}

/// A stored review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: String,
    /// Restaurant record id (`osm-…` / `nom-…`).
    pub place_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: Option<String>,
    pub restaurant_name: String,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    #[must_use]
    pub fn is_owned_by(&self, session: &Session) -> bool {
        self.user_id == session.user_id
    }
}

/// Equality filter used by list and subscribe operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReviewFilter {
    ByRestaurant(String),
    ByUser(String),
}

impl ReviewFilter {
    #[must_use]
    pub fn matches(&self, review: &ReviewRecord) -> bool {
        match self {
            ReviewFilter::ByRestaurant(place_id) => review.place_id == *place_id,
            ReviewFilter::ByUser(user_id) => review.user_id == *user_id,
        }
    }

    /// Column the filter applies to, as named in the review table.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            ReviewFilter::ByRestaurant(_) => "place_id",
            ReviewFilter::ByUser(_) => "user_id",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            ReviewFilter::ByRestaurant(v) | ReviewFilter::ByUser(v) => v,
        }
    }
}

/// Mean rating rounded half-away-from-zero to one decimal place.
///
/// Returns `None` when there are no reviews.
#[must_use]
pub fn average_rating(reviews: &[ReviewRecord]) -> Option<Decimal> {
    if reviews.is_empty() {
        return None;
    }
    let sum: Decimal = reviews
        .iter()
        .map(|r| Decimal::from(r.rating.value()))
        .sum();
    let mean = sum / Decimal::from(reviews.len());
    Some(mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

/// Order reviews newest first by creation time, ties broken by id.
pub fn sort_newest_first(reviews: &mut [ReviewRecord]) {
    reviews.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
#[path = "review_test.rs"]
mod tests;
