//! Backend collaborators (races, users, favorites, message history).
//!
//! Lookups return `Ok(None)` / an empty vec on "not found" and `Err` on
//! transport failures. The HTTP implementation lives in `racebot-backend`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{command::Platform, domain::UserRef, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub distances: Vec<u32>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub preferred_distances: Vec<u32>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Days before the race to send a reminder.
    #[serde(default = "default_reminder_days")]
    pub reminder_days: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            preferred_distances: Vec::new(),
            notifications_enabled: true,
            reminder_days: default_reminder_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reminder_days() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub race: Race,
    #[serde(default)]
    pub reminder: bool,
}

#[async_trait]
pub trait RaceService: Send + Sync {
    /// Upcoming races, soonest first.
    async fn list_upcoming(&self) -> Result<Vec<Race>>;

    /// Upcoming races offering any of `distances`.
    async fn by_distances(&self, distances: &[u32]) -> Result<Vec<Race>>;

    /// Upcoming races with a distance in `start..=end`.
    async fn by_range(&self, start: u32, end: u32) -> Result<Vec<Race>>;

    async fn next_race(&self) -> Result<Option<Race>>;

    async fn get(&self, race_id: &str) -> Result<Option<Race>>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// Create the user or refresh their display name.
    async fn upsert(&self, user: &UserRef) -> Result<()>;

    async fn preferences(&self, user: &UserRef) -> Result<Option<UserPreferences>>;

    async fn update_preferences(&self, user: &UserRef, prefs: &UserPreferences) -> Result<()>;
}

#[async_trait]
pub trait FavoriteService: Send + Sync {
    async fn list(&self, user: &UserRef) -> Result<Vec<Favorite>>;

    /// Add (or update) a favorite with the given reminder flag.
    async fn save(&self, user: &UserRef, race_id: &str, reminder: bool) -> Result<()>;

    /// Returns false if the race was not a favorite.
    async fn remove(&self, user: &UserRef, race_id: &str) -> Result<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// One line of chat history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub direction: MessageDirection,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub command: String,
    pub text: String,
    pub platform: &'static str,
}

impl MessageRecord {
    pub fn new(
        direction: MessageDirection,
        user: Option<&UserRef>,
        command: &str,
        text: String,
        platform: Platform,
    ) -> Self {
        Self {
            direction,
            user_id: user.map(|u| u.id.0.clone()),
            user_name: user.and_then(|u| u.name.clone()),
            command: command.to_string(),
            text,
            platform: platform.as_str(),
        }
    }
}

#[async_trait]
pub trait MessageHistory: Send + Sync {
    async fn record(&self, record: MessageRecord) -> Result<()>;
}
