use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(with = "canonical::id")]
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, with = "canonical::option_date")]
    pub birth_date: Option<NaiveDate>,
}

impl User {
    pub const KEY: &'static str = "user_id";
    pub const EMAIL: &'static str = "email";
}

/// A user as stored in the users collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    /// Empty for records written before passwords were hashed; such users
    /// cannot log in.
    #[serde(default)]
    pub password_hash: String,
}

/// Registration input after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user: User,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(with = "canonical::id")]
    pub tweet_id: Uuid,
    #[serde(with = "canonical::id")]
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "canonical::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "canonical::option_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tweet {
    pub const KEY: &'static str = "tweet_id";
    pub const CREATED_AT: &'static str = "created_at";
}

/// Tweet input after validation; timestamps the caller left out are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetDraft {
    pub tweet_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
