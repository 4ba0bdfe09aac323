//! Inbound shapes and their field constraints.
//!
//! Every input arrives as a raw JSON map. [`parse`] checks it against one of
//! the shapes below and either yields the typed value or a
//! [`ValidationError`] naming every offending field.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::canonical;
use crate::models::{Credentials, NewUser, TweetDraft, User};

const UUID_MESSAGE: &str = "must be a valid UUID";
const DATE_MESSAGE: &str = "must be a calendar date (YYYY-MM-DD)";
const TIMESTAMP_MESSAGE: &str = "must be an ISO 8601 timestamp";

/// Offending fields, each with one or more messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid input: {}", field_list(.fields))]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

fn field_list(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field} {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// An input shape that can be turned into a typed value.
pub trait Schema: DeserializeOwned + Validate {
    type Output;

    /// Finish validation past what the derive covers. `errors` already holds
    /// the derive's findings.
    fn into_output(self, errors: ValidationError) -> Result<Self::Output, ValidationError>;
}

/// Validate a raw JSON map against `S`.
pub fn parse<S: Schema>(raw: Value) -> Result<S::Output, ValidationError> {
    if !raw.is_object() {
        return Err(ValidationError::field("body", "must be a JSON object"));
    }
    let input: S =
        serde_json::from_value(raw).map_err(|e| ValidationError::field("body", e.to_string()))?;
    let errors = derive_errors(&input);
    input.into_output(errors)
}

/// Parse an identifier taken from a request path.
pub fn parse_id(raw: &str) -> Result<Uuid, ValidationError> {
    canonical::decode_uuid(raw).map_err(|_| ValidationError::field("id", UUID_MESSAGE))
}

fn derive_errors(input: &impl Validate) -> ValidationError {
    match input.validate() {
        Ok(()) => ValidationError::default(),
        Err(errors) => errors.into(),
    }
}

fn required<T, E>(
    errors: &mut ValidationError,
    field: &str,
    raw: &str,
    decode: impl Fn(&str) -> Result<T, E>,
    message: &str,
) -> Option<T> {
    match decode(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, message);
            None
        }
    }
}

fn optional<T, E>(
    errors: &mut ValidationError,
    field: &str,
    raw: Option<&str>,
    decode: impl Fn(&str) -> Result<T, E>,
    message: &str,
) -> Option<Option<T>> {
    match raw {
        None => Some(None),
        Some(raw) => required(errors, field, raw, decode, message).map(Some),
    }
}

fn finish<T>(errors: ValidationError, value: Option<T>) -> Result<T, ValidationError> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(errors),
    }
}

/// The public user shape; also the body of `PUT /users/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserFields {
    pub user_id: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "must be 1 to 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "must be 1 to 50 characters"))]
    pub last_name: String,
    pub birth_date: Option<String>,
}

impl Schema for UserFields {
    type Output = User;

    fn into_output(self, mut errors: ValidationError) -> Result<User, ValidationError> {
        let user_id = required(
            &mut errors,
            "user_id",
            &self.user_id,
            canonical::decode_uuid,
            UUID_MESSAGE,
        );
        let birth_date: Option<Option<NaiveDate>> = optional(
            &mut errors,
            "birth_date",
            self.birth_date.as_deref(),
            canonical::decode_date,
            DATE_MESSAGE,
        );
        let user = user_id.zip(birth_date).map(|(user_id, birth_date)| User {
            user_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date,
        });
        finish(errors, user)
    }
}

/// Body of `POST /signup`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserRegister {
    #[serde(flatten)]
    pub user: UserFields,
    #[serde(default)]
    #[validate(length(min = 8, max = 64, message = "must be 8 to 64 characters"))]
    pub password: String,
}

impl Schema for UserRegister {
    type Output = NewUser;

    fn into_output(self, mut errors: ValidationError) -> Result<NewUser, ValidationError> {
        errors.merge(derive_errors(&self.user));
        let password = self.password;
        let user = match self.user.into_output(ValidationError::default()) {
            Ok(user) => Some(user),
            Err(user_errors) => {
                errors.merge(user_errors);
                None
            }
        };
        finish(errors, user.map(|user| NewUser { user, password }))
    }
}

/// Body of `POST /login`. Only the shape is checked; a wrong value is an
/// authentication failure, not a validation one.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

impl Schema for UserLogin {
    type Output = Credentials;

    fn into_output(self, errors: ValidationError) -> Result<Credentials, ValidationError> {
        finish(
            errors,
            Some(Credentials {
                email: self.email,
                password: self.password,
            }),
        )
    }
}

/// Body of `POST /tweets/` and `PUT /tweets/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TweetInput {
    pub tweet_id: String,
    pub user_id: String,
    #[validate(length(min = 1, max = 256, message = "must be 1 to 256 characters"))]
    pub content: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Schema for TweetInput {
    type Output = TweetDraft;

    fn into_output(self, mut errors: ValidationError) -> Result<TweetDraft, ValidationError> {
        let tweet_id = required(
            &mut errors,
            "tweet_id",
            &self.tweet_id,
            canonical::decode_uuid,
            UUID_MESSAGE,
        );
        let user_id = required(
            &mut errors,
            "user_id",
            &self.user_id,
            canonical::decode_uuid,
            UUID_MESSAGE,
        );
        let created_at: Option<Option<DateTime<Utc>>> = optional(
            &mut errors,
            "created_at",
            self.created_at.as_deref(),
            canonical::decode_timestamp,
            TIMESTAMP_MESSAGE,
        );
        let updated_at = optional(
            &mut errors,
            "updated_at",
            self.updated_at.as_deref(),
            canonical::decode_timestamp,
            TIMESTAMP_MESSAGE,
        );
        let draft = match (tweet_id, user_id, created_at, updated_at) {
            (Some(tweet_id), Some(user_id), Some(created_at), Some(updated_at)) => {
                Some(TweetDraft {
                    tweet_id,
                    user_id,
                    content: self.content,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };
        finish(errors, draft)
    }
}
