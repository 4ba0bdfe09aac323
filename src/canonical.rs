//! Conversion between domain values and the strings stored in documents.
//!
//! Identifiers are stored in their lowercase hyphenated form, dates as
//! `YYYY-MM-DD` and timestamps as RFC 3339 in UTC with exactly as many
//! fractional digits as the value needs. Absent optional values are stored as
//! JSON `null`.
//!
//! Decoding also accepts what older collection files contain: the string
//! `"None"` for an absent value and naive `YYYY-MM-DD HH:MM:SS[.ffffff]`
//! timestamps, read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{Document, StoreError};

const LEGACY_NONE: &str = "None";
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn encode_uuid(id: &Uuid) -> String {
    id.hyphenated().to_string()
}

pub fn decode_uuid(raw: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(raw)
}

pub fn encode_date(date: &NaiveDate) -> String {
    date.to_string()
}

pub fn decode_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    raw.parse()
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let rfc3339 = match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => return Ok(ts.with_timezone(&Utc)),
        Err(err) => err,
    };
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or(rfc3339)
}

/// Whether a stored string stands for "no value".
pub fn is_legacy_none(raw: &str) -> bool {
    raw == LEGACY_NONE
}

/// Serialize a record into the document shape written to a collection.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Rebuild a typed record from a stored document.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// `#[serde(with = "canonical::id")]` for `Uuid` fields.
pub mod id {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(value: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_uuid(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_uuid(&raw).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "canonical::timestamp")]` for `DateTime<Utc>` fields.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_timestamp(&raw).map_err(D::Error::custom)
    }
}

/// Optional timestamps. Pair with `#[serde(default)]`.
pub mod option_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&super::encode_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !super::is_legacy_none(&raw) => super::decode_timestamp(&raw)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Optional calendar dates. Pair with `#[serde(default)]`.
pub mod option_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&super::encode_date(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !super::is_legacy_none(&raw) => {
                super::decode_date(&raw).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }
}
