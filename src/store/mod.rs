//! Document collections.
//!
//! A collection is an ordered list of JSON objects. Lookups are linear scans
//! and every mutation rewrites the whole collection, which is fine for the
//! small record counts this service holds.

mod json_file;
mod memory;

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

pub use json_file::{JsonCollection, JsonFileStore};
pub use memory::MemoryCollection;

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on collection `{collection}`: {source}")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record did not serialize to a JSON object")]
    NotAnObject,

    #[error("collection `{collection}` is corrupt: {detail}")]
    Corrupt { collection: String, detail: String },

    #[error("gave up on collection `{collection}` after waiting {waited:?} for the lock")]
    LockTimeout { collection: String, waited: Duration },

    #[error("a document with {field} = {value} already exists")]
    DuplicateKey { field: String, value: String },

    #[error("collection `{collection}` is keyed by `{existing}`, not `{requested}`")]
    KeyMismatch {
        collection: String,
        existing: String,
        requested: String,
    },
}

/// Read-modify-write access to one collection.
///
/// Implementations must make each call atomic with respect to every other
/// call on the same collection.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Field holding the primary key of every document.
    fn primary_key(&self) -> &str;

    fn list_all(&self) -> Result<Vec<Document>, StoreError>;

    /// First document whose `key_field` is the string `key_value`.
    fn find(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError>;

    /// Add `document` at the end. Fails with [`StoreError::DuplicateKey`]
    /// if any field named in `unique_on` already holds the same value.
    fn append(&self, document: Document, unique_on: &[&str]) -> Result<(), StoreError>;

    /// Copy every field of `updated` except `key_field` onto the first match
    /// and return the merged document, or `None` if nothing matched.
    ///
    /// Fails with [`StoreError::DuplicateKey`] if a field named in
    /// `unique_on` would clash with any other document.
    fn replace(
        &self,
        key_field: &str,
        key_value: &str,
        updated: Document,
        unique_on: &[&str],
    ) -> Result<Option<Document>, StoreError>;

    fn remove(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError>;
}

fn matches(document: &Document, key_field: &str, key_value: &str) -> bool {
    document.get(key_field).and_then(Value::as_str) == Some(key_value)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn find_in<'a>(
    documents: &'a [Document],
    key_field: &str,
    key_value: &str,
) -> Option<&'a Document> {
    documents
        .iter()
        .find(|document| matches(document, key_field, key_value))
}

/// Fails if `document` clashes on a `unique_on` field with any entry of
/// `documents` other than the one at `skip`.
fn check_unique(
    documents: &[Document],
    document: &Document,
    unique_on: &[&str],
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for field in unique_on {
        let Some(value) = document.get(*field) else {
            continue;
        };
        let clash = documents.iter().enumerate().any(|(index, existing)| {
            Some(index) != skip && existing.get(*field) == Some(value)
        });
        if clash {
            return Err(StoreError::DuplicateKey {
                field: (*field).to_owned(),
                value: display_value(value),
            });
        }
    }
    Ok(())
}

pub(crate) fn append_to(
    documents: &mut Vec<Document>,
    document: Document,
    unique_on: &[&str],
) -> Result<(), StoreError> {
    check_unique(documents, &document, unique_on, None)?;
    documents.push(document);
    Ok(())
}

pub(crate) fn replace_in(
    documents: &mut [Document],
    key_field: &str,
    key_value: &str,
    updated: Document,
    unique_on: &[&str],
) -> Result<Option<Document>, StoreError> {
    let Some(index) = documents
        .iter()
        .position(|document| matches(document, key_field, key_value))
    else {
        return Ok(None);
    };
    check_unique(documents, &updated, unique_on, Some(index))?;

    let target = &mut documents[index];
    for (field, value) in updated {
        if field != key_field {
            target.insert(field, value);
        }
    }
    Ok(Some(target.clone()))
}

pub(crate) fn remove_from(
    documents: &mut Vec<Document>,
    key_field: &str,
    key_value: &str,
) -> Option<Document> {
    let index = documents
        .iter()
        .position(|document| matches(document, key_field, key_value))?;
    Some(documents.remove(index))
}
