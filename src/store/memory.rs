use parking_lot::Mutex;

use super::{Collection, Document, StoreError};

/// A collection that lives only in memory.
pub struct MemoryCollection {
    name: String,
    primary_key: String,
    documents: Mutex<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            documents: Mutex::new(Vec::new()),
        }
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn list_all(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.documents.lock().clone())
    }

    fn find(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.lock();
        Ok(super::find_in(&documents, key_field, key_value).cloned())
    }

    fn append(&self, document: Document, unique_on: &[&str]) -> Result<(), StoreError> {
        super::append_to(&mut self.documents.lock(), document, unique_on)
    }

    fn replace(
        &self,
        key_field: &str,
        key_value: &str,
        updated: Document,
        unique_on: &[&str],
    ) -> Result<Option<Document>, StoreError> {
        super::replace_in(
            &mut self.documents.lock(),
            key_field,
            key_value,
            updated,
            unique_on,
        )
    }

    fn remove(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
        Ok(super::remove_from(
            &mut self.documents.lock(),
            key_field,
            key_value,
        ))
    }
}
