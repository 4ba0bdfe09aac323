use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde_json::Value;
use uuid::Uuid;

use crate::canonical;
use crate::error::ServiceError;
use crate::models::Tweet;
use crate::schema::{self, TweetInput};
use crate::store::Collection;

const ENTITY: &str = "Tweet";

#[derive(Clone)]
pub struct TweetService {
    tweets: Arc<dyn Collection>,
}

impl TweetService {
    pub fn new(tweets: Arc<dyn Collection>) -> Self {
        Self { tweets }
    }

    /// Store a new tweet. `created_at` defaults to now. The author is not
    /// checked against the users collection.
    pub fn create(&self, raw: Value) -> Result<Tweet, ServiceError> {
        let draft = schema::parse::<TweetInput>(raw)?;
        let tweet = Tweet {
            tweet_id: draft.tweet_id,
            user_id: draft.user_id,
            content: draft.content,
            created_at: draft.created_at.unwrap_or_else(Utc::now),
            updated_at: draft.updated_at,
        };
        self.tweets
            .append(canonical::to_document(&tweet)?, &[self.tweets.primary_key()])?;
        info!(
            "Tweet created successfully in {}: {}",
            self.tweets.name(),
            tweet.tweet_id
        );
        Ok(tweet)
    }

    pub fn get_all(&self) -> Result<Vec<Tweet>, ServiceError> {
        self.tweets
            .list_all()?
            .into_iter()
            .map(|document| Ok(canonical::from_document::<Tweet>(document)?))
            .collect()
    }

    pub fn get_by_id(&self, tweet_id: Uuid) -> Result<Tweet, ServiceError> {
        let document = self
            .tweets
            .find(self.tweets.primary_key(), &canonical::encode_uuid(&tweet_id))?
            .ok_or_else(|| ServiceError::not_found(ENTITY, tweet_id))?;
        Ok(canonical::from_document(document)?)
    }

    /// Replace the fields of a tweet. The id in the body is ignored; a
    /// missing `created_at` keeps the stored one and a missing `updated_at`
    /// becomes now.
    pub fn update(&self, tweet_id: Uuid, raw: Value) -> Result<Tweet, ServiceError> {
        let draft = schema::parse::<TweetInput>(raw)?;
        let key = canonical::encode_uuid(&tweet_id);

        let mut document = canonical::to_document(&Tweet {
            tweet_id,
            user_id: draft.user_id,
            content: draft.content,
            created_at: draft.created_at.unwrap_or_else(Utc::now),
            updated_at: Some(draft.updated_at.unwrap_or_else(Utc::now)),
        })?;
        if draft.created_at.is_none() {
            document.remove(Tweet::CREATED_AT);
        }

        let merged = self
            .tweets
            .replace(self.tweets.primary_key(), &key, document, &[])?
            .ok_or_else(|| ServiceError::not_found(ENTITY, tweet_id))?;
        info!("Updated tweet {tweet_id}");
        Ok(canonical::from_document(merged)?)
    }

    pub fn delete(&self, tweet_id: Uuid) -> Result<Tweet, ServiceError> {
        let document = self
            .tweets
            .remove(self.tweets.primary_key(), &canonical::encode_uuid(&tweet_id))?
            .ok_or_else(|| ServiceError::not_found(ENTITY, tweet_id))?;
        info!("Deleted tweet {tweet_id}");
        Ok(canonical::from_document(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::services::Services;
    use crate::store::{Document, MemoryCollection, StoreError};
    use chrono::{DateTime, TimeZone};
    use serde_json::json;

    const TWEET: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    const AUTHOR: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn service() -> TweetService {
        Services::in_memory(MIN_BCRYPT_COST).tweets
    }

    fn body(content: &str) -> Value {
        json!({ "tweet_id": TWEET, "user_id": AUTHOR, "content": content })
    }

    fn id() -> Uuid {
        Uuid::parse_str(TWEET).unwrap()
    }

    #[test]
    fn created_at_defaults_to_the_call_time() {
        let tweets = service();
        let before = Utc::now();
        let tweet = tweets.create(body("hello")).unwrap();
        assert!(tweet.created_at >= before && tweet.created_at <= Utc::now());
        assert_eq!(tweet.updated_at, None);

        let mut second = body("again");
        second["tweet_id"] = json!(Uuid::new_v4());
        let later = tweets.create(second).unwrap();
        assert!(later.created_at >= tweet.created_at);
    }

    #[test]
    fn explicit_timestamps_survive_storage() {
        let tweets = service();
        let created = Utc.with_ymd_and_hms(2023, 5, 1, 8, 30, 0).unwrap();
        let mut raw = body("dated");
        raw["created_at"] = json!(canonical::encode_timestamp(&created));
        tweets.create(raw).unwrap();
        assert_eq!(tweets.get_by_id(id()).unwrap().created_at, created);
    }

    #[test]
    fn duplicate_tweet_id_is_rejected() {
        let tweets = service();
        tweets.create(body("one")).unwrap();
        assert!(matches!(
            tweets.create(body("two")),
            Err(ServiceError::Duplicate { .. })
        ));
    }

    #[test]
    fn orphan_author_is_accepted() {
        let tweets = service();
        let mut raw = body("nobody wrote this");
        raw["user_id"] = json!(Uuid::new_v4());
        assert!(tweets.create(raw).is_ok());
    }

    #[test]
    fn update_preserves_key_and_creation_time() {
        let tweets = service();
        let original = tweets.create(body("first draft")).unwrap();

        let mut raw = body("second draft");
        raw["tweet_id"] = json!(Uuid::new_v4());
        let updated = tweets.update(id(), raw).unwrap();

        assert_eq!(updated.tweet_id, id());
        assert_eq!(updated.content, "second draft");
        assert_eq!(updated.created_at, original.created_at);
        let edited: DateTime<Utc> = updated.updated_at.unwrap();
        assert!(edited >= original.created_at);
        assert_eq!(tweets.get_all().unwrap(), vec![updated]);
    }

    #[test]
    fn update_rejects_bad_content_before_touching_storage() {
        let tweets = service();
        tweets.create(body("keep me")).unwrap();
        assert!(matches!(
            tweets.update(id(), body(&"x".repeat(257))),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(tweets.get_by_id(id()).unwrap().content, "keep me");
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let tweets = service();
        let tweet = tweets.create(body("bye")).unwrap();
        assert_eq!(tweets.delete(id()).unwrap(), tweet);
        assert!(matches!(
            tweets.get_by_id(id()),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            tweets.update(id(), body("ghost")),
            Err(ServiceError::NotFound { .. })
        ));
    }

    /// Deletes the replaced document as soon as `replace` returns, standing
    /// in for a concurrent request.
    struct DeleteAfterReplace(MemoryCollection);

    impl Collection for DeleteAfterReplace {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn primary_key(&self) -> &str {
            self.0.primary_key()
        }

        fn list_all(&self) -> Result<Vec<Document>, StoreError> {
            self.0.list_all()
        }

        fn find(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
            self.0.find(key_field, key_value)
        }

        fn append(&self, document: Document, unique_on: &[&str]) -> Result<(), StoreError> {
            self.0.append(document, unique_on)
        }

        fn replace(
            &self,
            key_field: &str,
            key_value: &str,
            updated: Document,
            unique_on: &[&str],
        ) -> Result<Option<Document>, StoreError> {
            let merged = self.0.replace(key_field, key_value, updated, unique_on)?;
            self.0.remove(key_field, key_value)?;
            Ok(merged)
        }

        fn remove(&self, key_field: &str, key_value: &str) -> Result<Option<Document>, StoreError> {
            self.0.remove(key_field, key_value)
        }
    }

    #[test]
    fn update_reports_its_own_write_despite_a_later_delete() {
        let tweets = TweetService::new(Arc::new(DeleteAfterReplace(MemoryCollection::new(
            "tweets",
            Tweet::KEY,
        ))));
        let original = tweets.create(body("first draft")).unwrap();

        let updated = tweets.update(id(), body("second draft")).unwrap();
        assert_eq!(updated.content, "second draft");
        assert_eq!(updated.created_at, original.created_at);
        assert!(tweets.get_all().unwrap().is_empty());
    }
}
