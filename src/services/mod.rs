mod tweets;
mod users;

pub use tweets::TweetService;
pub use users::UserService;

use crate::models::{Tweet, User};
use crate::store::{JsonFileStore, StoreError};

pub const USERS_COLLECTION: &str = "users";
pub const TWEETS_COLLECTION: &str = "tweets";

/// Both entity services, shared with every request handler.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub tweets: TweetService,
}

impl Services {
    /// Open `users.json` and `tweets.json` under the store's data directory.
    pub fn open(store: &JsonFileStore, bcrypt_cost: u32) -> Result<Self, StoreError> {
        let users = store.collection(USERS_COLLECTION, User::KEY)?;
        let tweets = store.collection(TWEETS_COLLECTION, Tweet::KEY)?;
        Ok(Self {
            users: UserService::new(users, bcrypt_cost),
            tweets: TweetService::new(tweets),
        })
    }

    /// Services over empty in-memory collections.
    pub fn in_memory(bcrypt_cost: u32) -> Self {
        use crate::store::MemoryCollection;
        use std::sync::Arc;

        Self {
            users: UserService::new(
                Arc::new(MemoryCollection::new(USERS_COLLECTION, User::KEY)),
                bcrypt_cost,
            ),
            tweets: TweetService::new(Arc::new(MemoryCollection::new(
                TWEETS_COLLECTION,
                Tweet::KEY,
            ))),
        }
    }
}
