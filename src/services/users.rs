use std::sync::{Arc, OnceLock};

use log::{debug, info};
use serde_json::Value;
use uuid::Uuid;

use crate::canonical;
use crate::error::ServiceError;
use crate::models::{User, UserRecord};
use crate::schema::{self, UserFields, UserRegister};
use crate::store::Collection;

const ENTITY: &str = "User";

/// Register, authenticate and manage users.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn Collection>,
    bcrypt_cost: u32,
    decoy_hash: Arc<OnceLock<String>>,
}

impl UserService {
    pub fn new(users: Arc<dyn Collection>, bcrypt_cost: u32) -> Self {
        Self {
            users,
            bcrypt_cost,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Validate a `UserRegister` body and store the new user with a hashed
    /// password. Fails if the id or the email is already registered.
    pub fn register(&self, raw: Value) -> Result<User, ServiceError> {
        let new_user = schema::parse::<UserRegister>(raw)?;
        let record = UserRecord {
            password_hash: bcrypt::hash(&new_user.password, self.bcrypt_cost)?,
            user: new_user.user,
        };
        let document = canonical::to_document(&record)?;
        self.users
            .append(document, &[self.users.primary_key(), User::EMAIL])?;
        info!(
            "Registered user {} in {}",
            record.user.user_id,
            self.users.name()
        );
        Ok(record.user)
    }

    /// First user whose email matches exactly and whose password verifies.
    ///
    /// An unknown email and a wrong password fail the same way and take
    /// comparable time.
    pub fn login(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let mut email_known = false;
        for document in self.users.list_all()? {
            if document.get(User::EMAIL).and_then(Value::as_str) != Some(email) {
                continue;
            }
            email_known = true;
            let record: UserRecord = canonical::from_document(document)?;
            if bcrypt::verify(password, &record.password_hash).unwrap_or(false) {
                debug!("User {} logged in", record.user.user_id);
                return Ok(record.user);
            }
        }
        if !email_known {
            let _ = bcrypt::verify(password, self.decoy_hash());
        }
        Err(ServiceError::InvalidCredentials)
    }

    pub fn get_all(&self) -> Result<Vec<User>, ServiceError> {
        self.users
            .list_all()?
            .into_iter()
            .map(|document| Ok(canonical::from_document::<User>(document)?))
            .collect()
    }

    pub fn get_by_id(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let document = self
            .users
            .find(self.users.primary_key(), &canonical::encode_uuid(&user_id))?
            .ok_or_else(|| ServiceError::not_found(ENTITY, user_id))?;
        Ok(canonical::from_document(document)?)
    }

    /// Replace every public field of a user. The id in the body is ignored
    /// and the stored password hash is kept. The new email may not belong
    /// to another user.
    pub fn update(&self, user_id: Uuid, raw: Value) -> Result<User, ServiceError> {
        let mut user = schema::parse::<UserFields>(raw)?;
        user.user_id = user_id;
        let document = canonical::to_document(&user)?;
        let merged = self
            .users
            .replace(
                self.users.primary_key(),
                &canonical::encode_uuid(&user_id),
                document,
                &[User::EMAIL],
            )?
            .ok_or_else(|| ServiceError::not_found(ENTITY, user_id))?;
        info!("Updated user {user_id}");
        Ok(canonical::from_document(merged)?)
    }

    pub fn delete(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let document = self
            .users
            .remove(self.users.primary_key(), &canonical::encode_uuid(&user_id))?
            .ok_or_else(|| ServiceError::not_found(ENTITY, user_id))?;
        info!("Deleted user {user_id}");
        Ok(canonical::from_document(document)?)
    }

    fn decoy_hash(&self) -> &str {
        self.decoy_hash
            .get_or_init(|| bcrypt::hash("decoy-password", self.bcrypt_cost).unwrap_or_default())
    }
}
