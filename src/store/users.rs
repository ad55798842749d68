//! User records

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// A registered user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<User>>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>>;

    /// Create a user; fails with `Conflict` if the phone is taken
    async fn create(&self, user: NewUser) -> AppResult<User>;
}

/// Users held in process memory
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().find(|u| u.phone == phone).cloned())
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);

        // Checked under the write lock so two registrations cannot both win
        if users.values().any(|u| u.phone == user.phone) {
            return Err(AppError::Conflict(format!(
                "Phone number {} is already registered",
                user.phone
            )));
        }

        let record = User {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            phone: user.phone,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }
}
