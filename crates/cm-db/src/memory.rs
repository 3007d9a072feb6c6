//! In-memory stores (for development/testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cm_core::Id;
use cm_models::{NewRefreshToken, NewUser, RefreshToken, User};
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::repository::{RefreshTokenRepository, RepositoryError, RepositoryResult, UserStore};

struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory credential store
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Table<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let users = self.users.read();
        Ok(users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().rows.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut users = self.users.write();
        if users.rows.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }

        let id = users.allocate_id();
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.rows.insert(id, user.clone());
        Ok(user)
    }
}

/// In-memory refresh token table
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    tokens: RwLock<Table<RefreshToken>>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored row, live or not
    pub fn rows(&self) -> Vec<RefreshToken> {
        self.tokens.read().rows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_locked(table: &mut Table<RefreshToken>, token: NewRefreshToken) -> RefreshToken {
        let id = table.allocate_id();
        let row = RefreshToken {
            id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            created_at: Utc::now(),
            expires_at: token.expires_at,
        };
        table.rows.insert(id, row.clone());
        row
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenStore {
    async fn insert(&self, token: NewRefreshToken) -> RepositoryResult<RefreshToken> {
        let mut tokens = self.tokens.write();
        Ok(Self::insert_locked(&mut tokens, token))
    }

    async fn find_live(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<RefreshToken>> {
        let tokens = self.tokens.read();
        Ok(tokens
            .rows
            .values()
            .filter(|t| t.is_live_at(now))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.tokens.write().rows.remove(&id).is_some())
    }

    async fn delete_for_user(&self, user_id: Id) -> RepositoryResult<u64> {
        let mut tokens = self.tokens.write();
        let before = tokens.rows.len();
        tokens.rows.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.rows.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let mut tokens = self.tokens.write();
        let before = tokens.rows.len();
        tokens.rows.retain(|_, t| t.is_live_at(now));
        Ok((before - tokens.rows.len()) as u64)
    }

    async fn rotate(
        &self,
        old_id: Id,
        replacement: NewRefreshToken,
    ) -> RepositoryResult<Option<RefreshToken>> {
        let mut tokens = self.tokens.write();
        if tokens.rows.remove(&old_id).is_none() {
            return Ok(None);
        }
        Ok(Some(Self::insert_locked(&mut tokens, replacement)))
    }
}
