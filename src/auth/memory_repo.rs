use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::auth::{
    repo::{RepoError, UserStore},
    repo_types::{NewUser, User},
};

/// In-process [`UserStore`] used by tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record directly, bypassing registration.
    pub fn insert(&self, user: User) {
        self.users
            .lock()
            .unwrap()
            .insert(user.email.clone(), user);
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().get(email).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser<'_>) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(user.email) {
            return Err(RepoError::Duplicate);
        }
        let row = User {
            email: user.email.to_string(),
            password_hash: user.password_hash.to_string(),
            activation_code: user.activation_code.to_string(),
            code_expires_at: user.code_expires_at,
            is_active: false,
        };
        users.insert(row.email.clone(), row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.get(email))
    }

    async fn mark_active(&self, email: &str) -> Result<(), RepoError> {
        if let Some(user) = self.users.lock().unwrap().get_mut(email) {
            user.is_active = true;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser<'_> {
        NewUser {
            email,
            password_hash: "hash",
            activation_code: "0420",
            code_expires_at: 100.0,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@example.com")).await.unwrap();
        let err = store.create(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate));
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@example.com")).await.unwrap();
        assert!(store.find_by_email("A@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_active_is_idempotent() {
        let store = InMemoryUserStore::new();
        let created = store.create(new_user("a@example.com")).await.unwrap();
        assert!(!created.is_active);
        store.mark_active("a@example.com").await.unwrap();
        store.mark_active("a@example.com").await.unwrap();
        assert!(store.get("a@example.com").unwrap().is_active);
    }
}
