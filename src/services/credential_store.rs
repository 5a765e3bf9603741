use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::models::Account;
use crate::services::ServiceError;

/// Durable mapping from identity to account credentials.
///
/// The physical storage engine is a pluggable collaborator; the contract
/// only requires per-identity atomicity of each write.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ServiceError>;

    /// Insert a new account. Fails with `EmailAlreadyRegistered` if the
    /// identity is already present; the check and insert are atomic.
    async fn create(&self, account: Account) -> Result<Account, ServiceError>;

    async fn set_verified(&self, email: &str) -> Result<(), ServiceError>;

    async fn set_password_hash(&self, email: &str, hash: String) -> Result<(), ServiceError>;
}

/// Process-local credential store backed by a sharded concurrent map.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<String, Account>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ServiceError> {
        Ok(self.accounts.get(email).map(|entry| entry.value().clone()))
    }

    async fn create(&self, account: Account) -> Result<Account, ServiceError> {
        match self.accounts.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(ServiceError::EmailAlreadyRegistered),
            Entry::Vacant(vacant) => {
                vacant.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn set_verified(&self, email: &str) -> Result<(), ServiceError> {
        let mut entry = self
            .accounts
            .get_mut(email)
            .ok_or(ServiceError::AccountNotFound)?;
        entry.verified = true;
        Ok(())
    }

    async fn set_password_hash(&self, email: &str, hash: String) -> Result<(), ServiceError> {
        let mut entry = self
            .accounts
            .get_mut(email)
            .ok_or(ServiceError::AccountNotFound)?;
        entry.password_hash = hash;
        Ok(())
    }
}
