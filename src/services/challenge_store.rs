use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::Challenge;
use crate::services::ServiceError;

/// Ephemeral store holding at most one challenge per identity.
///
/// `put` unconditionally overwrites; a new issuance silently supersedes
/// any prior challenge for the identity, even one of a different kind.
/// The store is not partitioned by kind - callers check `kind` after
/// `get`. Implementations must make each per-identity mutation atomic so
/// a supersede cannot interleave with a flag update.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn put(&self, email: &str, challenge: Challenge) -> Result<(), ServiceError>;

    async fn get(&self, email: &str) -> Result<Option<Challenge>, ServiceError>;

    async fn delete(&self, email: &str) -> Result<(), ServiceError>;

    /// Set the verified flag on the identity's current challenge, in
    /// place. Returns false if no challenge is stored.
    async fn mark_verified(&self, email: &str) -> Result<bool, ServiceError>;
}

/// Process-local challenge store. DashMap shard locks give the
/// per-identity atomicity the contract asks for.
#[derive(Default)]
pub struct InMemoryChallengeStore {
    challenges: DashMap<String, Challenge>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, email: &str, challenge: Challenge) -> Result<(), ServiceError> {
        self.challenges.insert(email.to_string(), challenge);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<Challenge>, ServiceError> {
        Ok(self.challenges.get(email).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, email: &str) -> Result<(), ServiceError> {
        self.challenges.remove(email);
        Ok(())
    }

    async fn mark_verified(&self, email: &str) -> Result<bool, ServiceError> {
        match self.challenges.get_mut(email) {
            Some(mut entry) => {
                entry.verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
