use rand::Rng;
use std::sync::Arc;

use crate::models::{Challenge, ChallengeKind};
use crate::services::{ChallengeStore, Notifier, ServiceError};

const CODE_LENGTH: usize = 6;

/// Generates, stores, and dispatches one-time passcodes.
#[derive(Clone)]
pub struct ChallengeIssuer {
    store: Arc<dyn ChallengeStore>,
    notifier: Arc<dyn Notifier>,
}

impl ChallengeIssuer {
    pub fn new(store: Arc<dyn ChallengeStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Issue a fresh challenge for the identity, superseding any prior
    /// one, and dispatch the code.
    ///
    /// If dispatch fails the stored challenge stays in place; re-issuing
    /// is the recovery path, not a compensating delete.
    pub async fn issue(&self, email: &str, kind: ChallengeKind) -> Result<String, ServiceError> {
        let code = generate_code(CODE_LENGTH);
        let challenge = Challenge::new(code.clone(), kind);

        self.store.put(email, challenge).await?;

        self.notifier.send_code(email, &code, kind).await?;

        tracing::info!(email = %email, kind = %kind.as_str(), "Challenge issued");

        Ok(code)
    }
}

/// Generate a uniformly random numeric code. Collisions against prior
/// codes are not checked.
fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| rng.gen_range(0..10).to_string())
        .collect()
}
