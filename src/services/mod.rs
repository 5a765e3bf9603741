//! Services layer: business logic and the collaborator seams the
//! authentication flows compose.

mod auth;
mod challenge;
mod challenge_store;
mod credential_store;
mod email;
pub mod error;
mod session;

pub use auth::AuthService;
pub use challenge::ChallengeIssuer;
pub use challenge_store::{ChallengeStore, InMemoryChallengeStore};
pub use credential_store::{CredentialStore, InMemoryCredentialStore};
pub use email::{MockNotifier, Notifier, SmtpNotifier};
pub use error::ServiceError;
pub use session::{SessionClaims, SessionService};
