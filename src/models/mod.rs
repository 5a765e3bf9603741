pub mod account;
pub mod challenge;

pub use account::{Account, Role};
pub use challenge::{Challenge, ChallengeKind, CHALLENGE_TTL_MINUTES};
