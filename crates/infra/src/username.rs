//! Generated usernames of the form `user_` + 8 lowercase hex digits.

use roster_core::Username;

use crate::error::ServiceError;
use crate::store::IdentityStore;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Source of the 32-bit values rendered into candidate usernames.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> u32;
}

/// Thread-local CSPRNG tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&self) -> u32 {
        rand::random::<u32>()
    }
}

/// Render a token as a username candidate.
pub fn candidate(token: u32) -> String {
    format!("user_{token:08x}")
}

/// Draws candidates until one is unused in the store, up to `max_attempts`.
pub struct UsernameGenerator {
    tokens: Box<dyn TokenSource>,
    max_attempts: u32,
}

impl UsernameGenerator {
    pub fn new(tokens: impl TokenSource + 'static, max_attempts: u32) -> Self {
        Self {
            tokens: Box::new(tokens),
            max_attempts,
        }
    }

    /// Find a username nobody holds yet.
    ///
    /// The check is advisory: a concurrent insert can still take the name
    /// before ours lands, which the store reports as a conflict.
    pub async fn generate_unique<S>(&self, store: &S) -> Result<Username, ServiceError>
    where
        S: IdentityStore + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let username = Username::parse(&candidate(self.tokens.next_token()))?;
            if store.find_user_by_username(&username).await?.is_none() {
                tracing::debug!(attempt, username = %username, "generated username");
                return Ok(username);
            }
        }

        tracing::warn!(attempts = self.max_attempts, "username generation exhausted");
        Err(ServiceError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for UsernameGenerator {
    fn default() -> Self {
        Self::new(RandomTokens, DEFAULT_MAX_ATTEMPTS)
    }
}

impl core::fmt::Debug for UsernameGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UsernameGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
