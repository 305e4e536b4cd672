// In-memory implementation of ChallengeStore.
//
// Challenges are short-lived and losing them on restart only forces a
// resend, so a process-local map is the production default here, not just
// a test double.

use crate::core::verification::{Challenge, ChallengeKey, ChallengeStore, VerificationError};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryChallengeStore {
    challenges: DashMap<ChallengeKey, Challenge>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self {
            challenges: DashMap::new(),
        }
    }
}

impl Default for InMemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn get(&self, key: &ChallengeKey) -> Result<Option<Challenge>, VerificationError> {
        Ok(self.challenges.get(key).map(|entry| entry.clone()))
    }

    async fn put(
        &self,
        key: ChallengeKey,
        challenge: Challenge,
    ) -> Result<(), VerificationError> {
        // DashMap::insert is an atomic replace, which gives the port its
        // last-writer-wins overwrite.
        self.challenges.insert(key, challenge);
        Ok(())
    }

    async fn remove(&self, key: &ChallengeKey) -> Result<Option<Challenge>, VerificationError> {
        Ok(self.challenges.remove(key).map(|(_, challenge)| challenge))
    }
}
