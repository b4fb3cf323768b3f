//! Pseudonyms for the session: one per identity role plus the anonymous pair
//! the guesser chooses between.

use crate::store::{SharedStore, StoreError, AI_USERNAME_KEY, ANON_USERNAMES_KEY, HUMAN_USERNAME_KEY};
use crate::types::{Anon, IdentityRole};
use rand::Rng;
use std::sync::Arc;

const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LENGTH: usize = 4;

/// `prefix` followed by four random uppercase letters
pub fn random_username(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_CHARS[rng.random_range(0..SUFFIX_CHARS.len())] as char)
        .collect();
    format!("{}{}", prefix, suffix)
}

/// Two usernames that are guaranteed to differ
pub fn random_anon_pair(prefix: &str) -> [Anon; 2] {
    let first = random_username(prefix);
    let second = loop {
        let candidate = random_username(prefix);
        if candidate != first {
            break candidate;
        }
    };
    [first, second]
}

fn key_for(role: IdentityRole) -> &'static str {
    match role {
        IdentityRole::HumanOperator => HUMAN_USERNAME_KEY,
        IdentityRole::Ai => AI_USERNAME_KEY,
    }
}

#[derive(Clone)]
pub struct UsernameAssigner {
    store: Arc<SharedStore>,
    prefix: String,
}

impl UsernameAssigner {
    pub fn new(store: Arc<SharedStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Cached identifier for `role`, generated on first use
    pub async fn assign(&self, role: IdentityRole) -> Result<String, StoreError> {
        let key = key_for(role);
        if let Some(existing) = self.store.get_item(key).await {
            return Ok(existing);
        }

        let username = random_username(&self.prefix);
        self.store.set_item(key, username.clone()).await?;
        tracing::info!("Assigned username {} to {:?}", username, role);
        Ok(username)
    }

    /// The session's anonymous pair, generated on first use
    pub async fn anon_pool(&self) -> Result<[Anon; 2], StoreError> {
        if let Some(raw) = self.store.get_item(ANON_USERNAMES_KEY).await {
            match serde_json::from_str::<[Anon; 2]>(&raw) {
                Ok(pair) if pair[0] != pair[1] => return Ok(pair),
                _ => tracing::warn!("Stored anon pool is invalid, regenerating"),
            }
        }
        self.regenerate_anon_pool().await
    }

    /// Replace the anonymous pair. Only reset should call this.
    pub async fn regenerate_anon_pool(&self) -> Result<[Anon; 2], StoreError> {
        let pair = random_anon_pair(&self.prefix);
        self.store
            .set_item(ANON_USERNAMES_KEY, serde_json::to_string(&pair)?)
            .await?;
        tracing::info!("New anon pool: {} / {}", pair[0], pair[1]);
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigner() -> UsernameAssigner {
        UsernameAssigner::new(Arc::new(SharedStore::in_memory()), "user")
    }

    #[test]
    fn test_random_username_format() {
        for _ in 0..50 {
            let name = random_username("user");
            assert_eq!(name.len(), 8);
            assert!(name.starts_with("user"));
            assert!(name[4..].chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_anon_pair_is_distinct() {
        for _ in 0..200 {
            let [a, b] = random_anon_pair("user");
            assert_ne!(a, b);
        }
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let assigner = assigner();
        let first = assigner.assign(IdentityRole::HumanOperator).await.unwrap();
        let second = assigner.assign(IdentityRole::HumanOperator).await.unwrap();
        assert_eq!(first, second);

        let ai = assigner.assign(IdentityRole::Ai).await.unwrap();
        assert_eq!(ai, assigner.assign(IdentityRole::Ai).await.unwrap());
    }

    #[tokio::test]
    async fn test_anon_pool_is_cached_until_regenerated() {
        let assigner = assigner();
        let pool = assigner.anon_pool().await.unwrap();
        assert_ne!(pool[0], pool[1]);
        assert_eq!(pool, assigner.anon_pool().await.unwrap());

        let fresh = assigner.regenerate_anon_pool().await.unwrap();
        assert_ne!(fresh[0], fresh[1]);
        assert_eq!(fresh, assigner.anon_pool().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_stored_pool_is_replaced() {
        let store = Arc::new(SharedStore::in_memory());
        store
            .set_item(ANON_USERNAMES_KEY, r#"["userAAAA","userAAAA"]"#.to_string())
            .await
            .unwrap();
        let assigner = UsernameAssigner::new(store, "user");

        let pool = assigner.anon_pool().await.unwrap();
        assert_ne!(pool[0], pool[1]);
    }
}
