//! Cache of decoded and verified tokens, keyed by the raw token string.

use chrono::Utc;
use dashmap::DashMap;

use super::{JwtError, Key, Token};

#[derive(Clone)]
struct Entry {
    token: Token,
    // Fingerprint of the key that verified the token; `None` if only decoded.
    verified_by: Option<[u8; 32]>,
}

/// Shared cache that skips repeated decoding and signature checks for tokens
/// seen before.
///
/// An entry lives at most as long as its token: once `exp` has passed the
/// entry is dropped on the next lookup or [`cleanup`](Self::cleanup). Tokens
/// without `exp` stay until evicted by `cleanup` under capacity pressure, or
/// [`clear`](Self::clear).
pub struct TokenCache {
    entries: DashMap<String, Entry>,
    capacity: usize,
}

impl TokenCache {
    /// Default upper bound on cached tokens.
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: DashMap::new(), capacity }
    }

    /// Decodes `raw`, or returns the cached token.
    pub fn decode(&self, raw: &str) -> Result<Token, JwtError> {
        if let Some(token) = self.lookup(raw, |_| true) {
            return Ok(token);
        }
        let token = Token::decode(raw)?;
        self.insert(raw, &token, None);
        Ok(token)
    }

    /// Verifies `raw` against `key`, or returns the cached token if the same
    /// key verified it before.
    pub fn verify(&self, raw: &str, key: &Key) -> Result<Token, JwtError> {
        let fingerprint = key.fingerprint();
        if let Some(token) = self.lookup(raw, |e| e.verified_by == Some(fingerprint)) {
            return Ok(token);
        }
        let token = Token::verify(raw, key)?;
        self.insert(raw, &token, Some(fingerprint));
        Ok(token)
    }

    /// Removes every expired entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.token.claims().is_expired_at(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn clear(&self) { self.entries.clear() }

    fn lookup(&self, raw: &str, usable: impl Fn(&Entry) -> bool) -> Option<Token> {
        let entry = self.entries.get(raw)?;
        if entry.token.claims().is_expired_at(Utc::now()) {
            // The read guard must be released before removing.
            drop(entry);
            self.entries.remove(raw);
            return None;
        }
        usable(&entry).then(|| entry.token.clone())
    }

    fn insert(&self, raw: &str, token: &Token, verified_by: Option<[u8; 32]>) {
        if token.claims().is_expired_at(Utc::now()) {
            return;
        }
        if self.entries.len() >= self.capacity && !self.entries.contains_key(raw) {
            self.cleanup();
            if self.entries.len() >= self.capacity {
                return;
            }
        }
        self.entries
            .entry(raw.to_owned())
            .and_modify(|e| {
                // Never downgrade a verified entry to decoded-only.
                if verified_by.is_some() {
                    e.verified_by = verified_by;
                }
            })
            .or_insert_with(|| Entry { token: token.clone(), verified_by });
    }
}

impl Default for TokenCache {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{Algorithm, Claims};
    use chrono::Duration;

    fn token(key: &Key, exp_in: Option<Duration>) -> Token {
        let mut claims = Claims::new();
        claims.set("access", "allowed");
        if let Some(d) = exp_in {
            claims.set_expiration(Utc::now() + d);
        }
        Token::encode(claims, key, Algorithm::HS512).unwrap()
    }

    #[test]
    fn verified_entry_is_reused_for_same_key_only() {
        let cache = TokenCache::new();
        let key = Key::from("secret");
        let t = token(&key, Some(Duration::minutes(5)));

        cache.verify(t.as_str(), &key).unwrap();
        assert_eq!(cache.len(), 1);
        cache.verify(t.as_str(), &key).unwrap();
        assert_eq!(cache.len(), 1);

        let err = cache.verify(t.as_str(), &Key::from("other")).unwrap_err();
        assert!(matches!(err, JwtError::InvalidSignature));
    }

    #[test]
    fn decoded_entry_does_not_count_as_verified() {
        let cache = TokenCache::new();
        let t = token(&Key::from("unknown"), None);
        cache.decode(t.as_str()).unwrap();
        assert!(cache.verify(t.as_str(), &Key::from("secret")).is_err());
    }

    #[test]
    fn expired_tokens_are_never_cached() {
        let cache = TokenCache::new();
        let key = Key::from("secret");
        let t = token(&key, Some(Duration::seconds(-10)));
        cache.verify(t.as_str(), &key).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_bounds_the_cache() {
        let cache = TokenCache::with_capacity(2);
        let key = Key::from("secret");
        for i in 0..4 {
            let mut claims = Claims::new();
            claims.set("n", i);
            let t = Token::encode(claims, &key, Algorithm::HS256).unwrap();
            assert!(cache.verify(t.as_str(), &key).is_ok());
        }
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_verification_shares_entries() {
        let cache = std::sync::Arc::new(TokenCache::new());
        let key = Key::from("secret");
        let shared = token(&key, Some(Duration::minutes(5)));
        let distinct: Vec<Token> = (0..8)
            .map(|i| {
                let mut claims = Claims::new();
                claims.set("n", i);
                Token::encode(claims, &key, Algorithm::HS256).unwrap()
            })
            .collect();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let cache = std::sync::Arc::clone(&cache);
            let key = key.clone();
            let raw = if i % 2 == 0 {
                shared.as_str().to_owned()
            } else {
                distinct[i % distinct.len()].as_str().to_owned()
            };
            tasks.spawn(async move { cache.verify(&raw, &key).map(|t| t.as_str() == raw) });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().unwrap());
        }
        // The odd indices hit the four odd-numbered distinct tokens.
        assert_eq!(cache.len(), 1 + 4);
    }
}
