//! Login tokens awaiting a verification code, at most one per phone number

use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long an unused login token is kept
pub(crate) const LOGIN_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

struct IssuedToken<T> {
    code_hash: String,
    token: T,
    issued_at: Instant,
}

pub(crate) struct LoginTokens<T> {
    entries: DashMap<String, IssuedToken<T>>,
    ttl: Duration,
}

impl<T> LoginTokens<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store `token` for `phone`, replacing any earlier one, and return the
    /// code hash that redeems it.
    pub fn issue(&self, phone: &str, token: T) -> String {
        self.evict_expired();

        let code_hash = Uuid::new_v4().simple().to_string();
        self.entries.insert(
            phone.to_string(),
            IssuedToken {
                code_hash: code_hash.clone(),
                token,
                issued_at: Instant::now(),
            },
        );
        code_hash
    }

    /// Remove and return the token for `phone` if `code_hash` is its current hash
    pub fn take(&self, phone: &str, code_hash: &str) -> Option<T> {
        self.evict_expired();

        self.entries
            .remove_if(phone, |_, issued| issued.code_hash == code_hash)
            .map(|(_, issued)| issued.token)
    }

    /// Put a taken token back so the same code hash can be retried. A token
    /// issued in the meantime wins.
    pub fn restore(&self, phone: &str, code_hash: &str, token: T) {
        self.entries.entry(phone.to_string()).or_insert(IssuedToken {
            code_hash: code_hash.to_string(),
            token,
            issued_at: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, issued| issued.issued_at.elapsed() < ttl);
    }
}
