//! The claim set of a token.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const NOT_BEFORE: &str = "nbf";
const EXPIRATION: &str = "exp";
const ISSUED_AT: &str = "iat";
const SUBJECT: &str = "sub";

/// A JSON object of claims. Registered time claims are seconds since the
/// Unix epoch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a claim, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }
    pub fn get_str(&self, key: &str) -> Option<&str> { self.0.get(key)?.as_str() }
    pub fn get_i64(&self, key: &str) -> Option<i64> { self.0.get(key)?.as_i64() }
    pub fn get_bool(&self, key: &str) -> Option<bool> { self.0.get(key)?.as_bool() }
    pub fn contains(&self, key: &str) -> bool { self.0.contains_key(key) }
    pub fn remove(&mut self, key: &str) -> Option<Value> { self.0.remove(key) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn subject(&self) -> Option<&str> { self.get_str(SUBJECT) }

    pub fn set_subject(&mut self, sub: impl Into<String>) {
        self.set(SUBJECT, sub.into());
    }

    /// `None` when the claim is absent or not a representable date.
    pub fn not_before(&self) -> Option<DateTime<Utc>> { self.time(NOT_BEFORE).at() }
    pub fn expiration(&self) -> Option<DateTime<Utc>> { self.time(EXPIRATION).at() }
    pub fn issued_at(&self) -> Option<DateTime<Utc>> { self.time(ISSUED_AT).at() }

    pub fn set_not_before(&mut self, t: DateTime<Utc>) { self.set(NOT_BEFORE, t.timestamp()); }
    pub fn set_expiration(&mut self, t: DateTime<Utc>) { self.set(EXPIRATION, t.timestamp()); }
    pub fn set_issued_at(&mut self, t: DateTime<Utc>) { self.set(ISSUED_AT, t.timestamp()); }

    /// Whether `now` lies in `[nbf - leeway, exp + leeway]`. A missing claim
    /// leaves its side of the window open; a malformed one closes the window.
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        let leeway = chrono::Duration::from_std(leeway).unwrap_or(chrono::Duration::MAX);
        let not_yet = match self.time(NOT_BEFORE) {
            Bound::Absent => false,
            Bound::Malformed => return false,
            Bound::At(nbf) => nbf.checked_sub_signed(leeway).is_some_and(|earliest| now < earliest),
        };
        let too_late = match self.time(EXPIRATION) {
            Bound::Absent => false,
            Bound::Malformed => return false,
            Bound::At(exp) => exp.checked_add_signed(leeway).is_some_and(|latest| now > latest),
        };
        !not_yet && !too_late
    }

    /// Whether the token has expired at `now`, with no leeway. A malformed
    /// `exp` counts as expired.
    pub(crate) fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.time(EXPIRATION) {
            Bound::Absent => false,
            Bound::Malformed => true,
            Bound::At(exp) => now > exp,
        }
    }

    fn time(&self, key: &str) -> Bound {
        let Some(value) = self.0.get(key) else {
            return Bound::Absent;
        };
        // Numeric dates may legally carry fractions; whole seconds suffice.
        let secs = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64().filter(|f| f.is_finite() && f.abs() < i64::MAX as f64).map(|f| f as i64)
            }),
            _ => None,
        };
        match secs.and_then(|secs| Utc.timestamp_opt(secs, 0).single()) {
            Some(t) => Bound::At(t),
            None => Bound::Malformed,
        }
    }
}

/// One side of the validity window.
enum Bound {
    Absent,
    At(DateTime<Utc>),
    Malformed,
}

impl Bound {
    fn at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn typed_getters() {
        let mut claims = Claims::new();
        claims.set("access", "allowed");
        claims.set("level", 3);
        claims.set("admin", false);
        assert_eq!(claims.get_str("access"), Some("allowed"));
        assert_eq!(claims.get_i64("level"), Some(3));
        assert_eq!(claims.get_bool("admin"), Some(false));
        assert_eq!(claims.get_str("level"), None);
    }

    #[test]
    fn window_includes_leeway_on_both_sides() {
        let mut claims = Claims::new();
        claims.set_not_before(at(1_000));
        claims.set_expiration(at(2_000));
        let leeway = Duration::from_secs(60);
        assert!(claims.is_valid_at(at(940), leeway));
        assert!(!claims.is_valid_at(at(939), leeway));
        assert!(claims.is_valid_at(at(2_060), leeway));
        assert!(!claims.is_valid_at(at(2_061), leeway));
    }

    #[test]
    fn missing_time_claims_do_not_constrain() {
        let claims = Claims::new();
        assert!(claims.is_valid_at(at(0), Duration::ZERO));
        assert!(!claims.is_expired_at(at(i32::MAX as i64)));
    }

    #[test]
    fn string_expiration_is_never_valid() {
        let mut claims = Claims::new();
        claims.set(EXPIRATION, "1000");
        assert_eq!(claims.expiration(), None);
        assert!(!claims.is_valid_at(at(0), Duration::from_secs(60)));
        assert!(claims.is_expired_at(at(0)));
    }

    #[test]
    fn out_of_range_times_are_never_valid() {
        let mut claims = Claims::new();
        claims.set(EXPIRATION, u64::MAX);
        assert!(!claims.is_valid_at(at(0), Duration::ZERO));
        assert!(claims.is_expired_at(at(0)));

        let mut claims = Claims::new();
        claims.set(NOT_BEFORE, u64::MAX);
        assert!(!claims.is_valid_at(at(0), Duration::ZERO));
        assert!(!claims.is_expired_at(at(0)));
    }
}
