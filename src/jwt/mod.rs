//! JSON Web Tokens (RFC 7519), HMAC-signed compact form only.
//!
//! ```rust
//! use strata::jwt::{Algorithm, Claims, Key, Token};
//!
//! let key = Key::from("secret");
//! let mut claims = Claims::new();
//! claims.set("access", "allowed");
//!
//! let token = Token::encode(claims.clone(), &key, Algorithm::HS512).unwrap();
//! let verified = Token::verify(token.as_str(), &key).unwrap();
//! assert_eq!(verified.claims(), &claims);
//! ```

mod cache;
mod claims;

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::request::Request;

pub use cache::TokenCache;
pub use claims::Claims;

/// Failures while reading, decoding, or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("request contains no authorization header")]
    MissingHeader,
    #[error("authorization header contains no bearer token")]
    NotBearer,
    #[error("malformed token: expected three dot-separated parts")]
    Malformed,
    #[error("malformed token: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed token: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported signing algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("cannot verify the signature")]
    InvalidSignature,
}

/// HMAC signing algorithms.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    fn sign(self, key: &Key, data: &[u8]) -> Vec<u8> {
        match self {
            Self::HS256 => mac::<Hmac<Sha256>>(key, data).finalize().into_bytes().to_vec(),
            Self::HS384 => mac::<Hmac<Sha384>>(key, data).finalize().into_bytes().to_vec(),
            Self::HS512 => mac::<Hmac<Sha512>>(key, data).finalize().into_bytes().to_vec(),
        }
    }

    fn verify(self, key: &Key, data: &[u8], signature: &[u8]) -> Result<(), JwtError> {
        let checked = match self {
            Self::HS256 => mac::<Hmac<Sha256>>(key, data).verify_slice(signature),
            Self::HS384 => mac::<Hmac<Sha384>>(key, data).verify_slice(signature),
            Self::HS512 => mac::<Hmac<Sha512>>(key, data).verify_slice(signature),
        };
        checked.map_err(|_| JwtError::InvalidSignature)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mac<M: Mac + KeyInit>(key: &Key, data: &[u8]) -> M {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut m = <M as KeyInit>::new_from_slice(&key.0)
        .unwrap_or_else(|_| unreachable!("hmac accepts keys of any length"));
    m.update(data);
    m
}

/// A shared HMAC secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// SHA-256 of the secret. Lets the cache remember which key verified a
    /// token without holding a second copy of the secret.
    pub(crate) fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.0).into()
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self { Self(s.as_bytes().to_vec()) }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self { Self(b.to_vec()) }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self { Self(b) }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// A decoded token together with its compact serialization.
#[derive(Clone, Debug)]
pub struct Token {
    algorithm: Algorithm,
    claims: Claims,
    raw: String,
}

impl Token {
    /// Signs `claims` with `key`.
    pub fn encode(claims: Claims, key: &Key, algorithm: Algorithm) -> Result<Self, JwtError> {
        let header = Header { alg: algorithm.as_str().to_owned(), typ: Some("JWT".to_owned()) };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
        );
        let signature = URL_SAFE_NO_PAD.encode(algorithm.sign(key, signing_input.as_bytes()));
        Ok(Self { algorithm, claims, raw: format!("{signing_input}.{signature}") })
    }

    /// Decodes `raw` without checking the signature.
    pub fn decode(raw: &str) -> Result<Self, JwtError> {
        Ok(Self::split(raw)?.0)
    }

    /// Decodes `raw` and checks its signature against `key`.
    pub fn verify(raw: &str, key: &Key) -> Result<Self, JwtError> {
        let (token, signing_input, signature) = Self::split(raw)?;
        token.algorithm.verify(key, signing_input.as_bytes(), &signature)?;
        Ok(token)
    }

    fn split(raw: &str) -> Result<(Self, &str, Vec<u8>), JwtError> {
        let (signing_input, signature) = raw.rsplit_once('.').ok_or(JwtError::Malformed)?;
        let (header, claims) = signing_input.split_once('.').ok_or(JwtError::Malformed)?;
        if claims.contains('.') {
            return Err(JwtError::Malformed);
        }
        let header: Header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header)?)?;
        let algorithm = match header.alg.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(JwtError::UnsupportedAlgorithm(other.to_owned())),
        };
        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims)?)?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;
        let token = Self { algorithm, claims, raw: raw.to_owned() };
        Ok((token, signing_input, signature))
    }

    pub fn algorithm(&self) -> Algorithm { self.algorithm }
    pub fn claims(&self) -> &Claims { &self.claims }
    pub fn as_str(&self) -> &str { &self.raw }

    /// Temporal validity right now. See [`Claims::is_valid_at`].
    pub fn is_valid(&self, leeway: Duration) -> bool {
        self.is_valid_at(Utc::now(), leeway)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.claims.is_valid_at(now, leeway)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extracts the raw bearer credential from the `Authorization` header.
pub fn bearer_token(req: &Request) -> Result<&str, JwtError> {
    let value = req.header("authorization").ok_or(JwtError::MissingHeader)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(JwtError::NotBearer)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(JwtError::NotBearer);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{AUTHORIZATION, HeaderValue};

    fn claims() -> Claims {
        let mut claims = Claims::new();
        claims.set("access", "allowed");
        claims
    }

    #[test]
    fn verify_with_signing_key() {
        let key = Key::from("secret");
        for alg in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let token = Token::encode(claims(), &key, alg).unwrap();
            let verified = Token::verify(token.as_str(), &key).unwrap();
            assert_eq!(verified.algorithm(), alg);
            assert_eq!(verified.claims(), &claims());
        }
    }

    #[test]
    fn other_key_fails_verification_but_decodes() {
        let token = Token::encode(claims(), &Key::from("unknown"), Algorithm::HS512).unwrap();
        let err = Token::verify(token.as_str(), &Key::from("secret")).unwrap_err();
        assert!(matches!(err, JwtError::InvalidSignature));
        assert_eq!(err.to_string(), "cannot verify the signature");
        assert_eq!(Token::decode(token.as_str()).unwrap().claims(), &claims());
    }

    #[test]
    fn tampered_claims_fail_verification() {
        let key = Key::from("secret");
        let token = Token::encode(claims(), &key, Algorithm::HS256).unwrap();
        let mut parts: Vec<&str> = token.as_str().split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"access":"admin"}"#);
        parts[1] = &forged;
        let err = Token::verify(&parts.join("."), &key).unwrap_err();
        assert!(matches!(err, JwtError::InvalidSignature));
    }

    #[test]
    fn rejects_unsigned_and_malformed_tokens() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(b"{}");
        let err = Token::decode(&format!("{header}.{body}.")).unwrap_err();
        assert!(matches!(err, JwtError::UnsupportedAlgorithm(alg) if alg == "none"));
        assert!(matches!(Token::decode("abc"), Err(JwtError::Malformed)));
        assert!(matches!(Token::decode("a.b.c.d"), Err(JwtError::Malformed)));
        assert!(matches!(Token::decode("!!.b.c"), Err(JwtError::Base64(_))));
    }

    #[test]
    fn bearer_extraction() {
        let req = Request::new(http::Method::GET, "/");
        assert!(matches!(bearer_token(&req), Err(JwtError::MissingHeader)));

        let req = Request::new(http::Method::GET, "/")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(matches!(bearer_token(&req), Err(JwtError::NotBearer)));

        let req = Request::new(http::Method::GET, "/")
            .with_header(AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn key_debug_is_redacted() {
        assert_eq!(format!("{:?}", Key::from("secret")), "Key([REDACTED])");
    }
}
