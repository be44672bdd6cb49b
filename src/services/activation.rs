// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-phase registration.
//!
//! Registration returns a signed activation token that carries the pending
//! account (with the password already hashed). The 4-digit code is mailed
//! to the user; the token only holds an HMAC of it, so holding the token
//! is not enough to activate. Each token gets a small number of guesses,
//! counted in the shared KV store.

use hmac::{Hmac, Mac};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::cache::KvStore;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Codes tried against one activation token before it is dead.
pub const MAX_ACTIVATION_ATTEMPTS: u64 = 5;

/// Account waiting for its activation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActivationClaims {
    user: PendingRegistration,
    /// hex HMAC-SHA256 over "email|code"
    code_digest: String,
    iat: usize,
    exp: usize,
}

/// Freshly issued activation: the token goes to the client, the code to the inbox.
pub struct Activation {
    pub token: String,
    pub code: String,
}

#[derive(Clone)]
pub struct ActivationService {
    secret: Vec<u8>,
    ttl: Duration,
    kv: Arc<dyn KvStore>,
}

impl ActivationService {
    pub fn new(secret: &[u8], ttl: Duration, kv: Arc<dyn KvStore>) -> Self {
        Self {
            secret: secret.to_vec(),
            ttl,
            kv,
        }
    }

    pub fn issue(&self, pending: PendingRegistration) -> Result<Activation, AppError> {
        let code = format!("{:04}", rand::thread_rng().gen_range(1000..10000));
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = ActivationClaims {
            code_digest: self.digest(&pending.email, &code)?,
            user: pending,
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Activation token signing failed: {}", e)))?;

        Ok(Activation { token, code })
    }

    /// Check the token signature and expiry, then the code. Every attempt
    /// counts, so once the budget is spent even the right code is refused.
    pub async fn verify(&self, token: &str, code: &str) -> Result<PendingRegistration, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let key = DecodingKey::from_secret(&self.secret);
        let data = decode::<ActivationClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                AppError::Validation("Activation code has expired".to_string())
            }
            _ => AppError::Validation("Invalid activation token".to_string()),
        })?;

        let attempts = self.kv.incr(&attempts_key(token), self.ttl).await?;
        if attempts > MAX_ACTIVATION_ATTEMPTS {
            tracing::warn!(email = %data.claims.user.email, attempts, "Activation attempts exhausted");
            return Err(AppError::Validation(
                "Too many activation attempts, please register again".to_string(),
            ));
        }

        let expected = self.digest(&data.claims.user.email, code.trim())?;
        let matches: bool = expected
            .as_bytes()
            .ct_eq(data.claims.code_digest.as_bytes())
            .into();

        if !matches {
            return Err(AppError::Validation("Invalid activation code".to_string()));
        }

        Ok(data.claims.user)
    }

    fn digest(&self, email: &str, code: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(email.as_bytes());
        mac.update(b"|");
        mac.update(code.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn attempts_key(token: &str) -> String {
    format!("activation_attempts:{}", hex::encode(Sha256::digest(token.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKv;

    fn service(secret: &[u8]) -> ActivationService {
        ActivationService::new(secret, Duration::from_secs(300), Arc::new(MemoryKv::new()))
    }

    fn pending() -> PendingRegistration {
        PendingRegistration {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let service = service(b"activation_secret");
        let activation = service.issue(pending()).unwrap();

        assert_eq!(activation.code.len(), 4);
        let user = service
            .verify(&activation.token, &activation.code)
            .await
            .unwrap();
        assert_eq!(user, pending());
    }

    #[test]
    fn test_token_does_not_contain_code() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

        let service = service(b"activation_secret");
        let activation = service.issue(pending()).unwrap();

        let payload = activation.token.split('.').nth(1).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert!(!decoded.contains(&format!("\"{}\"", activation.code)));
    }

    fn wrong_code(activation: &Activation) -> &'static str {
        if activation.code == "1000" {
            "1001"
        } else {
            "1000"
        }
    }

    #[tokio::test]
    async fn test_wrong_code_rejected() {
        let service = service(b"activation_secret");
        let activation = service.issue(pending()).unwrap();

        let err = service
            .verify(&activation.token, wrong_code(&activation))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("code")));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let issuer = service(b"secret_a");
        let verifier = service(b"secret_b");
        let activation = issuer.issue(pending()).unwrap();

        assert!(verifier
            .verify(&activation.token, &activation.code)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_right_code_refused_after_attempts_spent() {
        let service = service(b"activation_secret");
        let activation = service.issue(pending()).unwrap();

        for _ in 0..MAX_ACTIVATION_ATTEMPTS {
            let err = service
                .verify(&activation.token, wrong_code(&activation))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(msg) if msg == "Invalid activation code"));
        }

        let err = service
            .verify(&activation.token, &activation.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("Too many")));
    }

    #[tokio::test]
    async fn test_attempts_are_counted_per_token() {
        let service = service(b"activation_secret");
        let spent = service.issue(pending()).unwrap();
        let fresh = service.issue(pending()).unwrap();

        for _ in 0..MAX_ACTIVATION_ATTEMPTS {
            let _ = service.verify(&spent.token, wrong_code(&spent)).await;
        }

        assert!(service.verify(&fresh.token, &fresh.code).await.is_ok());
    }
}
