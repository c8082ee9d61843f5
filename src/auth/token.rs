use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenPair;
use crate::config::Config;
use crate::error::AppError;
use crate::models::User;

/// The two token classes. They differ only in how long they live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token, the user's id.
    pub user_id: String,
    pub email: String,
    pub username: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Random per-token id, so two tokens minted in the same second differ.
    pub jti: String,
}

/// Issues and verifies HS256-signed session tokens.
///
/// The signing secret is loaded once when the service is built; a missing
/// secret is a startup failure, never a per-request one.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::InternalServerError(
                "token signing secret is empty".into(),
            ));
        }

        // Expiry is checked by hand against an explicit clock, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.jwt_secret,
            Duration::seconds(config.access_token_ttl_secs),
            Duration::seconds(config.refresh_token_ttl_secs),
        )
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Generates a token of the given class for `user`, expiring `ttl(kind)` from now.
    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, AppError> {
        self.issue_at(user, kind, Utc::now())
    }

    pub fn issue_at(
        &self,
        user: &User,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            user_id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            exp: (now + self.ttl(kind)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to sign token: {}", e)))
    }

    /// Issues a fresh access + refresh pair.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// Checks signature, algorithm and expiry, returning the claims.
    ///
    /// A token is valid while `now < exp`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)?;

        if now.timestamp() >= claims.exp {
            return Err(AppError::Unauthorized("Invalid token: ExpiredSignature".into()));
        }
        Ok(claims)
    }

    /// Verifies a token and resolves the caller's identity.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let claims = self.decode_at(token, now)?;
        Uuid::parse_str(&claims.user_id)
            .map_err(|_| AppError::Unauthorized("Invalid token: malformed user_id".into()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    match header.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.is_empty()
                && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => Err(AppError::Unauthorized(
            "Invalid Authorization header format".into(),
        )),
    }
}
