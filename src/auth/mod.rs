//! Authentication: backend access tokens and the bootstrap admin key.

mod extractor;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::models::AccessClaims;

pub use extractor::{AuthError, OptionalSession, SessionAuth};

/// Audience the backend puts on tokens of signed-in users.
pub const TOKEN_AUDIENCE: &str = "authenticated";

/// Wrapper type for the bootstrap admin key.
/// Uses `SecretString` to prevent accidental logging and zeroize on drop.
///
/// # Security features
/// - `Debug` prints `[REDACTED]` instead of the actual value
/// - Memory is zeroed when dropped (via `zeroize`)
/// - Explicit `.expose_secret()` required to access the value
#[derive(Clone)]
pub struct AdminKey(Option<SecretString>);

impl AdminKey {
    /// Create a new AdminKey from an optional string.
    pub fn new(key: Option<String>) -> Self {
        Self(key.map(SecretString::from))
    }

    /// Compare the provided key with the stored admin key in constant time.
    ///
    /// Unequal lengths compare false without an early exit.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AdminKey([REDACTED])"),
            None => write!(f, "AdminKey(None)"),
        }
    }
}

/// HS256 secret the backend signs access tokens with.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SecretString,
}

impl TokenVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify signature, expiry and audience, returning the claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid access token: {}", e))
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenVerifier([REDACTED])")
    }
}
