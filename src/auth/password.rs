use crate::error::AppError;
use bcrypt::{hash, verify};

/// One-way password hashing with a configurable bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordCodec {
    cost: u32,
}

impl PasswordCodec {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        verify(password, hashed_password)
            .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
    }

    /// Hashes on the blocking pool so a request thread is never held by bcrypt.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.hash(&password)).await?
    }

    pub async fn verify_blocking(
        &self,
        password: String,
        hashed_password: String,
    ) -> Result<bool, AppError> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.verify(&password, &hashed_password)).await?
    }
}

impl Default for PasswordCodec {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
