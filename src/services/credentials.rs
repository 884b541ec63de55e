//! Password hashing and bearer token minting.
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use crate::errors::{AppError, AppResult};

const TOKEN_LEN: usize = 48;

/// bcrypt is deliberately slow, so it runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(AppError::internal("Password hashing task failed"))?
        .map_err(AppError::internal("Password hashing failed"))
}

pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(AppError::internal("Password verification task failed"))?
        .map_err(AppError::internal("Password verification failed"))
}

/// 48 alphanumeric characters drawn from the OS random source.
pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_only_original_password() {
        let hash = hash_password("hunter22", 4).await.unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash).await.unwrap());
        assert!(!verify_password("hunter23", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash_password("same-password", 4).await.unwrap();
        let b = hash_password("same-password", 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
