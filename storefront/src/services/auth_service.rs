// storefront/src/services/auth_service.rs

//! Password hashing and bearer session issuance.

use crate::errors::AppError;
use crate::models::{Role, Session, User};
use crate::store::Store;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use rand_core::RngCore;
use tracing::{debug, error, instrument};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a plain-text password with Argon2 and a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Le mot de passe est requis".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is
/// unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if hashed_password_str.is_empty() || provided_password.is_empty() {
    return Ok(false);
  }
  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;
  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other) => {
      error!(error = %other, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other)))
    }
  }
}

/// 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

#[instrument(name = "auth_service::issue_session", skip(store, user), fields(user_id = %user.id), err(Display))]
pub async fn issue_session(store: &dyn Store, user: &User, ttl_hours: i64) -> Result<Session, AppError> {
  let session = Session {
    token: generate_session_token(),
    user_id: user.id,
    expires_at: Utc::now() + Duration::hours(ttl_hours),
  };
  store.insert_session(&session).await?;
  debug!("Session issued.");
  Ok(session)
}

/// Resolves a bearer token to its live user.
pub async fn authenticate_token(store: &dyn Store, token: &str) -> Result<Option<User>, AppError> {
  if token.len() != 64 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
    return Ok(None);
  }
  store.find_session_user(token, Utc::now()).await
}

/// Creates the `SUPER_ADMIN` account once. Returns `false` when the email is
/// already taken, whatever its role.
#[instrument(name = "auth_service::seed_admin", skip(store, password), err(Display))]
pub async fn seed_admin(store: &dyn Store, email: &str, password: &str) -> Result<bool, AppError> {
  let email = email.trim().to_lowercase();
  if store.find_user_by_email(&email).await?.is_some() {
    debug!("Admin account already present.");
    return Ok(false);
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Config(format!(
      "SEED_ADMIN_PASSWORD must be at least {} characters",
      MIN_PASSWORD_LEN
    )));
  }
  let user = User::new(Some("Admin".to_string()), email, hash_password(password)?, Role::SuperAdmin);
  store.insert_user(&user).await?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("rubans-roses").unwrap();
    assert!(verify_password(&hash, "rubans-roses").unwrap());
    assert!(!verify_password(&hash, "rubans-bleus").unwrap());
  }

  #[test]
  fn tokens_are_64_hex_chars_and_distinct() {
    let a = generate_session_token();
    let b = generate_session_token();
    assert_eq!(a.len(), 64);
    assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[tokio::test]
  async fn seed_admin_runs_once() {
    let store = crate::store::MemoryStore::new();
    assert!(seed_admin(&store, "Admin@Eva.test", "motdepasse-admin").await.unwrap());
    assert!(!seed_admin(&store, "admin@eva.test", "motdepasse-admin").await.unwrap());
    let admin = store.find_user_by_email("admin@eva.test").await.unwrap().unwrap();
    assert_eq!(admin.role, Role::SuperAdmin);
  }
}
