// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Customer,
  Admin,
  SuperAdmin,
}

impl Role {
  pub fn is_admin(self) -> bool {
    matches!(self, Role::Admin | Role::SuperAdmin)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: Option<String>,
  pub email: String,
  pub phone: Option<String>,
  pub image: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn new(name: Option<String>, email: String, password_hash: String, role: Role) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name,
      email,
      phone: None,
      image: None,
      password_hash,
      role,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn summary(&self) -> CustomerSummary {
    CustomerSummary {
      id: self.id,
      name: self.name.clone(),
      email: self.email.clone(),
    }
  }
}

/// What admin views show about the customer behind an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
  pub id: Uuid,
  pub name: Option<String>,
  pub email: String,
}

/// A bearer session issued at sign-in.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
  pub token: String,
  pub user_id: Uuid,
  pub expires_at: DateTime<Utc>,
}
