// storefront/src/models/address.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_COUNTRY: &str = "France";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub label: Option<String>,
  pub first_name: String,
  pub last_name: String,
  pub address1: String,
  pub address2: Option<String>,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub phone: Option<String>,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/addresses`. Required fields are checked by
/// `services::address_book::validate_new_address` so the error names the
/// missing field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
  pub label: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub address1: Option<String>,
  pub address2: Option<String>,
  pub city: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
  pub phone: Option<String>,
  #[serde(default)]
  pub is_default: bool,
}

/// Body of `PUT /api/addresses/{id}`; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
  pub label: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub address1: Option<String>,
  pub address2: Option<String>,
  pub city: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
  pub phone: Option<String>,
  pub is_default: Option<bool>,
}
