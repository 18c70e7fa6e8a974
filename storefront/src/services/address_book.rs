// storefront/src/services/address_book.rs

//! Rules of the per-customer address book. Stores call these while holding
//! their transaction or lock so the single-default invariant holds under
//! concurrent requests.

use crate::errors::{AppError, Result};
use crate::models::address::DEFAULT_COUNTRY;
use crate::models::{Address, AddressPatch, NewAddress};
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn required(value: Option<String>, field: &str) -> Result<String> {
  match value.map(|v| v.trim().to_string()) {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(AppError::Validation(format!("Le champ {} est requis", field))),
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validates a create request and builds the row. `is_default` carries the
/// caller's request; the store settles the final value with
/// [`should_be_default`].
pub fn validate_new_address(user_id: Uuid, input: NewAddress, now: DateTime<Utc>) -> Result<Address> {
  Ok(Address {
    id: Uuid::new_v4(),
    user_id,
    first_name: required(input.first_name, "firstName")?,
    last_name: required(input.last_name, "lastName")?,
    address1: required(input.address1, "address1")?,
    city: required(input.city, "city")?,
    postal_code: required(input.postal_code, "postalCode")?,
    label: non_blank(input.label),
    address2: non_blank(input.address2),
    country: non_blank(input.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    phone: non_blank(input.phone),
    is_default: input.is_default,
    created_at: now,
    updated_at: now,
  })
}

/// A customer's first address is always the default.
pub fn should_be_default(requested: bool, existing_count: usize) -> bool {
  requested || existing_count == 0
}

/// Applies `patch` in place. Returns `true` when the address becomes the
/// default and its siblings must be cleared. Clearing the flag on the current
/// default is ignored: the customer keeps exactly one default.
pub fn apply_patch(address: &mut Address, patch: &AddressPatch, now: DateTime<Utc>) -> Result<bool> {
  let set_required = |slot: &mut String, value: &Option<String>, field: &str| -> Result<()> {
    if let Some(v) = value {
      *slot = required(Some(v.clone()), field)?;
    }
    Ok(())
  };
  set_required(&mut address.first_name, &patch.first_name, "firstName")?;
  set_required(&mut address.last_name, &patch.last_name, "lastName")?;
  set_required(&mut address.address1, &patch.address1, "address1")?;
  set_required(&mut address.city, &patch.city, "city")?;
  set_required(&mut address.postal_code, &patch.postal_code, "postalCode")?;

  if let Some(label) = &patch.label {
    address.label = non_blank(Some(label.clone()));
  }
  if let Some(address2) = &patch.address2 {
    address.address2 = non_blank(Some(address2.clone()));
  }
  if let Some(country) = &patch.country {
    address.country = non_blank(Some(country.clone())).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
  }
  if let Some(phone) = &patch.phone {
    address.phone = non_blank(Some(phone.clone()));
  }
  address.updated_at = now;

  let promote = patch.is_default == Some(true) && !address.is_default;
  if promote {
    address.is_default = true;
  }
  Ok(promote)
}

/// The address promoted after the default is deleted: the most recently
/// created of the remaining ones.
pub fn successor_default(remaining: &[Address]) -> Option<Uuid> {
  remaining.iter().max_by_key(|a| a.created_at).map(|a| a.id)
}

/// Default first, then newest first.
pub fn sort_for_display(addresses: &mut [Address]) {
  addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(b.created_at.cmp(&a.created_at)));
}
