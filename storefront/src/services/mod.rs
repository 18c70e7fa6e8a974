// storefront/src/services/mod.rs
pub mod address_book;
pub mod auth_service;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod email_mock;
pub mod orders;
pub mod payment_gateway;
pub mod payment_mock;
pub mod webhook_signature;
