// storefront/src/models/mod.rs

//! Entities persisted by the store and echoed by the API.

pub mod address;
pub mod cart;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use address::{Address, AddressPatch, NewAddress};
pub use cart::CartLine;
pub use order::{Order, OrderStatus, ShippingSnapshot};
pub use order_item::OrderItem;
pub use product::{Category, Product};
pub use user::{CustomerSummary, Role, Session, User};
