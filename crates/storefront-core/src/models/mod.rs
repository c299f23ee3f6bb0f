//! Data models for storefront entities.
//!
//! - `Category`, `Product`, `ProductImage`: the catalog, and `NewProduct`/`ProductUpdate` for admin edits
//! - `Order`, `OrderItem`, `OrderStatus`, `NewOrder`: orders and checkout
//! - `UserProfile`, `Credentials`, `Registration`: account data

pub mod catalog;
pub mod order;
pub mod user;

pub use catalog::{Category, NewProduct, Product, ProductImage, ProductUpdate};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderOwner, OrderStatus, OrderStatusUpdate};
pub use user::{profile_role, Credentials, Registration, UserProfile};
