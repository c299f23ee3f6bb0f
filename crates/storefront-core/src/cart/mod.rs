//! Shopping cart and its local persistence.

pub mod cache;
pub mod store;

pub use cache::{CartCache, Saved};
pub use store::{Cart, CartItem};
