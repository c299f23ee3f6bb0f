use serde::{Deserialize, Serialize};

use crate::models::{NewOrder, NewOrderItem, Product};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn find_mut(&mut self, product_id: i64) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    /// Add one unit of `product`
    pub fn add_item(&mut self, product: &Product) {
        if let Some(item) = self.find_mut(product.id) {
            item.quantity += 1;
        } else {
            self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity: 1,
            });
        }
    }

    pub fn remove_item(&mut self, product_id: i64) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Set the quantity of a line. Unknown products are ignored.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) {
        if let Some(item) = self.find_mut(product_id) {
            item.quantity = quantity;
        }
    }

    /// Take the current name and price from a freshly fetched product
    pub fn reprice(&mut self, product: &Product) {
        if let Some(item) = self.find_mut(product.id) {
            item.name = product.name.clone();
            item.price = product.price;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Order body for checkout; zero-quantity lines are left out
    pub fn to_order(&self) -> NewOrder {
        NewOrder {
            items: self
                .items
                .iter()
                .filter(|i| i.quantity > 0)
                .map(|i| NewOrderItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}
