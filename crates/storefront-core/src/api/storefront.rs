//! Catalog and order operations on top of `SessionClient`.

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::client::{ApiRequest, SessionClient};
use super::{endpoints, ApiError};
use crate::cart::Cart;
use crate::models::{
    Category, NewOrder, NewProduct, Order, OrderStatus, OrderStatusUpdate, Product, ProductUpdate,
};

/// Maximum concurrent product lookups when repricing the cart.
const MAX_CONCURRENT_REQUESTS: usize = 8;

impl SessionClient<'_> {
    // ===== Catalog =====

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json(endpoints::CATEGORIES).await
    }

    pub async fn category(&self, id: i64) -> Result<Category, ApiError> {
        self.get_json(&endpoints::category(id)).await
    }

    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_json(endpoints::PRODUCTS).await
    }

    pub async fn product(&self, id: i64) -> Result<Product, ApiError> {
        self.get_json(&endpoints::product(id)).await
    }

    pub async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>, ApiError> {
        let products = self.products().await?;
        Ok(products
            .into_iter()
            .filter(|p| p.category_id() == Some(category_id))
            .collect())
    }

    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let products = self.products().await?;
        let found: Vec<Product> = products.into_iter().filter(|p| p.matches(query)).collect();
        debug!(query = query, found = found.len(), "Product search");
        Ok(found)
    }

    /// Bring cart names and prices up to date. Products that no longer
    /// exist are dropped from the cart; their ids are returned.
    pub async fn refresh_prices(&self, cart: &mut Cart) -> Result<Vec<i64>, ApiError> {
        let ids: Vec<i64> = cart.items.iter().map(|i| i.product_id).collect();
        let client = self;

        let results: Vec<(i64, Result<Product, ApiError>)> = stream::iter(ids)
            .map(|id| async move { (id, client.product(id).await) })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        let mut removed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(product) => cart.reprice(&product),
                Err(ApiError::NotFound(_)) => {
                    cart.remove_item(id);
                    removed.push(id);
                }
                Err(e) => return Err(e),
            }
        }
        removed.sort_unstable();
        Ok(removed)
    }

    // ===== Catalog administration =====

    pub async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let name = required_name(name)?;
        let request = ApiRequest::post(endpoints::CATEGORIES).form(vec![("name".to_string(), name)]);
        let created: Category = self.fetch(request).await?;
        info!(id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn update_category(&self, id: i64, name: &str) -> Result<Category, ApiError> {
        let name = required_name(name)?;
        let request = ApiRequest::put(endpoints::category(id)).form(vec![("name".to_string(), name)]);
        self.fetch(request).await
    }

    /// Delete a category. The backend deletes its products with it.
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&endpoints::category(id)).await?;
        info!(id = id, "Category deleted");
        Ok(())
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        product.validate().map_err(ApiError::BadRequest)?;
        let request = ApiRequest::post(endpoints::PRODUCTS).form(product.form_fields());
        let created: Product = self.fetch(request).await?;
        info!(id = created.id, article = %created.article, "Product created");
        Ok(created)
    }

    pub async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<Product, ApiError> {
        update.validate().map_err(ApiError::BadRequest)?;
        let request = ApiRequest::patch(endpoints::product(id)).form(update.form_fields());
        self.fetch(request).await
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&endpoints::product(id)).await?;
        info!(id = id, "Product deleted");
        Ok(())
    }

    /// Remove a product's main image. A product without one is a `BadRequest`.
    pub async fn delete_product_image(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&endpoints::product_image(id)).await
    }

    // ===== Orders =====

    /// Orders visible to the current user (all orders for staff)
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_json(endpoints::ORDERS).await
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        if order.is_empty() {
            return Err(ApiError::BadRequest("Order has no items".to_string()));
        }
        let created: Order = self.post_json(endpoints::ORDERS, order).await?;
        info!(code = %created.code, total = created.total_price, "Order placed");
        Ok(created)
    }

    /// Look up any order by its code (admin only)
    pub async fn order_by_code(&self, code: &str) -> Result<Order, ApiError> {
        self.get_json(&endpoints::order_search(code.trim())).await
    }

    /// Change an order's status (admin only). Cancelling needs a reason.
    pub async fn update_order_status(
        &self,
        code: &str,
        status: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Order, ApiError> {
        let cancel_reason = cancel_reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        if status == OrderStatus::Cancelled && cancel_reason.is_none() {
            return Err(ApiError::BadRequest(
                "A reason is required to cancel an order".to_string(),
            ));
        }

        let update = OrderStatusUpdate { status, cancel_reason };
        let updated: Order = self.patch_json(&endpoints::order(code.trim()), &update).await?;
        info!(code = %updated.code, status = %updated.status, "Order status updated");
        Ok(updated)
    }
}

fn required_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    Ok(name.to_string())
}
