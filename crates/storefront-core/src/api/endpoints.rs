//! Backend endpoint paths, relative to the configured API root.

pub const LOGIN: &str = "auth/login/";
pub const REGISTER: &str = "auth/register/";
pub const REFRESH: &str = "auth/refresh/";
pub const USER: &str = "auth/user/";
pub const LOGOUT: &str = "auth/logout/";

pub const CATEGORIES: &str = "categories/";
pub const PRODUCTS: &str = "products/";
pub const ORDERS: &str = "orders/";

pub fn category(id: i64) -> String {
    format!("{}{}/", CATEGORIES, id)
}

pub fn product(id: i64) -> String {
    format!("{}{}/", PRODUCTS, id)
}

pub fn order(code: &str) -> String {
    format!("{}{}/", ORDERS, code)
}

pub fn order_search(code: &str) -> String {
    format!("{}search/{}/", ORDERS, code)
}

pub fn product_image(id: i64) -> String {
    format!("{}{}/delete-image/", PRODUCTS, id)
}
