use std::collections::HashMap;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const PROFILE_PATH: &str = "/profile";

/// Where a successful login lands
pub const LOGIN_LANDING_PATH: &str = "/about";
/// Where a successful registration lands
pub const REGISTER_LANDING_PATH: &str = "/";

/// Navigation requirements declared by a route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<&'static str>,
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub hide_for_auth: bool,
}

impl RouteMeta {
    const fn titled(title: &'static str) -> Self {
        Self {
            title: Some(title),
            requires_auth: false,
            requires_admin: false,
            hide_for_auth: false,
        }
    }

    const fn untitled() -> Self {
        Self {
            title: None,
            requires_auth: false,
            requires_admin: false,
            hide_for_auth: false,
        }
    }

    const fn auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    const fn admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    const fn guest_only(mut self) -> Self {
        self.hide_for_auth = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub meta: RouteMeta,
}

pub static ROUTES: &[Route] = &[
    Route { name: "home", path: "/", meta: RouteMeta::titled("Home") },
    Route { name: "categories2", path: "/catalog", meta: RouteMeta::titled("Catalog") },
    Route { name: "categories", path: "/about", meta: RouteMeta::titled("Catalog") },
    Route { name: "ProductDetail", path: "/product/:productId", meta: RouteMeta::untitled() },
    Route { name: "catalogs", path: "/catalogs", meta: RouteMeta::untitled() },
    Route { name: "catalog", path: "/catalog/:categoryId", meta: RouteMeta::titled("Category") },
    Route { name: "profile", path: "/profile", meta: RouteMeta::titled("Profile").auth() },
    Route { name: "login", path: "/login", meta: RouteMeta::titled("Sign in").guest_only() },
    Route { name: "register", path: "/register", meta: RouteMeta::titled("Register").guest_only() },
    Route { name: "admin-panel", path: "/admin-panel", meta: RouteMeta::titled("Admin panel").auth().admin() },
    Route { name: "cart", path: "/cart", meta: RouteMeta::untitled() },
    Route { name: "orders", path: "/orders", meta: RouteMeta::untitled() },
    Route { name: "admin-orders", path: "/admin/orders", meta: RouteMeta::titled("Order management").auth().admin() },
];

/// A route matched against a concrete path
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub route: &'static Route,
    /// The requested path without query string or trailing slash
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: Option<String>,
}

/// Strip the query string and any trailing slash
pub fn normalize(path: &str) -> (String, Option<String>) {
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (path, None),
    };
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    (path, query)
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern_segments.iter().zip(path_segments.iter()) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), actual.to_string());
        } else if expected != actual {
            return None;
        }
    }
    Some(params)
}

/// Find the first route matching `path`
pub fn resolve(path: &str) -> Option<ResolvedRoute> {
    let (path, query) = normalize(path);
    ROUTES.iter().find_map(|route| {
        match_pattern(route.path, &path).map(|params| ResolvedRoute {
            route,
            path: path.clone(),
            params,
            query: query.clone(),
        })
    })
}
