//! Route table for the storefront views.

/// Login view; the gate redirects here on denial
pub const LOGIN_ROUTE: &str = "/login";

/// Protected landing view after a successful login
pub const ADMIN_ROUTE: &str = "/admin";

/// Public routes that never consult the session gate
pub const PUBLIC_ROUTES: [&str; 4] = ["/", "/shop", "/shop/product/:id", LOGIN_ROUTE];

/// A navigation request produced by the gate or the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl Navigation {
    pub fn push(path: &str) -> Self {
        Self {
            path: path.to_string(),
            replace: false,
        }
    }

    pub fn replace(path: &str) -> Self {
        Self {
            path: path.to_string(),
            replace: true,
        }
    }

    /// Redirect to the login view without leaving the protected view in history
    pub fn to_login() -> Self {
        Self::replace(LOGIN_ROUTE)
    }
}

/// Whether a path requires an admitted session
pub fn is_protected(path: &str) -> bool {
    path == ADMIN_ROUTE || path.starts_with("/admin/")
}

/// Admin product detail path for a product id
pub fn admin_product_route(id: i64) -> String {
    format!("{}/product/{}", ADMIN_ROUTE, id)
}
