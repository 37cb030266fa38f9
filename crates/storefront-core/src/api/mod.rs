//! REST API client module for the storefront backend.
//!
//! This module provides the `ApiClient` for the token endpoints and the
//! public and admin product endpoints.
//!
//! The backend uses JWT bearer authentication: a short-lived access
//! credential on every request, renewed through the refresh endpoint.

pub mod client;
pub mod error;

pub use client::{
    ApiClient, TokenPair, ADMIN_PRODUCTS_PATH, PRODUCTS_PATH, TOKEN_PATH, TOKEN_REFRESH_PATH,
};
pub use error::ApiError;
