//! Core library for the ingredients storefront.
//!
//! Provides the REST API client, the credential store, the session gate
//! guarding the admin views, the login flow, product models and the
//! catalog search/filter used by the public views.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod routes;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{
    Activation, Admission, CredentialPair, LoginError, LoginFlow, SessionGate, TokenKey,
    TokenStore, Verdict,
};
pub use config::Config;
