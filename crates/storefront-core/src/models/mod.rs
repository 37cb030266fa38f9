//! Data models for storefront entities.

pub mod product;

pub use product::{Category, Product, ProductDraft, ProductPatch};
