//! Authentication module for session admission and credentials.
//!
//! This module provides:
//! - `TokenStore`: persistence for the access/refresh credential pair
//! - `codec`: offline decoding of a credential's expiry
//! - `SessionGate`: admission to protected views, with single-flight refresh
//! - `LoginFlow`: username/password login that seeds the store

pub mod codec;
pub mod gate;
pub mod keyring_store;
pub mod login;
pub mod store;

pub use codec::{Claims, CodecError};
pub use gate::{Activation, Admission, Decision, SessionGate, TokenRefresher, Verdict};
pub use keyring_store::KeyringTokenStore;
pub use login::{LoginError, LoginFlow};
pub use store::{CredentialPair, FileTokenStore, MemoryTokenStore, TokenKey, TokenStore};
