//! OAuth2 client-credentials tokens for the Coupa API.

pub mod error;
pub mod manager;
pub mod token;

pub use error::AuthError;
pub use manager::TokenManager;
pub use token::{Credentials, Token, TokenScope};
