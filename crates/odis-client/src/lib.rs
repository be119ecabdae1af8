//! Client for ODIS, the phone number privacy service used to derive
//! obfuscated identifiers for on-chain attestations.

mod auth;
mod client;
mod error;
mod identifier;
mod types;

pub use auth::AuthSigner;
pub use client::OdisClient;
pub use error::OdisError;
pub use identifier::{
    obfuscated_identifier, pepper_from_signature, query_message, Blinder, IdentifierResult,
    NoBlinding, PEPPER_LENGTH,
};
pub use types::*;
