//! Token wire formats: cipher layout, capability references, digests.

pub mod capability;
pub mod digest;
mod layout;

pub use capability::CapabilityRef;
pub use layout::{TokenParts, decode_expiry, encode_expiry};
