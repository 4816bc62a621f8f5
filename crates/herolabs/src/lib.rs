//! Typed access to the Hero Labs Sonic cloud API.
//!
//! [`client::SonicApi`] describes the operations used by the bridge, and
//! [`client::HeroLabsClient`] implements them over HTTPS.

pub mod api;
pub mod client;
pub mod error;

pub const MANUFACTURER: &str = "Hero Labs";
pub const DEVICE_MODEL: &str = "Sonic";
pub const PROPERTY_MODEL: &str = "Property";
