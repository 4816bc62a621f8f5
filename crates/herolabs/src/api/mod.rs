mod device;
mod property;

pub use device::*;
pub use property::*;

use serde::{Deserialize, Deserializer, Serialize};

/// Read an explicit `null` as the default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope used by the account-wide listing endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Listing<T> {
    pub data: Vec<T>,
}

/// One entry of `GET /sonic`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct DeviceSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `GET /property`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PropertySummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}
