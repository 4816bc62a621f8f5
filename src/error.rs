use thiserror::Error;

use herolabs::error::HeroLabsError;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    #[error(transparent)]
    AxumError(#[from] axum::Error),

    #[error(transparent)]
    HeroLabsError(#[from] HeroLabsError),

    /* setup errors */
    #[error("Setup not ready, retry later: {0}")]
    NotReady(String),

    #[error("No password configured. Set account.password or env {0}")]
    MissingPassword(String),

    #[error("No Sonic devices found on this account")]
    NoDevices,

    /* entity errors */
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Entity {0} is not a switch")]
    NotASwitch(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}
