use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeroLabsError {
    /* authentication */
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not authorized during {0} (session expired?)")]
    Unauthorized(String),

    /* request errors */
    #[error("Too many requests during {0}")]
    TooManyRequests(String),

    #[error("Sonic service unavailable during {0}")]
    ServiceUnavailable(String),

    #[error("Unexpected status during {action}: {status} {body}")]
    Status {
        action: String,
        status: StatusCode,
        body: String,
    },

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
}

pub type HeroLabsResult<T> = Result<T, HeroLabsError>;

impl HeroLabsError {
    /// True for errors caused by the credentials or session, rather than by
    /// the transport or the service.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Unauthorized(_))
    }

    /// True for transport and service failures that are expected to clear
    /// up on a later attempt (connection errors, rate limiting, outages).
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::ReqwestError(_)
                | Self::TooManyRequests(_)
                | Self::ServiceUnavailable(_)
                | Self::Status { .. }
        )
    }

    pub(crate) fn from_status(action: &str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::Unauthorized(action.to_string())
            }
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests(action.to_string()),
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable(action.to_string()),
            status => Self::Status {
                action: action.to_string(),
                status,
                body,
            },
        }
    }
}
