//! Error types for coercion operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoercionError {
    #[error("Invalid argument: {0}. argument must be a valid ISO8601 date/time interval.")]
    MalformedInterval(String),

    #[error("Invalid argument: {0}. The year must be >= 2000.")]
    YearTooEarly(String),

    #[error("Invalid argument: {0}. The smallest supported resolution for datetimes is one second.")]
    SubsecondResolution(String),

    #[error("Invalid boolean: {0}")]
    InvalidBoolean(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid integer: {0}")]
    InvalidInteger(String),

    #[error("{0} is not a valid URL")]
    InvalidUrl(String),

    #[error("{0} is not a valid URL. Did you mean: http://{0}")]
    UrlMissingScheme(String),
}

pub type Result<T> = std::result::Result<T, CoercionError>;
