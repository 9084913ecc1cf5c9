use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} is required")]
    EmptyField(&'static str),

    #[error("Not a valid email address: {0}")]
    InvalidEmail(String),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Not signed in. Run 'users login' first")]
    NotSignedIn,

    #[error("Identity provider discovery failed at {url}: {reason}")]
    Discovery { url: String, reason: String },

    #[error("Sign-in callback state did not match the request")]
    StateMismatch,

    #[error("Identity provider returned an error: {0}")]
    Provider(String),

    #[error("Timed out after {0}s waiting for the sign-in callback")]
    SignInTimeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
