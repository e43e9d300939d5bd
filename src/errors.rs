use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

/// Body of a non-2xx response, decoded as far as the server allows.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorPayload {
    Json(Value),
    Text(String),
    Empty,
}

impl ErrorPayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return ErrorPayload::Empty;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => ErrorPayload::Json(value),
            Err(_) => ErrorPayload::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ErrorPayload::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPayload::Json(value) => write!(f, "{}", value),
            ErrorPayload::Text(text) => write!(f, "{}", text),
            ErrorPayload::Empty => write!(f, "<empty body>"),
        }
    }
}

/// Outcome of a failed refresh cycle, shared with every request waiting on it.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshFailure {
    /// Status returned by the refresh endpoint; `None` for transport failures.
    pub status: Option<StatusCode>,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn abandoned() -> Self {
        Self::new(None, "refresh cycle abandoned before it settled")
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "refresh failed ({}): {}", status, self.message),
            None => write!(f, "refresh failed: {}", self.message),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Reqwest(reqwest::Error),
    Http(StatusCode, ErrorPayload),
    Refresh(RefreshFailure),
    /// A header or other per-call input that cannot be put on the wire.
    InvalidRequest(String),
    Config(String),
}

impl Error {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http(status, _) => Some(*status),
            Error::Refresh(failure) => failure.status,
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            Error::Http(_, payload) => Some(payload),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Json(err) => write!(f, "json error: {}", err),
            Error::Reqwest(err) => write!(f, "transport error: {}", err),
            Error::Http(status, payload) => write!(f, "http {}: {}", status, payload),
            Error::Refresh(failure) => write!(f, "{}", failure),
            Error::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            Error::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Reqwest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Reqwest(err)
    }
}

impl From<RefreshFailure> for Error {
    fn from(failure: RefreshFailure) -> Self {
        Error::Refresh(failure)
    }
}
