use crate::database::DbError;
use serde::Serialize;

/// Uniform failure for every API action.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a readable response
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx status; message comes from the envelope when present
    #[error("{message}")]
    Http { status: u16, message: String },
    /// Envelope returned `success: false`
    #[error("{0}")]
    Application(String),
    /// Bad user input caught before any request was made
    #[error("{0}")]
    Validation(String),
    #[error("Unexpected response data: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] DbError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Network,
    Application,
    Validation,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) | ApiError::Http { .. } | ApiError::Decode(_) => ErrorKind::Network,
            ApiError::Application(_) | ApiError::Storage(_) => ErrorKind::Application,
            ApiError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ApiError::Network("refused".into()).kind(), ErrorKind::Network);
        assert_eq!(
            ApiError::Http { status: 500, message: "HTTP 500".into() }.kind(),
            ErrorKind::Network
        );
        assert_eq!(ApiError::Application("文件不存在".into()).kind(), ErrorKind::Application);
        assert_eq!(ApiError::validation("missing").kind(), ErrorKind::Validation);
        assert_eq!(ApiError::Storage(DbError::Lock).kind(), ErrorKind::Application);
    }

    #[test]
    fn test_http_error_displays_server_message() {
        let err = ApiError::Http { status: 400, message: "文件已存在".into() };
        assert_eq!(err.to_string(), "文件已存在");
    }
}
