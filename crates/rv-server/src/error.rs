use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use rv_auction::AuctionError;
use rv_counters::CounterError;
use rv_types::{ErrorKind, TypeError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid input: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeError> for ServerError {
    fn from(err: TypeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Forbidden,
            Self::BadRequest(_) => ErrorKind::InvalidInput,
            Self::Auction(e) => e.kind(),
            Self::Counter(e) => e.kind(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        if matches!(self, Self::Unauthenticated) {
            return StatusCode::UNAUTHORIZED;
        }
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict
            | ErrorKind::NotReady
            | ErrorKind::AlreadyTerminal
            | ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::BidTooLow
            | ErrorKind::AuctionNotActive
            | ErrorKind::AuctionEnded
            | ErrorKind::SelfBid => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to a client. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".into(),
            ErrorKind::Forbidden if !matches!(self, Self::Unauthenticated) => "forbidden".into(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: ErrorKind,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rv_store::StoreError;
    use rv_types::Amount;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (
                ServerError::from(AuctionError::BidTooLow {
                    offered: Amount::from(1),
                    current: Amount::from(2),
                }),
                422,
            ),
            (AuctionError::AuctionEnded.into(), 422),
            (AuctionError::Conflict { attempts: 5 }.into(), 409),
            (AuctionError::NotFound("listing").into(), 404),
            (AuctionError::Forbidden.into(), 403),
            (CounterError::AlreadyExists("like").into(), 409),
            (CounterError::InvalidInput("x".into()).into(), 400),
            (ServerError::Unauthenticated, 401),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err}");
        }
    }

    #[test]
    fn store_details_are_not_exposed() {
        let err = ServerError::from(AuctionError::Store(StoreError::Unavailable(
            "lock poisoned at shard 3".into(),
        )));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn unauthenticated_is_forbidden_kind() {
        let err = ServerError::Unauthenticated;
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(err.public_message(), "authentication required");
    }
}
