use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{event, Level};

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("DB Error {0}")]
    Db(#[from] sqlx::Error),

    #[error("Missing required fields")]
    MissingFields,

    #[error("Missing salt or amount")]
    MissingSaltOrAmount,

    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Decryption failed: {0}")]
    Decryption(#[from] CodecError),
}

impl LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::MissingSaltOrAmount => StatusCode::BAD_REQUEST,
            Self::InvoiceNotFound => StatusCode::NOT_FOUND,
            Self::Db(_) | Self::Decryption(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            event!(Level::ERROR, "error in ledger: {:?}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LedgerError::MissingFields.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::MissingSaltOrAmount.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::InvoiceNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::Db(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            LedgerError::Decryption(CodecError::Truncated).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
