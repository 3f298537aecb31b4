//! Errors the ledger core can return.
//!
//! Every failure falls in one of four classes:
//!
//! - [`Validation`] detected on the client before any request is sent.
//! - [`Unauthorized`] the credential is missing or the server answered
//!   401/403. The session has already been cleared when this is returned.
//! - [`NotFound`] the target of a load does not exist.
//! - [`Server`] any other non-2xx answer, or a network/decoding failure.
//!
//!  [`Validation`]: LedgerError::Validation
//!  [`Unauthorized`]: LedgerError::Unauthorized
//!  [`NotFound`]: LedgerError::NotFound
//!  [`Server`]: LedgerError::Server
use thiserror::Error;

use crate::client::TransportError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("not authorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error: {message}")]
    Server {
        /// `None` when the request never got an answer.
        status: Option<u16>,
        message: String,
    },
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<TransportError> for LedgerError {
    fn from(value: TransportError) -> Self {
        Self::server(None, value.to_string())
    }
}

/// Failure of a best-effort background load.
///
/// Not convertible into [`LedgerError`], so it cannot be bubbled up with `?`;
/// the caller decides what the empty panel looks like.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("background load failed: {0}")]
pub struct Degraded(pub LedgerError);

pub type ResultLedger<T> = Result<T, LedgerError>;
