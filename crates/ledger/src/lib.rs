//! Client core of the Trackwise ledger: session guard, category and
//! transaction stores, dashboard aggregation and the add/edit form.
//!
//! Every store talks to the REST API through one [`ApiClient`], which shares
//! the [`Session`] and the [`Navigator`] of the front end embedding it.
pub use auth::Auth;
pub use categories::{CategoryAction, CategoryDraft, CategoryStore, actions as category_actions};
pub use client::{
    ApiClient, ApiRequest, ApiResponse, HttpTransport, IDEMPOTENCY_HEADER, Transport,
    TransportError,
};
pub use error::{Degraded, LedgerError, ResultLedger};
pub use form::{FormController, Loaded, Notice, PendingLoad, Phase};
pub use ledger::{
    DateFilter, IdempotencyKey, LedgerQuery, LedgerStore, TransactionDraft, YearMonth,
};
pub use navigation::{Navigator, Route};
pub use overview::{Aggregator, Overview, RECENT_LIMIT, Totals, merge_recent};
pub use session::{
    CREDENTIAL_KEY, Credential, CredentialStore, Denied, FileCredentialStore,
    MemoryCredentialStore, Session, StoreError,
};

mod auth;
mod categories;
mod client;
mod error;
mod form;
mod ledger;
mod navigation;
mod overview;
mod session;
#[cfg(test)]
mod testing;

/// Asks the user before a destructive operation.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    Cancelled,
}
