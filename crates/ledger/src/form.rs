//! Add/edit form for one transaction kind.
//!
//! Loading is split in three steps so a front end can keep accepting input
//! while requests are in flight:
//!
//! 1. [`FormController::prepare`] switches phase and issues a ticket per
//!    state slice it is going to load;
//! 2. [`PendingLoad::run`] performs the requests, borrowing nothing from the
//!    controller;
//! 3. [`FormController::apply`] stores each result, unless the slice was
//!    written after its ticket was issued.
//!
//! [`FormController::enter`] chains the three for callers that do not care.
use api_types::{TransactionKind, category::CategoryView, transaction::TransactionView};

use crate::{
    categories::CategoryStore,
    client::{ApiClient, Transport},
    error::{Degraded, LedgerError, ResultLedger},
    ledger::{IdempotencyKey, LedgerStore, TransactionDraft},
    navigation::Route,
    overview::{RECENT_LIMIT, merge_recent},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Create,
    Edit {
        id: String,
    },
    /// Transient; falls back to the phase it was entered from.
    Submitting {
        edit_id: Option<String>,
    },
}

impl Phase {
    /// Record being edited, if any, including while submitting.
    pub fn edit_id(&self) -> Option<&str> {
        match self {
            Self::Create => None,
            Self::Edit { id } => Some(id),
            Self::Submitting { edit_id } => edit_id.as_deref(),
        }
    }

    fn settled(edit_id: Option<String>) -> Self {
        match edit_id {
            Some(id) => Self::Edit { id },
            None => Self::Create,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// A state slice with a write counter.
#[derive(Debug, Default)]
struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    /// Reserves the slice for a load; any later write or ticket wins over it.
    fn ticket(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn set(&mut self, value: T) {
        self.version += 1;
        self.value = value;
    }

    fn is_current(&self, ticket: u64) -> bool {
        ticket == self.version
    }

    fn settle(&mut self, ticket: u64, value: T, slice: &str) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!("discarding stale {slice} load");
            return false;
        }
        self.value = value;
        true
    }
}

#[derive(Clone, Copy, Debug)]
struct Tickets {
    categories: u64,
    recent: Option<u64>,
    fields: Option<u64>,
}

/// Requests for one [`FormController::prepare`] call.
#[must_use = "a pending load does nothing until run"]
pub struct PendingLoad<T> {
    api: ApiClient<T>,
    kind: TransactionKind,
    edit_id: Option<String>,
    tickets: Tickets,
}

/// Results of a [`PendingLoad`], ready for [`FormController::apply`].
pub struct Loaded {
    edit_id: Option<String>,
    tickets: Tickets,
    categories: ResultLedger<Vec<CategoryView>>,
    recent: Option<Result<Vec<TransactionView>, Degraded>>,
    target: Option<ResultLedger<TransactionView>>,
}

impl<T: Transport + Clone> PendingLoad<T> {
    /// Create mode loads categories and the recent list together; edit mode
    /// loads categories and the target record together.
    pub async fn run(self) -> Loaded {
        let categories = CategoryStore::new(self.api.clone(), Some(self.kind));
        let ledger = LedgerStore::new(self.api);
        let kind = self.kind;

        let (categories, recent, target) = match self.edit_id.as_deref() {
            None => {
                let (categories, recent) = tokio::join!(categories.list(Some(kind)), async {
                    ledger.recent(kind, RECENT_LIMIT).await.map_err(Degraded)
                });
                (categories, Some(recent), None)
            }
            Some(id) => {
                let (categories, target) =
                    tokio::join!(categories.list(Some(kind)), ledger.get(kind, id));
                (categories, None, Some(target))
            }
        };

        Loaded {
            edit_id: self.edit_id,
            tickets: self.tickets,
            categories,
            recent,
            target,
        }
    }
}

pub struct FormController<T> {
    api: ApiClient<T>,
    kind: TransactionKind,
    phase: Phase,
    categories: Versioned<Vec<CategoryView>>,
    recent: Versioned<Vec<TransactionView>>,
    fields: Versioned<TransactionDraft>,
    /// Set once a categories load for the current phase has landed.
    categories_loaded: bool,
    /// Sent with every create of the current fields; a new one is drawn when
    /// the fields change or a create goes through.
    idempotency_key: IdempotencyKey,
    notice: Option<Notice>,
}

impl<T: Transport + Clone> FormController<T> {
    pub fn new(api: ApiClient<T>, kind: TransactionKind) -> Self {
        Self {
            api,
            kind,
            phase: Phase::Create,
            categories: Versioned::default(),
            recent: Versioned::default(),
            fields: Versioned::default(),
            categories_loaded: false,
            idempotency_key: IdempotencyKey::new(),
            notice: None,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn heading(&self) -> String {
        match self.phase.edit_id() {
            Some(_) => format!("Edit {}", self.kind.label()),
            None => format!("Add {}", self.kind.label()),
        }
    }

    /// Categories of this form's kind, as offered by the selector.
    pub fn categories(&self) -> &[CategoryView] {
        &self.categories.value
    }

    /// Newest submissions of this kind; always empty in edit mode.
    pub fn recent(&self) -> &[TransactionView] {
        &self.recent.value
    }

    pub fn fields(&self) -> &TransactionDraft {
        &self.fields.value
    }

    pub fn set_fields(&mut self, fields: TransactionDraft) {
        if fields != self.fields.value {
            self.idempotency_key = IdempotencyKey::new();
        }
        self.fields.set(fields);
    }

    pub fn edit_fields(&mut self, edit: impl FnOnce(&mut TransactionDraft)) {
        let mut fields = self.fields.value.clone();
        edit(&mut fields);
        self.set_fields(fields);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Submission needs at least one category of the matching kind.
    pub fn can_submit(&self) -> bool {
        !self.categories.value.is_empty() && !matches!(self.phase, Phase::Submitting { .. })
    }

    /// Where to send the user when a loaded create form has nothing to
    /// offer in the category selector.
    pub fn call_to_action(&self) -> Option<Route> {
        (self.phase == Phase::Create && self.categories_loaded && self.categories.value.is_empty())
            .then_some(Route::Categories)
    }

    /// Enters create mode (`None`) or edit mode and issues the load.
    pub fn prepare(&mut self, edit_id: Option<String>) -> PendingLoad<T> {
        self.notice = None;
        self.categories_loaded = false;
        let tickets = match &edit_id {
            None => {
                self.set_fields(TransactionDraft::default());
                Tickets {
                    categories: self.categories.ticket(),
                    recent: Some(self.recent.ticket()),
                    fields: None,
                }
            }
            Some(_) => {
                self.recent.set(Vec::new());
                Tickets {
                    categories: self.categories.ticket(),
                    recent: None,
                    fields: Some(self.fields.ticket()),
                }
            }
        };
        self.phase = Phase::settled(edit_id.clone());

        PendingLoad {
            api: self.api.clone(),
            kind: self.kind,
            edit_id,
            tickets,
        }
    }

    /// Stores load results slice by slice.
    ///
    /// A failed recent-list load leaves an empty panel and is not an error.
    /// A failed target load sends the user back to the ledger.
    pub fn apply(&mut self, loaded: Loaded) -> ResultLedger<()> {
        let Loaded {
            edit_id,
            tickets,
            categories,
            recent,
            target,
        } = loaded;
        let mut outcome = Ok(());

        if !self.categories.is_current(tickets.categories) {
            tracing::debug!("discarding stale categories load");
        } else {
            match categories {
                Ok(categories) => {
                    self.categories.value = categories;
                    self.categories_loaded = true;
                }
                Err(err) => {
                    if !err.is_unauthorized() {
                        self.notice =
                            Some(Notice::Error(format!("Could not load categories: {err}")));
                    }
                    outcome = Err(err);
                }
            }
        }

        if let (Some(ticket), Some(recent)) = (tickets.recent, recent) {
            let recent = recent.unwrap_or_else(|Degraded(err)| {
                tracing::debug!("recent {} unavailable: {err}", self.kind);
                Vec::new()
            });
            self.recent.settle(ticket, recent, "recent");
        }

        if let (Some(ticket), Some(target)) = (tickets.fields, target) {
            match target {
                Ok(tx) => {
                    self.fields
                        .settle(ticket, TransactionDraft::from_view(&tx), "fields");
                }
                Err(LedgerError::Unauthorized) => outcome = Err(LedgerError::Unauthorized),
                Err(err) => {
                    // Only redirect if the user is still looking at that record.
                    if self.phase.edit_id() == edit_id.as_deref() {
                        self.notice = Some(Notice::Error(format!(
                            "{} not found",
                            self.kind.label()
                        )));
                        self.api.session().navigator().navigate(Route::Transactions);
                    }
                    outcome = Err(err);
                }
            }
        }

        outcome
    }

    pub async fn enter(&mut self, edit_id: Option<String>) -> ResultLedger<()> {
        let loaded = self.prepare(edit_id).run().await;
        self.apply(loaded)
    }

    /// Validates the fields and creates or updates the record.
    ///
    /// Create: fields reset and the record joins the recent list.
    /// Edit: fields stay as they are and the user is sent to the ledger.
    pub async fn submit(&mut self) -> ResultLedger<TransactionView> {
        let edit_id = self.phase.edit_id().map(str::to_string);
        let payload = self.fields.value.validate()?;
        if !self
            .categories
            .value
            .iter()
            .any(|category| category.id == payload.category)
        {
            return Err(LedgerError::validation(format!(
                "Selected category is not of type {}",
                self.kind
            )));
        }

        self.phase = Phase::Submitting {
            edit_id: edit_id.clone(),
        };
        let ledger = LedgerStore::new(self.api.clone());
        let result = match edit_id.as_deref() {
            None => {
                ledger
                    .create(self.kind, &payload, &self.idempotency_key)
                    .await
            }
            Some(id) => ledger.update(self.kind, id, &payload).await,
        };
        self.phase = Phase::settled(edit_id);

        let tx = match result {
            Ok(tx) => tx,
            Err(err) => {
                if !err.is_unauthorized() {
                    self.notice = Some(Notice::Error(err.to_string()));
                }
                return Err(err);
            }
        };

        if self.phase.edit_id().is_some() {
            self.notice = Some(Notice::Success(format!("{} updated", self.kind.label())));
            self.api.session().navigator().navigate(Route::Transactions);
        } else {
            self.notice = Some(Notice::Success(format!("{} added", self.kind.label())));
            self.fields.set(TransactionDraft::default());
            self.idempotency_key = IdempotencyKey::new();
            let recent = merge_recent(&self.recent.value, tx.clone(), RECENT_LIMIT);
            self.recent.set(recent);
        }
        Ok(tx)
    }
}
