//! Category store: typed, coloured categories with protected defaults.
//!
//! Every successful mutation is followed by a full re-list; the store never
//! patches its collection locally because it cannot predict server ids.
use api_types::{
    TransactionKind,
    category::{CategoryListResponse, CategoryView, CategoryWrite, DEFAULT_COLOR},
};

use crate::{
    Confirm, Deletion,
    client::{ApiClient, ApiRequest, Transport},
    error::{LedgerError, ResultLedger},
    ledger::{self, LedgerQuery},
};

/// Affordances a front end may render next to a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryAction {
    Edit,
    Delete,
}

/// Default categories get no affordances at all.
pub fn actions(category: &CategoryView) -> &'static [CategoryAction] {
    if category.is_default {
        &[]
    } else {
        &[CategoryAction::Edit, CategoryAction::Delete]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryDraft {
    pub title: String,
    pub kind: TransactionKind,
    pub color: String,
}

impl CategoryDraft {
    pub fn new(title: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            title: title.into(),
            kind,
            color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Pre-fills the edit form from an existing category.
    pub fn from_view(category: &CategoryView) -> Self {
        let color = if category.color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            category.color.clone()
        };
        Self {
            title: category.title.clone(),
            kind: category.kind,
            color,
        }
    }

    fn validate(&self) -> ResultLedger<CategoryWrite> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(LedgerError::validation("Category title required"));
        }
        let color = self.color.trim();
        Ok(CategoryWrite {
            title: title.to_string(),
            kind: self.kind,
            color: if color.is_empty() {
                DEFAULT_COLOR.to_string()
            } else {
                color.to_string()
            },
        })
    }
}

pub struct CategoryStore<T> {
    api: ApiClient<T>,
    filter: Option<TransactionKind>,
    items: Vec<CategoryView>,
}

impl<T: Transport> CategoryStore<T> {
    /// `filter` restricts the collection to one kind (a form's selector);
    /// `None` is the full management view.
    pub fn new(api: ApiClient<T>, filter: Option<TransactionKind>) -> Self {
        Self {
            api,
            filter,
            items: Vec::new(),
        }
    }

    pub fn filter(&self) -> Option<TransactionKind> {
        self.filter
    }

    /// Categories in server order, as of the last refresh.
    pub fn items(&self) -> &[CategoryView] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CategoryView> {
        self.items.iter().find(|category| category.id == id)
    }

    /// Fetches categories without touching the held collection.
    ///
    /// The kind filter is sent to the server and applied again locally, so a
    /// selector can never offer a category of the wrong type.
    pub async fn list(&self, filter: Option<TransactionKind>) -> ResultLedger<Vec<CategoryView>> {
        let mut request = ApiRequest::get("categories");
        if let Some(kind) = filter {
            request = request.with_query("type", kind.as_str());
        }
        let categories = self
            .api
            .fetch::<CategoryListResponse>(request)
            .await?
            .into_vec();

        Ok(match filter {
            Some(kind) => categories
                .into_iter()
                .filter(|category| category.kind == kind)
                .collect(),
            None => categories,
        })
    }

    pub async fn refresh(&mut self) -> ResultLedger<&[CategoryView]> {
        self.items = self.list(self.filter).await?;
        Ok(&self.items)
    }

    pub async fn create(&mut self, draft: &CategoryDraft) -> ResultLedger<()> {
        let body = draft.validate()?;
        self.api
            .execute(ApiRequest::post("categories", &body)?)
            .await?;
        tracing::info!("created {} category {}", body.kind, body.title);
        self.reload_after("category created").await;
        Ok(())
    }

    /// Replaces title, type and colour together.
    ///
    /// The type only changes while no transaction uses the category.
    pub async fn update(&mut self, id: &str, draft: &CategoryDraft) -> ResultLedger<()> {
        let body = draft.validate()?;
        let current_kind = self.editable(id)?.kind;
        if current_kind != body.kind {
            let used_by = self.references(id).await?;
            if used_by > 0 {
                return Err(LedgerError::validation(format!(
                    "cannot change the type of a category used by {used_by} transaction(s)"
                )));
            }
        }

        self.api
            .execute(ApiRequest::put(format!("categories/{id}"), &body)?)
            .await?;
        tracing::info!("updated category {id}");
        self.reload_after("category updated").await;
        Ok(())
    }

    /// Deletes after confirmation. Referenced categories are refused; on
    /// failure the held collection is left as it was.
    pub async fn delete(&mut self, id: &str, confirm: &impl Confirm) -> ResultLedger<Deletion> {
        let title = self.editable(id)?.title.clone();
        if !confirm.confirm(&format!("Delete category \"{title}\"?")) {
            return Ok(Deletion::Cancelled);
        }

        let used_by = self.references(id).await?;
        if used_by > 0 {
            return Err(LedgerError::validation(format!(
                "category \"{title}\" is used by {used_by} transaction(s)"
            )));
        }

        self.api
            .execute(ApiRequest::delete(format!("categories/{id}")))
            .await?;
        tracing::info!("deleted category {id}");
        self.reload_after("category deleted").await;
        Ok(Deletion::Deleted)
    }

    /// The write already went through, so a failed re-list only leaves the
    /// held collection stale.
    async fn reload_after(&mut self, action: &str) {
        if let Err(err) = self.refresh().await {
            tracing::warn!("{action} but categories could not be reloaded: {err}");
        }
    }

    fn editable(&self, id: &str) -> ResultLedger<&CategoryView> {
        let category = self
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(format!("category {id}")))?;
        if category.is_default {
            return Err(LedgerError::validation(
                "default categories cannot be edited or deleted",
            ));
        }
        Ok(category)
    }

    async fn references(&self, id: &str) -> ResultLedger<usize> {
        let transactions = ledger::fetch(&self.api, &LedgerQuery::default()).await?;
        Ok(transactions
            .iter()
            .filter(|tx| tx.category_id() == Some(id))
            .count())
    }
}
