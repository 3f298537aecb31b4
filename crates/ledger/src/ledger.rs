//! Ledger store: expenses and income in one conceptual ledger.
//!
//! Reads go through the unified `/transactions` view; writes go through the
//! type-specific resources (`/expenses`, `/income`).
use std::{fmt, str::FromStr};

use api_types::{
    Money, MoneyError, TransactionKind,
    date::{FORMAT as DATE_FORMAT, parse_calendar_date},
    transaction::{TransactionListResponse, TransactionView, TransactionWrite},
};
use chrono::{Datelike, NaiveDate};

use crate::{
    Confirm, Deletion,
    client::{ApiClient, ApiRequest, Transport},
    error::{LedgerError, ResultLedger},
};

const TRANSACTIONS: &str = "transactions";

/// Key sent with a create so that resending the same submission books it
/// once. Reuse it for retries; take a new one for a new record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

/// A calendar month, `YYYY-MM` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::validation(format!("invalid month: {s} (expected YYYY-MM)"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

/// Day and month filters share one slot, so they can never both be set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    Any,
    Day(NaiveDate),
    Month(YearMonth),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    kind: Option<TransactionKind>,
    date: DateFilter,
    limit: Option<usize>,
}

impl LedgerQuery {
    pub fn of_kind(kind: TransactionKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn kind(&self) -> Option<TransactionKind> {
        self.kind
    }

    pub fn date(&self) -> DateFilter {
        self.date
    }

    pub fn day(&self) -> Option<NaiveDate> {
        match self.date {
            DateFilter::Day(day) => Some(day),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<YearMonth> {
        match self.date {
            DateFilter::Month(month) => Some(month),
            _ => None,
        }
    }

    pub fn set_kind(&mut self, kind: Option<TransactionKind>) {
        self.kind = kind;
    }

    /// Selecting a day discards any month; clearing it leaves a month alone.
    pub fn set_day(&mut self, day: Option<NaiveDate>) {
        match day {
            Some(day) => self.date = DateFilter::Day(day),
            None if self.day().is_some() => self.date = DateFilter::Any,
            None => {}
        }
    }

    /// Selecting a month discards any day; clearing it leaves a day alone.
    pub fn set_month(&mut self, month: Option<YearMonth>) {
        match month {
            Some(month) => self.date = DateFilter::Month(month),
            None if self.month().is_some() => self.date = DateFilter::Any,
            None => {}
        }
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(kind) = self.kind {
            request = request.with_query("type", kind.as_str());
        }
        match self.date {
            DateFilter::Any => {}
            DateFilter::Day(day) => {
                request = request.with_query("date", day.format(DATE_FORMAT).to_string());
            }
            DateFilter::Month(month) => request = request.with_query("month", month.to_string()),
        }
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit.to_string());
        }
        request
    }
}

/// Raw form input for a transaction, as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub title: String,
    pub amount: String,
    /// Selected category id; empty means nothing selected.
    pub category: String,
    /// `YYYY-MM-DD`, or empty to let the server pick today.
    pub date: String,
    pub note: String,
}

impl TransactionDraft {
    /// Hydrates a draft from a stored record: calendar date only, category
    /// resolved to its id.
    pub fn from_view(tx: &TransactionView) -> Self {
        Self {
            title: tx.title.clone(),
            amount: tx.amount.to_string(),
            category: tx.category_id().unwrap_or_default().to_string(),
            date: tx
                .date
                .map(|date| date.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            note: tx.note.clone().unwrap_or_default(),
        }
    }

    /// Client-side checks; nothing here touches the network.
    pub fn validate(&self) -> ResultLedger<TransactionWrite> {
        let category = self.category.trim();
        if category.is_empty() {
            return Err(LedgerError::validation("Please select a category"));
        }

        let title = self.title.trim();
        if title.is_empty() {
            return Err(LedgerError::validation("Title is required"));
        }

        let amount = parse_amount(&self.amount)?;

        let date = match self.date.trim() {
            "" => None,
            raw => Some(
                parse_calendar_date(raw)
                    .ok_or_else(|| LedgerError::validation(format!("Invalid date: {raw}")))?,
            ),
        };

        let note = self.note.trim();
        Ok(TransactionWrite {
            title: title.to_string(),
            amount,
            category: category.to_string(),
            date,
            note: (!note.is_empty()).then(|| note.to_string()),
        })
    }
}

fn parse_amount(raw: &str) -> ResultLedger<Money> {
    let amount: Money = raw.parse().map_err(|err| match err {
        MoneyError::Empty => LedgerError::validation("Amount is required"),
        MoneyError::TooManyDecimals => {
            LedgerError::validation("Amount can have at most two decimals")
        }
        MoneyError::Invalid | MoneyError::Overflow => {
            LedgerError::validation("Amount must be a number")
        }
    })?;
    if !amount.is_positive() {
        return Err(LedgerError::validation("Amount must be greater than zero"));
    }
    Ok(amount)
}

/// One `GET /transactions` with the given filters, server order preserved.
pub(crate) async fn fetch<T: Transport>(
    api: &ApiClient<T>,
    query: &LedgerQuery,
) -> ResultLedger<Vec<TransactionView>> {
    let request = query.apply(ApiRequest::get(TRANSACTIONS));
    Ok(api
        .fetch::<TransactionListResponse>(request)
        .await?
        .into_vec())
}

fn stamp(mut tx: TransactionView, kind: TransactionKind) -> TransactionView {
    tx.kind.get_or_insert(kind);
    tx
}

pub struct LedgerStore<T> {
    api: ApiClient<T>,
    query: LedgerQuery,
    items: Vec<TransactionView>,
}

impl<T: Transport> LedgerStore<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            query: LedgerQuery::default(),
            items: Vec::new(),
        }
    }

    pub fn query(&self) -> &LedgerQuery {
        &self.query
    }

    /// Filters for the next [`refresh`](Self::refresh).
    pub fn query_mut(&mut self) -> &mut LedgerQuery {
        &mut self.query
    }

    pub fn items(&self) -> &[TransactionView] {
        &self.items
    }

    pub async fn list(&self, query: &LedgerQuery) -> ResultLedger<Vec<TransactionView>> {
        fetch(&self.api, query).await
    }

    pub async fn refresh(&mut self) -> ResultLedger<&[TransactionView]> {
        self.items = fetch(&self.api, &self.query).await?;
        Ok(&self.items)
    }

    /// Loads one record for editing. Anything but a 2xx is reported as
    /// not found, except authorization failures.
    pub async fn get(&self, kind: TransactionKind, id: &str) -> ResultLedger<TransactionView> {
        let request = ApiRequest::get(format!("{}/{id}", kind.resource()));
        match self.api.fetch::<TransactionView>(request).await {
            Ok(tx) => Ok(stamp(tx, kind)),
            Err(LedgerError::Unauthorized) => Err(LedgerError::Unauthorized),
            Err(err) => {
                tracing::warn!("cannot load {kind} {id}: {err}");
                Err(LedgerError::NotFound(format!("{kind} {id}")))
            }
        }
    }

    pub async fn create(
        &self,
        kind: TransactionKind,
        payload: &TransactionWrite,
        key: &IdempotencyKey,
    ) -> ResultLedger<TransactionView> {
        let request =
            ApiRequest::post(kind.resource(), payload)?.with_idempotency_key(key.as_str());
        let tx = stamp(self.api.fetch::<TransactionView>(request).await?, kind);
        tracing::info!("created {kind} {} ({})", tx.id, tx.amount);
        Ok(tx)
    }

    /// Full replacement of an existing record.
    pub async fn update(
        &self,
        kind: TransactionKind,
        id: &str,
        payload: &TransactionWrite,
    ) -> ResultLedger<TransactionView> {
        let request = ApiRequest::put(format!("{}/{id}", kind.resource()), payload)?;
        let tx = stamp(self.api.fetch::<TransactionView>(request).await?, kind);
        tracing::info!("updated {kind} {id}");
        Ok(tx)
    }

    /// Deletes after confirmation and refreshes; a failed delete leaves the
    /// held list untouched. A refresh failing after the delete went through
    /// is logged and the held list stays stale.
    pub async fn delete(
        &mut self,
        kind: TransactionKind,
        id: &str,
        confirm: &impl Confirm,
    ) -> ResultLedger<Deletion> {
        if !confirm.confirm(&format!("Delete this {kind}?")) {
            return Ok(Deletion::Cancelled);
        }
        self.api
            .execute(ApiRequest::delete(format!("{}/{id}", kind.resource())))
            .await?;
        tracing::info!("deleted {kind} {id}");
        if let Err(err) = self.refresh().await {
            tracing::warn!("{kind} {id} deleted but the ledger could not be reloaded: {err}");
        }
        Ok(Deletion::Deleted)
    }

    /// Newest `bound` records of one kind.
    pub async fn recent(
        &self,
        kind: TransactionKind,
        bound: usize,
    ) -> ResultLedger<Vec<TransactionView>> {
        let query = LedgerQuery::of_kind(kind).with_limit(bound);
        let mut items = fetch(&self.api, &query).await?;
        items.truncate(bound);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::testing;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(amount: &str) -> TransactionDraft {
        TransactionDraft {
            title: "Lunch".to_string(),
            amount: amount.to_string(),
            category: "c1".to_string(),
            date: "2025-01-10".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn day_and_month_filters_exclude_each_other() {
        let mut query = LedgerQuery::of_kind(TransactionKind::Expense);
        query.set_month(Some(YearMonth::new(2025, 1).unwrap()));
        query.set_day(Some(day(2025, 1, 10)));
        assert_eq!(query.month(), None);
        assert_eq!(query.day(), Some(day(2025, 1, 10)));

        query.set_month(Some(YearMonth::new(2024, 12).unwrap()));
        assert_eq!(query.day(), None);
        assert_eq!(query.kind(), Some(TransactionKind::Expense));

        // Clearing the filter that is not set keeps the other one.
        query.set_day(None);
        assert_eq!(query.month(), YearMonth::new(2024, 12));
        query.set_month(None);
        assert_eq!(query.date(), DateFilter::Any);
    }

    #[test]
    fn query_parameters_follow_filters() {
        let mut query = LedgerQuery::of_kind(TransactionKind::Income).with_limit(5);
        query.set_day(Some(day(2025, 1, 10)));
        let request = query.apply(ApiRequest::get(TRANSACTIONS));
        assert_eq!(request.query_value("type"), Some("income"));
        assert_eq!(request.query_value("date"), Some("2025-01-10"));
        assert_eq!(request.query_value("month"), None);
        assert_eq!(request.query_value("limit"), Some("5"));

        query.set_month(Some("2025-02".parse().unwrap()));
        let request = query.apply(ApiRequest::get(TRANSACTIONS));
        assert_eq!(request.query_value("date"), None);
        assert_eq!(request.query_value("month"), Some("2025-02"));
    }

    #[test]
    fn month_parsing() {
        assert_eq!("2025-03".parse::<YearMonth>().unwrap().to_string(), "2025-03");
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2025, 3).unwrap().contains(day(2025, 3, 31)));
    }

    #[test]
    fn amount_must_be_positive_number() {
        for bad in ["", "abc", "0", "-3", "1.234", "12,5,0"] {
            assert!(
                matches!(draft(bad).validate(), Err(LedgerError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
        let payload = draft("12.5").validate().unwrap();
        assert_eq!(payload.amount, Money::from_minor(1250));
        assert_eq!(payload.date, Some(day(2025, 1, 10)));
        assert_eq!(payload.note, None);
    }

    #[test]
    fn missing_category_is_reported_first() {
        let mut input = draft("");
        input.category = " ".to_string();
        assert_eq!(
            input.validate(),
            Err(LedgerError::Validation("Please select a category".to_string()))
        );
    }

    #[test]
    fn hydration_normalizes_date_and_category() {
        let embedded: TransactionView = serde_json::from_value(json!({
            "_id": "t1", "title": "Lunch", "amount": 12.5,
            "category": {"_id": "c1", "title": "Food"},
            "date": "2025-01-10T13:45:00.000Z", "note": "with Bob"
        }))
        .unwrap();
        let bare: TransactionView = serde_json::from_value(json!({
            "_id": "t1", "title": "Lunch", "amount": 12.5, "category": "c1",
            "date": "2025-01-10", "note": "with Bob"
        }))
        .unwrap();

        let first = TransactionDraft::from_view(&embedded);
        assert_eq!(first.date, "2025-01-10");
        assert_eq!(first.category, "c1");
        assert_eq!(first.amount, "12.50");
        assert_eq!(first, TransactionDraft::from_view(&embedded));
        assert_eq!(first, TransactionDraft::from_view(&bare));
    }

    #[tokio::test]
    async fn get_reports_any_failure_as_not_found() {
        let (api, transport, _rx) = testing::client(Some("secret"));
        transport.respond(Method::GET, "expenses/t1", 500, json!({"message": "cast error"}));
        let store = LedgerStore::new(api);

        let err = store.get(TransactionKind::Expense, "t1").await.unwrap_err();
        assert_eq!(err, LedgerError::NotFound("expense t1".to_string()));

        transport.respond(Method::GET, "expenses/t1", 401, json!({"message": "expired"}));
        let err = store.get(TransactionKind::Expense, "t1").await.unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized);
    }

    #[tokio::test]
    async fn create_uses_kind_resource_and_stamps_type() {
        let (api, transport, _rx) = testing::client(Some("secret"));
        transport.respond(
            Method::POST,
            "income",
            201,
            json!({"_id": "t9", "title": "Salary", "amount": 1000, "category": "c2", "date": "2025-01-31"}),
        );
        let store = LedgerStore::new(api);
        let payload = TransactionDraft {
            title: "Salary".to_string(),
            amount: "1000".to_string(),
            category: "c2".to_string(),
            ..TransactionDraft::default()
        }
        .validate()
        .unwrap();

        let key = IdempotencyKey::new();
        let tx = store
            .create(TransactionKind::Income, &payload, &key)
            .await
            .unwrap();
        assert_eq!(tx.kind, Some(TransactionKind::Income));

        let request = &transport.requests()[0];
        assert_eq!(request.idempotency_key.as_deref(), Some(key.as_str()));
        assert_eq!(request.body, Some(json!({"title": "Salary", "amount": 1000, "category": "c2"})));
    }

    #[tokio::test]
    async fn delete_refreshes_only_on_success() {
        let (api, transport, _rx) = testing::client(Some("secret"));
        transport.respond(
            Method::GET,
            TRANSACTIONS,
            200,
            json!([{"_id": "t1", "title": "Lunch", "amount": 12.5, "category": "c1", "type": "expense"}]),
        );
        transport.respond(Method::DELETE, "expenses/t1", 500, json!({"message": "nope"}));
        let mut store = LedgerStore::new(api);
        store.refresh().await.unwrap();

        assert_eq!(
            store.delete(TransactionKind::Expense, "t1", &|_: &str| false).await,
            Ok(Deletion::Cancelled)
        );
        assert_eq!(transport.count(&Method::DELETE, "expenses/t1"), 0);

        assert!(store.delete(TransactionKind::Expense, "t1", &|_: &str| true).await.is_err());
        assert_eq!(transport.count(&Method::GET, TRANSACTIONS), 1);
        assert_eq!(store.items().len(), 1);

        transport.respond(Method::DELETE, "expenses/t1", 200, json!({"message": "deleted"}));
        transport.respond(Method::GET, TRANSACTIONS, 200, json!([]));
        assert_eq!(
            store.delete(TransactionKind::Expense, "t1", &|_: &str| true).await,
            Ok(Deletion::Deleted)
        );
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn delete_stands_when_reload_fails() {
        let (api, transport, _rx) = testing::client(Some("secret"));
        transport.respond(
            Method::GET,
            TRANSACTIONS,
            200,
            json!([{"_id": "t1", "title": "Lunch", "amount": 12.5, "category": "c1", "type": "expense"}]),
        );
        transport.respond(Method::DELETE, "expenses/t1", 200, json!({"message": "deleted"}));
        let mut store = LedgerStore::new(api);
        store.refresh().await.unwrap();

        transport.respond(Method::GET, TRANSACTIONS, 502, json!({"message": "bad gateway"}));
        assert_eq!(
            store.delete(TransactionKind::Expense, "t1", &|_: &str| true).await,
            Ok(Deletion::Deleted)
        );
        assert_eq!(transport.count(&Method::DELETE, "expenses/t1"), 1);
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn recent_is_bounded() {
        let (api, transport, _rx) = testing::client(Some("secret"));
        let many: Vec<_> = (0..8)
            .map(|i| json!({"_id": format!("t{i}"), "title": "x", "amount": 1, "type": "expense"}))
            .collect();
        transport.respond(Method::GET, TRANSACTIONS, 200, json!(many));
        let store = LedgerStore::new(api);

        let recent = store.recent(TransactionKind::Expense, 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].id, "t0");
        assert_eq!(transport.requests()[0].query_value("limit"), Some("5"));
    }
}
