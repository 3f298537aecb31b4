use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use money::{Money, MoneyError};

mod money;

/// Which side of the ledger a category or transaction belongs to.
///
/// Expense and income behave the same everywhere except for the values in
/// the small table below (resource path, label, display accent).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
}

/// Display hint attached to a kind; front ends map it to their own palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accent {
    Negative,
    Positive,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 2] = [Self::Expense, Self::Income];

    /// Canonical string used in query parameters and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Expense => "Expense",
            Self::Income => "Income",
        }
    }

    /// Type-specific REST resource (`/expenses`, `/income`).
    pub fn resource(self) -> &'static str {
        match self {
            Self::Expense => "expenses",
            Self::Income => "income",
        }
    }

    pub fn accent(self) -> Accent {
        match self {
            Self::Expense => Accent::Negative,
            Self::Income => Accent::Positive,
        }
    }

    pub fn sign(self) -> char {
        match self {
            Self::Expense => '-',
            Self::Income => '+',
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" | "expenses" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "error")]
    pub message: String,
}

pub mod date {
    //! Calendar dates on the wire.
    //!
    //! The server stores full timestamps (`2025-01-10T00:00:00.000Z`) but the
    //! ledger only cares about the calendar day, so anything after the first
    //! ten characters is discarded.

    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y-%m-%d";

    /// Parses `YYYY-MM-DD`, ignoring any time-of-day suffix.
    pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, FORMAT).ok()
    }

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.collect_str(&date.format(FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_calendar_date(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {value}"))),
        }
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct UserView {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub name: String,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterRequest {
        pub name: String,
        pub email: String,
        pub password: String,
    }

    /// Login/register response. `token` is only present on login.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        #[serde(default)]
        pub token: Option<String>,
        #[serde(default)]
        pub user: Option<UserView>,
        #[serde(default)]
        pub message: Option<String>,
    }
}

pub mod category {
    use super::*;

    pub const DEFAULT_COLOR: &str = "#3b82f6";

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryView {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub title: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        #[serde(default)]
        pub color: String,
        /// Built-in categories are selectable but never edited or deleted.
        #[serde(default)]
        pub is_default: bool,
    }

    /// Body of `POST /categories` and `PUT /categories/:id`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryWrite {
        pub title: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub color: String,
    }

    /// `GET /categories` answers either a bare array or `{categories: [...]}`.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum CategoryListResponse {
        Plain(Vec<CategoryView>),
        Wrapped { categories: Vec<CategoryView> },
    }

    impl CategoryListResponse {
        pub fn into_vec(self) -> Vec<CategoryView> {
            match self {
                Self::Plain(categories) | Self::Wrapped { categories } => categories,
            }
        }
    }
}

pub mod transaction {
    use chrono::NaiveDate;

    use super::*;

    /// Category as the server embeds it in a populated transaction.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EmbeddedCategory {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        #[serde(default)]
        pub title: Option<String>,
        #[serde(default)]
        pub color: Option<String>,
        #[serde(rename = "type", default)]
        pub kind: Option<TransactionKind>,
    }

    /// A transaction's category: populated object or bare id.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum CategoryRef {
        Embedded(EmbeddedCategory),
        Id(String),
    }

    impl CategoryRef {
        pub fn id(&self) -> &str {
            match self {
                Self::Embedded(category) => &category.id,
                Self::Id(id) => id,
            }
        }

        pub fn title(&self) -> Option<&str> {
            match self {
                Self::Embedded(category) => category.title.as_deref(),
                Self::Id(_) => None,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub title: String,
        pub amount: Money,
        #[serde(default)]
        pub category: Option<CategoryRef>,
        /// Calendar day of the transaction; time-of-day is discarded.
        #[serde(default, with = "crate::date")]
        pub date: Option<NaiveDate>,
        #[serde(default)]
        pub note: Option<String>,
        /// Absent on some type-specific endpoints; the client stamps it.
        #[serde(rename = "type", default)]
        pub kind: Option<TransactionKind>,
    }

    impl TransactionView {
        pub fn category_id(&self) -> Option<&str> {
            self.category.as_ref().map(CategoryRef::id)
        }
    }

    /// Body of `POST /expenses|/income` and `PUT .../:id`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionWrite {
        pub title: String,
        pub amount: Money,
        /// Category id.
        pub category: String,
        #[serde(default, with = "crate::date", skip_serializing_if = "Option::is_none")]
        pub date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub note: Option<String>,
    }

    /// `GET /transactions` answers either a bare array or `{transactions: [...]}`.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum TransactionListResponse {
        Plain(Vec<TransactionView>),
        Wrapped { transactions: Vec<TransactionView> },
    }

    impl TransactionListResponse {
        pub fn into_vec(self) -> Vec<TransactionView> {
            match self {
                Self::Plain(transactions) | Self::Wrapped { transactions } => transactions,
            }
        }
    }
}

pub mod dashboard {
    use super::*;
    use crate::transaction::TransactionView;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct OverviewUser {
        pub name: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct TotalsView {
        pub income: Money,
        pub expense: Money,
        /// Informational only; clients recompute it from income and expense.
        #[serde(default)]
        pub balance: Option<Money>,
    }

    /// Body of `GET /dashboard/overview`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct OverviewResponse {
        #[serde(default)]
        pub user: Option<OverviewUser>,
        pub totals: TotalsView,
        #[serde(default)]
        pub recent: Vec<TransactionView>,
    }
}
