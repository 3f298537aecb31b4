//! Dashboard figures: totals, balance and the newest transactions.
use std::cmp::Reverse;

use api_types::{
    Money, TransactionKind,
    dashboard::{OverviewResponse, TotalsView},
    transaction::TransactionView,
};

use crate::{
    client::{ApiClient, ApiRequest, Transport},
    error::{LedgerError, ResultLedger},
    ledger::{self, LedgerQuery},
};

/// Length of every "recent" list.
pub const RECENT_LIMIT: usize = 5;

/// `balance` is always `income - expense`; it is never taken from the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub income: Money,
    pub expense: Money,
    pub balance: Money,
}

fn overflow() -> LedgerError {
    LedgerError::server(None, "totals out of range")
}

impl Totals {
    pub fn new(income: Money, expense: Money) -> ResultLedger<Self> {
        Ok(Self {
            income,
            expense,
            balance: income.checked_sub(expense).ok_or_else(overflow)?,
        })
    }

    /// Sums a ledger by kind. Records without a kind are skipped.
    pub fn from_ledger(transactions: &[TransactionView]) -> ResultLedger<Self> {
        let mut income = Money::ZERO;
        let mut expense = Money::ZERO;
        for tx in transactions {
            let total = match tx.kind {
                Some(TransactionKind::Income) => &mut income,
                Some(TransactionKind::Expense) => &mut expense,
                None => {
                    tracing::debug!("transaction {} has no type, skipped", tx.id);
                    continue;
                }
            };
            *total = total.checked_add(tx.amount).ok_or_else(overflow)?;
        }
        Self::new(income, expense)
    }

    fn from_view(view: &TotalsView) -> ResultLedger<Self> {
        let totals = Self::new(view.income, view.expense)?;
        if let Some(reported) = view.balance
            && reported != totals.balance
        {
            tracing::warn!(
                "server balance {reported} disagrees with income - expense = {}",
                totals.balance
            );
        }
        Ok(totals)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overview {
    pub user_name: Option<String>,
    pub totals: Totals,
    /// Newest first, at most [`RECENT_LIMIT`] entries.
    pub recent: Vec<TransactionView>,
}

/// Puts `item` in front of `old`, drops any older entry with the same id and
/// keeps at most `bound` entries.
pub fn merge_recent(
    old: &[TransactionView],
    item: TransactionView,
    bound: usize,
) -> Vec<TransactionView> {
    let mut merged = Vec::with_capacity(bound);
    let id = item.id.clone();
    merged.push(item);
    merged.extend(old.iter().filter(|tx| tx.id != id).cloned());
    merged.truncate(bound);
    merged
}

pub struct Aggregator<T> {
    api: ApiClient<T>,
}

impl<T: Transport> Aggregator<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        Self { api }
    }

    /// Reads the server-side summary. A server without the summary endpoint
    /// gets the figures reduced locally from the full ledger.
    pub async fn overview(&self) -> ResultLedger<Overview> {
        match self
            .api
            .fetch::<OverviewResponse>(ApiRequest::get("dashboard/overview"))
            .await
        {
            Ok(res) => {
                let mut recent = res.recent;
                recent.truncate(RECENT_LIMIT);
                Ok(Overview {
                    user_name: res.user.map(|user| user.name),
                    totals: Totals::from_view(&res.totals)?,
                    recent,
                })
            }
            Err(LedgerError::NotFound(_)) => {
                tracing::debug!("no overview endpoint, reducing the ledger locally");
                self.reduce().await
            }
            Err(err) => Err(err),
        }
    }

    async fn reduce(&self) -> ResultLedger<Overview> {
        let mut transactions = ledger::fetch(&self.api, &LedgerQuery::default()).await?;
        let totals = Totals::from_ledger(&transactions)?;
        // Stable sort: same-day records keep server order.
        transactions.sort_by_key(|tx| Reverse(tx.date));
        transactions.truncate(RECENT_LIMIT);
        Ok(Overview {
            user_name: None,
            totals,
            recent: transactions,
        })
    }
}
