use crate::model::{Amount, Kind, Transaction};
use serde::Serialize;
use tracing::warn;

/// Figures derived from the transaction list. These are never stored.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Totals {
    pub balance: Amount,
    pub total_income: Amount,
    pub total_expense: Amount,
}

impl Totals {
    /// Sums the list in one pass. A sum that would overflow stops at the largest representable
    /// value and a warning is logged.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = Totals::default();
        let mut overflowed = false;
        for t in transactions {
            let value = t.value();
            match t.kind() {
                Kind::Income => {
                    overflowed |= totals.balance.checked_add(value).is_none()
                        || totals.total_income.checked_add(value).is_none();
                    totals.balance += value;
                    totals.total_income += value;
                }
                Kind::Expense => {
                    overflowed |= totals.balance.checked_sub(value).is_none()
                        || totals.total_expense.checked_add(value).is_none();
                    totals.balance -= value;
                    totals.total_expense += value;
                }
            }
        }
        if overflowed {
            warn!("The totals are too large to represent and have been capped");
        }
        totals
    }

    pub fn render(&self, visible: bool) -> String {
        format!(
            "Saldo total: {}\nEntradas: {}\nSaídas: {}",
            self.balance.render(visible),
            self.total_income.render(visible),
            self.total_expense.render(visible)
        )
    }
}
