use crate::commands::{open, plural, Out};
use crate::model::{Totals, Transaction};
use crate::{Config, Result};
use serde::Serialize;

/// What `show` reports.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub visible: bool,
    pub totals: Totals,
    pub transactions: Vec<Transaction>,
}

/// Shows the totals followed by every transaction, newest first. Monetary values are masked when
/// visibility is off.
pub async fn show(config: Config) -> Result<Out<Overview>> {
    let ledger = open(&config).await;
    let visible = ledger.is_visible().await;
    let totals = ledger.recalculate_totals().await;
    let transactions = ledger.transactions().await;

    let mut message = totals.render(visible);
    message.push('\n');
    if transactions.is_empty() {
        message.push_str("Nenhuma transação registrada");
    } else {
        message.push_str(&plural(transactions.len(), "transação", "transações"));
        for t in &transactions {
            message.push('\n');
            message.push_str(&t.render(visible));
        }
    }

    let overview = Overview {
        visible,
        totals,
        transactions,
    };
    Ok(Out::new(message, overview))
}
