use crate::commands::{open, saved, Out};
use crate::{Config, Result};

/// Flips whether monetary values are shown. The setting is saved and applies to every later
/// command until it is flipped again.
pub async fn visibility(config: Config) -> Result<Out<bool>> {
    let ledger = open(&config).await;
    let visible = ledger.toggle_visibility().await;
    saved(&ledger)?;
    let message = if visible {
        "Monetary values are now shown"
    } else {
        "Monetary values are now hidden"
    };
    Ok(Out::new(message, visible))
}
