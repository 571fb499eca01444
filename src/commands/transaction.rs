//! Transaction command handlers.

use crate::args::{AddArgs, DeleteArgs, EditArgs};
use crate::commands::{open, saved, Out};
use crate::model::{Draft, Transaction};
use crate::{Config, Result};
use anyhow::{bail, Context};

/// Adds a transaction to the top of the list.
///
/// # Errors
///
/// - Returns an error if the value is missing, not a number or negative, or if the category is
///   blank. Nothing is saved in that case.
pub async fn add(config: Config, args: AddArgs) -> Result<Out<Transaction>> {
    let ledger = open(&config).await;
    let draft = Draft::new(args.value(), args.category(), args.detail(), args.kind());
    let added = ledger
        .add_transaction(&draft)
        .await
        .context("The transaction was not added")?;
    saved(&ledger)?;
    let totals = ledger.totals().await;
    let visible = ledger.is_visible().await;
    let message = format!(
        "Added {}\nSaldo total: {}",
        added.render(visible),
        totals.balance.render(visible)
    );
    Ok(Out::new(message, added))
}

/// Edits the transaction with the given id. It keeps its id, its date and time, and its place in
/// the list. Fields that are not given keep their current value.
///
/// # Errors
///
/// - Returns an error if there is no transaction with the id.
/// - Returns an error if the edited values do not validate. Nothing is saved in that case.
pub async fn edit(config: Config, args: EditArgs) -> Result<Out<Transaction>> {
    let ledger = open(&config).await;
    let Some(mut draft) = ledger.begin_edit(args.id()).await else {
        bail!("There is no transaction with id '{}'", args.id());
    };
    if let Some(value) = args.value() {
        draft.value = value.to_string();
    }
    if let Some(category) = args.category() {
        draft.description = category.to_string();
    }
    if let Some(detail) = args.detail() {
        draft.detail = detail.to_string();
    }
    if let Some(kind) = args.kind() {
        draft.kind = kind;
    }
    ledger.set_draft(draft).await;

    let updated = ledger
        .submit_draft()
        .await
        .context("The transaction was not changed")?
        .with_context(|| format!("The transaction '{}' disappeared while editing", args.id()))?;
    saved(&ledger)?;
    let visible = ledger.is_visible().await;
    Ok(Out::new(
        format!("Updated {}", updated.render(visible)),
        updated,
    ))
}

/// Deletes the transaction with the given id. Refuses unless `--yes` was given.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<Transaction>> {
    if !args.yes() {
        bail!(
            "Deleting a transaction cannot be undone. Run the command again with --yes to delete \
            '{}'",
            args.id()
        );
    }
    let ledger = open(&config).await;
    let Some(removed) = ledger.delete_transaction(args.id()).await else {
        bail!("There is no transaction with id '{}'", args.id());
    };
    saved(&ledger)?;
    let visible = ledger.is_visible().await;
    Ok(Out::new(
        format!("Deleted {}", removed.render(visible)),
        removed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Kind;
    use crate::test::{FailingStore, TestEnv};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add() {
        let env = TestEnv::new().await;
        let out = add(env.config(), AddArgs::new("50", "Salário", "", Kind::Income))
            .await
            .unwrap();
        assert!(out.message().contains("Saldo total: R$ 50,00"), "{}", out.message());
        let added = out.structure().unwrap();
        assert_eq!(env.ledger().await.transactions().await, vec![added.clone()]);
    }

    #[tokio::test]
    async fn test_add_rejected() {
        let env = TestEnv::new().await;
        let err = add(env.config(), AddArgs::new("abc", "Pix", "", Kind::Expense))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("'abc' is not a number"));
        assert!(env.ledger().await.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_fails_when_not_saved() {
        let env = TestEnv::new().await;
        let config = env.config().with_store(Arc::new(FailingStore));
        let err = add(config, AddArgs::new("50", "Salário", "", Kind::Income))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("could not be saved"), "{err:#}");
        assert!(env.ledger().await.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit() {
        let env = TestEnv::new().await;
        let added = add(env.config(), AddArgs::new("20", "Mercado", "feira", Kind::Expense))
            .await
            .unwrap();
        let id = added.structure().unwrap().id().to_string();
        add(env.config(), AddArgs::new("100", "Salário", "", Kind::Income))
            .await
            .unwrap();

        let out = edit(env.config(), EditArgs::new(&id).with_value("35").with_detail(""))
            .await
            .unwrap();
        let updated = out.structure().unwrap();
        assert_eq!(updated.id(), id);
        assert_eq!(updated.description(), "Mercado");
        assert_eq!(updated.detail(), None);

        let ledger = env.ledger().await;
        assert_eq!(ledger.transactions().await[1], *updated);
        assert_eq!(ledger.totals().await.balance.to_string(), "R$ 65,00");
    }

    #[tokio::test]
    async fn test_edit_kind_and_category() {
        let env = TestEnv::new().await;
        let added = add(env.config(), AddArgs::new("20", "Mercado", "", Kind::Expense))
            .await
            .unwrap();
        let id = added.structure().unwrap().id().to_string();
        let out = edit(
            env.config(),
            EditArgs::new(&id).with_kind(Kind::Income).with_category("Reembolso"),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().kind(), Kind::Income);
        assert_eq!(out.structure().unwrap().description(), "Reembolso");
    }

    #[tokio::test]
    async fn test_edit_missing() {
        let env = TestEnv::new().await;
        let err = edit(env.config(), EditArgs::new("404").with_value("1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no transaction with id '404'"));
    }

    #[tokio::test]
    async fn test_delete_requires_yes() {
        let env = TestEnv::new().await;
        let added = add(env.config(), AddArgs::new("1", "Pix", "", Kind::Income))
            .await
            .unwrap();
        let id = added.structure().unwrap().id().to_string();

        let err = delete(env.config(), DeleteArgs::new(&id, false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert_eq!(env.ledger().await.transactions().await.len(), 1);

        delete(env.config(), DeleteArgs::new(&id, true)).await.unwrap();
        assert!(env.ledger().await.transactions().await.is_empty());
        assert!(delete(env.config(), DeleteArgs::new(&id, true)).await.is_err());
    }
}
