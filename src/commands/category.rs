//! Category command handlers.

use crate::args::{CategoryAction, CategoryArgs, SuggestArgs};
use crate::commands::{open, plural, saved, Out};
use crate::model::Categories;
use crate::{Config, Result};
use anyhow::{bail, Context};

/// Lists, adds, renames or deletes categories. Renaming or deleting a category does not change the
/// transactions that carry its name.
///
/// # Returns
///
/// The categories as they are after the action.
pub async fn category(config: Config, args: CategoryArgs) -> Result<Out<Categories>> {
    let ledger = open(&config).await;
    let message = match args.action() {
        CategoryAction::List => {
            let categories = ledger.categories().await;
            let mut message = plural(categories.len(), "category", "categories");
            for (ix, name) in categories.data().iter().enumerate() {
                message.push_str(&format!("\n{ix}: {name}"));
            }
            message
        }
        CategoryAction::Add { name } => {
            let ix = ledger
                .add_category(name)
                .await
                .context("The category was not added")?;
            format!("Added category {ix}: {name}")
        }
        CategoryAction::Rename { index, name } => {
            let old = ledger
                .update_category_at(*index, name)
                .await
                .context("The category was not renamed")?;
            format!("Renamed category {index} from {old} to {name}")
        }
        CategoryAction::Delete { index, confirm } => {
            if !confirm.yes() {
                bail!(
                    "Deleting a category cannot be undone. Run the command again with --yes to \
                    delete category {index}"
                );
            }
            let removed = ledger
                .delete_category_at(*index)
                .await
                .context("The category was not deleted")?;
            format!("Deleted category {index}: {removed}")
        }
    };
    saved(&ledger)?;
    Ok(Out::new(message, ledger.categories().await))
}

/// Lists the known categories that contain `text`, ignoring case.
pub async fn suggest(config: Config, args: SuggestArgs) -> Result<Out<Vec<String>>> {
    let ledger = open(&config).await;
    let suggestions = ledger.filter_suggestions(args.text()).await;
    let mut message = plural(suggestions.len(), "suggestion", "suggestions");
    for s in &suggestions {
        message.push('\n');
        message.push_str(s);
    }
    Ok(Out::new(message, suggestions))
}
