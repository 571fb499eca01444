//! These structs provide the CLI interface for the myfinance CLI.

use crate::model::Kind;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// myfinance: A small personal ledger of income and expenses.
///
/// Every transaction has a category, an optional detail, a value and a direction (income or
/// expense). The balance, the income total and the expense total are derived from the list.
/// Monetary values are shown as Brazilian Real and can be masked with the visibility command.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty ledger.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/myfinance. Pass --home or set MYFINANCE_HOME to put it somewhere else.
    Init,
    /// Show the balance, the totals and every transaction, newest first.
    Show,
    /// Add a transaction.
    Add(AddArgs),
    /// Change a transaction. Options that are not given keep their current value.
    Edit(EditArgs),
    /// Delete a transaction. There is no undo.
    Delete(DeleteArgs),
    /// List, add, rename or delete categories.
    Category(CategoryArgs),
    /// List the categories that match some text, ignoring case.
    Suggest(SuggestArgs),
    /// Show or hide monetary values.
    Visibility,
    /// Delete every transaction and category. A backup is written first.
    Reset(ConfirmArgs),
    /// Write a JSON snapshot of the ledger to the backups directory.
    Backup,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the ledger and configuration are held. Defaults to ~/myfinance
    #[arg(long, env = "MYFINANCE_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `myfinance add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The amount, e.g. 12,50 or 12.50. Thousands separators are not allowed.
    #[arg(long, allow_hyphen_values = true)]
    value: String,

    /// The category label, e.g. Mercado.
    #[arg(long)]
    category: String,

    /// An optional note.
    #[arg(long, default_value = "")]
    detail: String,

    /// Whether the money came in or went out.
    #[arg(long = "type", value_enum, default_value_t = Kind::Expense)]
    kind: Kind,
}

impl AddArgs {
    pub fn new(
        value: impl Into<String>,
        category: impl Into<String>,
        detail: impl Into<String>,
        kind: Kind,
    ) -> Self {
        Self {
            value: value.into(),
            category: category.into(),
            detail: detail.into(),
            kind,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// Args for the `myfinance edit` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct EditArgs {
    /// The id of the transaction, as printed by `myfinance show`.
    id: String,

    #[arg(long, allow_hyphen_values = true)]
    value: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// The new note. Pass an empty string to remove it.
    #[arg(long)]
    detail: Option<String>,

    #[arg(long = "type", value_enum)]
    kind: Option<Kind>,
}

impl EditArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }
}

/// Args for the `myfinance delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction, as printed by `myfinance show`.
    id: String,

    #[clap(flatten)]
    confirm: ConfirmArgs,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>, yes: bool) -> Self {
        Self {
            id: id.into(),
            confirm: ConfirmArgs::new(yes),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn yes(&self) -> bool {
        self.confirm.yes()
    }
}

/// Destructive commands do nothing unless this is given.
#[derive(Debug, Default, Parser, Clone, Copy)]
pub struct ConfirmArgs {
    /// Confirm that you want to delete. There is no undo.
    #[arg(long)]
    yes: bool,
}

impl ConfirmArgs {
    pub fn new(yes: bool) -> Self {
        Self { yes }
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

/// Args for the `myfinance category` command.
#[derive(Debug, Parser, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    action: CategoryAction,
}

impl CategoryArgs {
    pub fn new(action: CategoryAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &CategoryAction {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryAction {
    /// List the categories with their positions.
    List,
    /// Add a category.
    Add {
        name: String,
    },
    /// Rename the category at a position. Transactions keep the old name.
    Rename {
        index: usize,
        name: String,
    },
    /// Delete the category at a position. Transactions keep its name.
    Delete {
        index: usize,
        #[clap(flatten)]
        confirm: ConfirmArgs,
    },
}

/// Args for the `myfinance suggest` command.
#[derive(Debug, Parser, Clone)]
pub struct SuggestArgs {
    text: String,
}

impl SuggestArgs {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("myfinance"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or MYFINANCE_HOME instead of relying on the default \
                myfinance home directory.",
            );
            PathBuf::from("myfinance")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
