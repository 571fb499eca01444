pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The reasons a ledger mutation can be refused. A `Rejection` always means that nothing in the
/// ledger, in memory or in storage, was changed.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("A value is required")]
    EmptyValue,

    #[error("'{0}' is not a number")]
    InvalidValue(String),

    #[error("The value cannot be negative: {0}")]
    NegativeValue(String),

    #[error("The value is too large: {0}")]
    TooLarge(String),

    #[error("A category is required")]
    EmptyCategory,

    #[error("The category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("There is no category at position {0}")]
    NoSuchCategory(usize),
}
