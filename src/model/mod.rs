//! Types that represent the core data model, such as `Transaction` and `Categories`.
mod amount;
mod category;
mod draft;
mod totals;
mod transaction;

pub use amount::{Amount, MASK};
pub use category::{Categories, DEFAULT_SUGGESTIONS};
pub use draft::Draft;
pub(crate) use draft::Valid;
pub use totals::Totals;
pub use transaction::{Kind, Transaction};
