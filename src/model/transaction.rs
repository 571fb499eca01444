use crate::model::{Amount, Draft, Valid};
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// Whether a transaction brings money in or takes it out.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Income,
    #[default]
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

/// A single ledger entry.
///
/// The field called `description` holds the category label. The name is kept because it is also
/// the name of the field in the stored JSON.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    id: String,
    description: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    detail: Option<String>,
    value: Amount,
    #[serde(rename = "type")]
    kind: Kind,
    date: String,
    time: String,
}

impl Transaction {
    /// Creates a transaction from validated input, stamping `date` and `time` from `now`.
    pub(crate) fn create(id: String, input: Valid, now: DateTime<Local>) -> Self {
        Self {
            id,
            description: input.description,
            detail: input.detail,
            value: input.value,
            kind: input.kind,
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
        }
    }

    /// Replaces everything a person can edit. `id`, `date` and `time` are left alone.
    pub(crate) fn apply(&mut self, input: Valid) {
        self.description = input.description;
        self.detail = input.detail;
        self.value = input.value;
        self.kind = input.kind;
    }

    /// Fills an input draft with the values of this transaction, which is how editing starts.
    pub fn to_draft(&self) -> Draft {
        Draft {
            value: self.value.value().to_string(),
            description: self.description.clone(),
            detail: self.detail.clone().unwrap_or_default(),
            kind: self.kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The category label.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// One line for a list: direction, category, optional detail, timestamp and amount.
    pub fn render(&self, visible: bool) -> String {
        let sign = match self.kind {
            Kind::Income => "+",
            Kind::Expense => "-",
        };
        let detail = match self.detail() {
            Some(d) => format!(" ({d})"),
            None => String::new(),
        };
        format!(
            "[{}] {}{} {} às {} {sign} {}",
            self.id,
            self.description,
            detail,
            self.date,
            self.time,
            self.value.render(visible)
        )
    }
}

/// The first version of the app stored an empty string when no detail was typed.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let detail: Option<String> = Option::deserialize(deserializer)?;
    Ok(detail.filter(|d| !d.trim().is_empty()))
}

/// `dd/mm/yyyy`, as `toLocaleDateString('pt-BR')` renders it.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// `HH:MM` on a 24 hour clock.
const TIME_FORMAT: &str = "%H:%M";
