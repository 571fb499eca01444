//! The stored JSON format.
//!
//! Version 1 wraps every collection in an envelope:
//!
//! ```json
//! { "schema_version": 1, "items": [ ... ] }
//! ```
//!
//! Version 0 is a bare JSON array, which is what the first release of the app wrote. It is still
//! read, and it is replaced by version 1 on the next write.
//!
//! Decoding is all-or-nothing. A payload that breaks any rule is reported as an error that names
//! the rule, and the caller falls back to an empty collection.

use crate::model::{Categories, Transaction};
use crate::Result;
use anyhow::{bail, ensure, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

pub(crate) const SCHEMA_VERSION: u64 = 1;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: u64,
    items: &'a T,
}

fn encode<T: Serialize>(items: &T) -> Result<String> {
    serde_json::to_string(&Envelope {
        schema_version: SCHEMA_VERSION,
        items,
    })
    .context("Unable to serialize the ledger")
}

pub(crate) fn encode_transactions(transactions: &[Transaction]) -> Result<String> {
    encode(&transactions)
}

pub(crate) fn encode_categories(categories: &Categories) -> Result<String> {
    encode(categories)
}

pub(crate) fn encode_visibility(visible: bool) -> Result<String> {
    serde_json::to_string(&visible).context("Unable to serialize the visibility flag")
}

/// Pulls the item list out of either schema version.
fn items<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value: Value = serde_json::from_str(raw).context("The stored value is not JSON")?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => {
            let version = map
                .get("schema_version")
                .and_then(Value::as_u64)
                .context("The stored value has no numeric schema_version")?;
            ensure!(
                version == SCHEMA_VERSION,
                "Unsupported schema_version {version}, expected {SCHEMA_VERSION}"
            );
            map.remove("items")
                .context("The stored value has no items")?
        }
        other => bail!("Expected a JSON array or object, found {other}"),
    };
    serde_json::from_value(items).context("The stored items do not match the schema")
}

pub(crate) fn decode_transactions(raw: &str) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = items(raw)?;
    let mut seen = HashSet::new();
    for (ix, t) in transactions.iter().enumerate() {
        ensure!(
            seen.insert(t.id()),
            "Transaction id '{}' appears more than once (item {ix})",
            t.id()
        );
        ensure!(
            !t.value().is_negative(),
            "Transaction '{}' has a negative value",
            t.id()
        );
        ensure!(
            !t.value().exceeds_limit(),
            "Transaction '{}' has a value that is too large",
            t.id()
        );
    }
    Ok(transactions)
}

pub(crate) fn decode_categories(raw: &str) -> Result<Categories> {
    let names: Vec<String> = items(raw)?;
    Categories::new(names).context("The stored categories are not a set of names")
}

pub(crate) fn decode_visibility(raw: &str) -> Result<bool> {
    serde_json::from_str(raw).context("The stored visibility flag is not a boolean")
}
