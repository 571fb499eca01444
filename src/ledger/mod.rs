//! The ledger store: transactions, categories and the figures derived from them.
//!
//! A `Ledger` is a cheap handle. Clone it and hand it to whatever presents the data; every clone
//! talks to the same state. All mutations go through the methods here, and each one persists the
//! whole affected collection before it returns.
//!
//! Persistence failures never fail a mutation. They are logged, the in-memory state stays the
//! truth for the rest of the session, and `check_saved` reports them to callers that are about to
//! throw the in-memory state away. The only errors a mutation returns are `Rejection`s, and a
//! `Rejection` means nothing changed.
//!
//! A stored value that cannot be decoded is copied to its set-aside key (see `set_aside_key`)
//! before anything can overwrite it. If that copy fails too, the key is held: nothing is written
//! to it for the rest of the session.

mod schema;

use crate::error::Rejection;
use crate::model::{Categories, Draft, Totals, Transaction};
use crate::store::{
    Commit, KeyValueStore, Pending, WriteQueue, CATEGORIES_KEY, TRANSACTIONS_KEY,
    VISIBILITY_KEY,
};
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard as SyncMutexGuard};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const SET_ASIDE_SUFFIX: &str = ":unreadable";

/// Where the undecodable value found under `key` is copied to.
pub fn set_aside_key(key: &str) -> String {
    format!("{key}{SET_ASIDE_SUFFIX}")
}

/// Supplies the current local time.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// What became of a call to `Ledger::load`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Load {
    /// The stored data replaced the in-memory state.
    Applied,
    /// The ledger changed, or still had writes on their way to the store, while the store was
    /// being read. What was read may be stale and was thrown away.
    Discarded,
}

/// What `Ledger::read` found under a key.
enum Stored<T> {
    Found(T),
    /// Nothing usable, and the key may be written.
    Empty,
    /// Nothing usable, and writing the key could destroy data.
    Held,
}

/// A copy of everything the ledger persists.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub categories: Categories,
    pub visible: bool,
}

impl Snapshot {
    pub fn totals(&self) -> Totals {
        Totals::from_transactions(&self.transactions)
    }
}

#[derive(Clone)]
pub struct Ledger {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    queue: WriteQueue,
    store: Arc<dyn KeyValueStore>,
    /// Bumped whenever a mutation is staged and again when its writes have finished.
    epoch: AtomicU64,
    /// Keys whose newest change did not reach the store.
    unsaved: SyncMutex<BTreeSet<String>>,
    clock: Clock,
}

struct State {
    transactions: Vec<Transaction>,
    categories: Categories,
    visible: bool,
    totals: Totals,
    draft: Draft,
    editing: Option<String>,
    editing_category: Option<usize>,
    held: BTreeSet<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            categories: Categories::default(),
            visible: true,
            totals: Totals::default(),
            draft: Draft::default(),
            editing: None,
            editing_category: None,
            held: BTreeSet::new(),
        }
    }
}

impl State {
    fn recalculate(&mut self) -> Totals {
        self.totals = Totals::from_transactions(&self.transactions);
        self.totals
    }

    /// Empties the input fields. The income/expense selector keeps its position.
    fn clear_draft(&mut self) {
        self.draft = Draft {
            kind: self.draft.kind,
            ..Draft::default()
        };
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.transactions.iter().position(|t| t.id() == id)
    }

    /// Milliseconds since the epoch, moved forward until no existing transaction has it.
    fn next_id(&self, now: DateTime<Local>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = millis.to_string();
            if self.position(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }
}

impl<T: Default> Stored<T> {
    fn is_held(&self) -> bool {
        matches!(self, Stored::Held)
    }

    fn or(self, fallback: T) -> T {
        match self {
            Stored::Found(value) => value,
            Stored::Empty | Stored::Held => fallback,
        }
    }

    fn or_default(self) -> T {
        self.or(T::default())
    }
}

impl Ledger {
    /// Creates an empty ledger over `store`. Call `load` to read what is already stored.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(Local::now))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                queue: WriteQueue::new(Arc::clone(&store)),
                store,
                epoch: AtomicU64::new(0),
                unsaved: SyncMutex::new(BTreeSet::new()),
                clock,
            }),
        }
    }

    /// Reads transactions, categories and the visibility flag, each from its own key, and replaces
    /// the in-memory state with them. Anything missing or unreadable becomes empty (or visible),
    /// with a log message saying why. The edit session is left alone.
    ///
    /// The result is thrown away if a mutation was staged, or a write was still in flight, at any
    /// point while the store was being read.
    pub async fn load(&self) -> Load {
        let started = self.inner.epoch.load(Ordering::SeqCst);
        let busy = self.inner.queue.in_flight() > 0;

        let transactions = self
            .read(TRANSACTIONS_KEY, schema::decode_transactions)
            .await;
        let categories = self.read(CATEGORIES_KEY, schema::decode_categories).await;
        let visible = self.read(VISIBILITY_KEY, schema::decode_visibility).await;

        let mut state = self.inner.state.lock().await;
        for (key, held) in [
            (TRANSACTIONS_KEY, transactions.is_held()),
            (CATEGORIES_KEY, categories.is_held()),
            (VISIBILITY_KEY, visible.is_held()),
        ] {
            if held {
                warn!("Changes to {key} will not be saved until it can be read");
                state.held.insert(key.to_string());
            } else {
                state.held.remove(key);
            }
        }
        if busy
            || self.inner.queue.in_flight() > 0
            || self.inner.epoch.load(Ordering::SeqCst) != started
        {
            debug!("The ledger changed during load, keeping the newer in-memory state");
            return Load::Discarded;
        }
        state.transactions = transactions.or_default();
        state.categories = categories.or_default();
        state.visible = visible.or(true);
        let totals = state.recalculate();
        debug!(
            "Loaded {} transactions and {} categories, balance {}",
            state.transactions.len(),
            state.categories.len(),
            totals.balance
        );
        Load::Applied
    }

    async fn read<T>(&self, key: &str, decode: fn(&str) -> Result<T>) -> Stored<T> {
        match self.inner.store.get(key).await {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(value) => Stored::Found(value),
                Err(e) => {
                    warn!("Ignoring the stored value of {key}: {e:#}");
                    self.set_aside(key, &raw).await
                }
            },
            Ok(None) => {
                debug!("Nothing is stored under {key}");
                Stored::Empty
            }
            Err(e) => {
                warn!("Unable to read {key}: {e:#}");
                Stored::Held
            }
        }
    }

    /// Copies an undecodable value to where the next write of `key` cannot reach it.
    async fn set_aside<T>(&self, key: &str, raw: &str) -> Stored<T> {
        let aside = set_aside_key(key);
        match self.inner.store.set(&aside, raw).await {
            Ok(()) => {
                warn!("Copied the stored value of {key} to {aside}");
                Stored::Empty
            }
            Err(e) => {
                warn!("Unable to copy the stored value of {key} to {aside}: {e:#}");
                Stored::Held
            }
        }
    }

    /// Takes the state lock for a mutation. Everything staged while it is held is ordered after
    /// every earlier mutation.
    async fn begin(&self) -> MutexGuard<'_, State> {
        let state = self.inner.state.lock().await;
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        state
    }

    fn stage_transactions(&self, state: &State) -> Option<Pending> {
        self.stage(
            state,
            TRANSACTIONS_KEY,
            schema::encode_transactions(&state.transactions),
        )
    }

    fn stage_categories(&self, state: &State) -> Option<Pending> {
        self.stage(
            state,
            CATEGORIES_KEY,
            schema::encode_categories(&state.categories),
        )
    }

    fn stage(&self, state: &State, key: &str, encoded: Result<String>) -> Option<Pending> {
        if !self.writable(state, key) {
            return None;
        }
        match encoded {
            Ok(value) => Some(self.inner.queue.stage_set(key, value)),
            Err(e) => {
                warn!("Not saving {key}: {e:#}");
                self.unsaved().insert(key.to_string());
                None
            }
        }
    }

    fn stage_remove(&self, state: &State, key: &str) -> Option<Pending> {
        self.writable(state, key)
            .then(|| self.inner.queue.stage_remove(key))
    }

    fn writable(&self, state: &State, key: &str) -> bool {
        if state.held.contains(key) {
            warn!("Not saving {key}: its stored value could not be read");
            self.unsaved().insert(key.to_string());
            return false;
        }
        true
    }

    fn unsaved(&self) -> SyncMutexGuard<'_, BTreeSet<String>> {
        self.inner.unsaved.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sends staged writes to the store. Must be called after the state lock is released.
    async fn persist(&self, pending: impl IntoIterator<Item = Option<Pending>>) {
        for p in pending.into_iter().flatten() {
            let key = p.key().to_string();
            match p.commit().await {
                Commit::Written => {
                    self.unsaved().remove(&key);
                }
                Commit::Failed => {
                    warn!("The change is kept in memory but has not been saved");
                    self.unsaved().insert(key);
                }
                Commit::Superseded => {}
            }
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Fails if the newest change to any key has not reached the store, naming those keys. Call it
    /// before dropping the last handle to a ledger whose changes must outlive it.
    pub fn check_saved(&self) -> Result<()> {
        let unsaved = self.unsaved();
        if unsaved.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = unsaved.iter().map(String::as_str).collect();
        bail!("Changes to {} were not saved", keys.join(", "))
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.inner.state.lock().await.transactions.clone()
    }

    pub async fn transaction(&self, id: &str) -> Option<Transaction> {
        let state = self.inner.state.lock().await;
        state.position(id).map(|ix| state.transactions[ix].clone())
    }

    pub async fn categories(&self) -> Categories {
        self.inner.state.lock().await.categories.clone()
    }

    /// The totals as of the last change.
    pub async fn totals(&self) -> Totals {
        self.inner.state.lock().await.totals
    }

    /// Recomputes balance, income and expense from the transaction list in one pass.
    pub async fn recalculate_totals(&self) -> Totals {
        self.inner.state.lock().await.recalculate()
    }

    pub async fn is_visible(&self) -> bool {
        self.inner.state.lock().await.visible
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock().await;
        Snapshot {
            transactions: state.transactions.clone(),
            categories: state.categories.clone(),
            visible: state.visible,
        }
    }

    /// Validates `draft` and puts a new transaction at the top of the list.
    pub async fn add_transaction(&self, draft: &Draft) -> Result<Transaction, Rejection> {
        let input = draft.validate()?;
        let now = (self.inner.clock)();
        let (transaction, pending) = {
            let mut state = self.begin().await;
            let id = state.next_id(now);
            let transaction = Transaction::create(id, input, now);
            state.transactions.insert(0, transaction.clone());
            state.recalculate();
            state.clear_draft();
            (transaction, self.stage_transactions(&state))
        };
        self.persist([pending]).await;
        debug!("Added transaction {}", transaction.id());
        Ok(transaction)
    }

    /// Validates `draft` and writes it over the transaction with `id`, which keeps its place in the
    /// list and its original date and time. Returns `Ok(None)` if there is no such transaction.
    pub async fn update_transaction(
        &self,
        id: &str,
        draft: &Draft,
    ) -> Result<Option<Transaction>, Rejection> {
        let input = draft.validate()?;
        let (updated, pending) = {
            let mut state = self.begin().await;
            let Some(ix) = state.position(id) else {
                debug!("No transaction with id {id} to update");
                return Ok(None);
            };
            state.transactions[ix].apply(input);
            let updated = state.transactions[ix].clone();
            state.recalculate();
            if state.editing.as_deref() == Some(id) {
                state.editing = None;
                state.clear_draft();
            }
            (updated, self.stage_transactions(&state))
        };
        self.persist([pending]).await;
        debug!("Updated transaction {id}");
        Ok(Some(updated))
    }

    /// Removes the transaction with `id`. Ask the user first: there is no undo. If it was being
    /// edited, the edit is abandoned.
    pub async fn delete_transaction(&self, id: &str) -> Option<Transaction> {
        let (removed, pending) = {
            let mut state = self.begin().await;
            let ix = state.position(id)?;
            let removed = state.transactions.remove(ix);
            state.recalculate();
            if state.editing.as_deref() == Some(id) {
                state.editing = None;
                state.clear_draft();
            }
            (removed, self.stage_transactions(&state))
        };
        self.persist([pending]).await;
        debug!("Deleted transaction {id}");
        Some(removed)
    }

    pub async fn draft(&self) -> Draft {
        self.inner.state.lock().await.draft.clone()
    }

    pub async fn set_draft(&self, draft: Draft) {
        self.inner.state.lock().await.draft = draft;
    }

    /// The id of the transaction being edited, if any.
    pub async fn editing(&self) -> Option<String> {
        self.inner.state.lock().await.editing.clone()
    }

    /// Starts editing the transaction with `id` by copying it into the draft.
    pub async fn begin_edit(&self, id: &str) -> Option<Draft> {
        let mut state = self.inner.state.lock().await;
        let ix = state.position(id)?;
        let draft = state.transactions[ix].to_draft();
        state.draft = draft.clone();
        state.editing = Some(id.to_string());
        Some(draft)
    }

    pub async fn cancel_edit(&self) {
        let mut state = self.inner.state.lock().await;
        state.editing = None;
        state.clear_draft();
    }

    /// The save button: updates the transaction being edited, or adds a new one when nothing is
    /// being edited. `Ok(None)` means the edited transaction no longer exists.
    pub async fn submit_draft(&self) -> Result<Option<Transaction>, Rejection> {
        let (draft, editing) = {
            let state = self.inner.state.lock().await;
            (state.draft.clone(), state.editing.clone())
        };
        match editing {
            Some(id) => {
                let updated = self.update_transaction(&id, &draft).await?;
                if updated.is_none() {
                    self.cancel_edit().await;
                }
                Ok(updated)
            }
            None => self.add_transaction(&draft).await.map(Some),
        }
    }

    /// Appends a category and returns its position.
    pub async fn add_category(&self, name: &str) -> Result<usize, Rejection> {
        let (ix, pending) = {
            let mut state = self.begin().await;
            let ix = state.categories.add(name)?;
            (ix, self.stage_categories(&state))
        };
        self.persist([pending]).await;
        debug!("Added category '{name}'");
        Ok(ix)
    }

    /// Renames the category at `index` and returns the old name. Transactions that carry the old
    /// name are not touched.
    pub async fn update_category_at(&self, index: usize, name: &str) -> Result<String, Rejection> {
        let (old, pending) = {
            let mut state = self.begin().await;
            let old = state.categories.rename(index, name)?;
            (old, self.stage_categories(&state))
        };
        self.persist([pending]).await;
        debug!("Renamed category '{old}' to '{name}'");
        Ok(old)
    }

    /// Removes the category at `index` and returns its name. Ask the user first. Transactions
    /// that carry the name keep it.
    pub async fn delete_category_at(&self, index: usize) -> Result<String, Rejection> {
        let (removed, pending) = {
            let mut state = self.begin().await;
            let removed = state.categories.remove(index)?;
            state.editing_category = match state.editing_category {
                Some(e) if e == index => None,
                Some(e) if e > index => Some(e - 1),
                other => other,
            };
            (removed, self.stage_categories(&state))
        };
        self.persist([pending]).await;
        debug!("Deleted category '{removed}'");
        Ok(removed)
    }

    pub async fn editing_category(&self) -> Option<usize> {
        self.inner.state.lock().await.editing_category
    }

    /// Starts editing the category at `index` and returns its current name.
    pub async fn begin_category_edit(&self, index: usize) -> Option<String> {
        let mut state = self.inner.state.lock().await;
        let name = state.categories.get(index)?.to_string();
        state.editing_category = Some(index);
        Some(name)
    }

    pub async fn cancel_category_edit(&self) {
        self.inner.state.lock().await.editing_category = None;
    }

    /// The category form's save button: renames the category being edited, or adds `name` when
    /// none is. Returns the position of the saved category.
    pub async fn submit_category(&self, name: &str) -> Result<usize, Rejection> {
        let editing = self.editing_category().await;
        match editing {
            Some(ix) => {
                self.update_category_at(ix, name).await?;
                self.cancel_category_edit().await;
                Ok(ix)
            }
            None => self.add_category(name).await,
        }
    }

    /// Case-insensitive autocomplete over the known categories.
    pub async fn filter_suggestions(&self, text: &str) -> Vec<String> {
        self.inner.state.lock().await.categories.suggestions(text)
    }

    /// Flips whether monetary values are shown and saves the new setting. Returns it.
    pub async fn toggle_visibility(&self) -> bool {
        let (visible, pending) = {
            let mut state = self.begin().await;
            state.visible = !state.visible;
            let pending = self.stage(
                &state,
                VISIBILITY_KEY,
                schema::encode_visibility(state.visible),
            );
            (state.visible, pending)
        };
        self.persist([pending]).await;
        visible
    }

    /// Deletes every transaction and category, in memory and in storage. Ask the user first:
    /// there is no undo. The visibility setting is kept.
    pub async fn reset_all(&self) {
        let pending = {
            let mut state = self.begin().await;
            state.transactions.clear();
            state.categories.clear();
            state.recalculate();
            state.editing = None;
            state.editing_category = None;
            state.clear_draft();
            [
                self.stage_remove(&state, TRANSACTIONS_KEY),
                self.stage_remove(&state, CATEGORIES_KEY),
            ]
        };
        self.persist(pending).await;
        info!("Deleted all transactions and categories");
    }
}
