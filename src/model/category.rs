use crate::error::Rejection;
use serde::{Deserialize, Serialize};

/// Category names offered for autocomplete before the user has created any of their own.
pub const DEFAULT_SUGGESTIONS: &[&str] = &[];

/// The user's category labels in creation order. Names are unique, compared case-sensitively.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories {
    data: Vec<String>,
}

impl Categories {
    /// Builds the list from stored names, failing on the first empty or repeated name.
    pub fn new<S>(names: impl IntoIterator<Item = S>) -> Result<Self, Rejection>
    where
        S: Into<String>,
    {
        let mut categories = Self::default();
        for name in names {
            categories.add(name)?;
        }
        Ok(categories)
    }

    pub fn data(&self) -> &[String] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.data.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.iter().any(|c| c == name)
    }

    /// Appends `name` and returns its position.
    pub(crate) fn add(&mut self, name: impl Into<String>) -> Result<usize, Rejection> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Rejection::EmptyCategory);
        }
        if self.contains(&name) {
            return Err(Rejection::DuplicateCategory(name));
        }
        self.data.push(name);
        Ok(self.data.len() - 1)
    }

    /// Overwrites the name at `index` and returns the old one. Renaming a category to its own name
    /// is allowed; renaming it to the name of another one is not.
    pub(crate) fn rename(
        &mut self,
        index: usize,
        name: impl Into<String>,
    ) -> Result<String, Rejection> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Rejection::EmptyCategory);
        }
        if index >= self.data.len() {
            return Err(Rejection::NoSuchCategory(index));
        }
        let taken = self
            .data
            .iter()
            .enumerate()
            .any(|(ix, existing)| ix != index && *existing == name);
        if taken {
            return Err(Rejection::DuplicateCategory(name));
        }
        Ok(std::mem::replace(&mut self.data[index], name))
    }

    pub(crate) fn remove(&mut self, index: usize) -> Result<String, Rejection> {
        if index >= self.data.len() {
            return Err(Rejection::NoSuchCategory(index));
        }
        Ok(self.data.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }

    /// Autocomplete: every known name that contains `text`, ignoring case, in order and without
    /// repeats. Blank input suggests nothing.
    pub fn suggestions(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let needle = text.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        let candidates = DEFAULT_SUGGESTIONS
            .iter()
            .copied()
            .chain(self.data.iter().map(String::as_str));
        for candidate in candidates {
            if candidate.to_lowercase().contains(&needle) && !out.iter().any(|c| c == candidate) {
                out.push(candidate.to_string());
            }
        }
        out
    }
}
