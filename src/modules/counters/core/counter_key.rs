use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CounterKeyError {
    #[error("The name parameter must be present")]
    MissingName,

    #[error("The owner identity must be present")]
    MissingOwner,
}

/// Identity of one counter: the owning caller plus the counter name.
///
/// Both parts are lowercased on construction, so `("Alice", "Hits")` and
/// `("alice", "hits")` address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    owner_id: String,
    name: String,
}

impl CounterKey {
    pub fn new(owner_id: impl AsRef<str>, name: impl AsRef<str>) -> Result<Self, CounterKeyError> {
        let owner_id = owner_id.as_ref();
        let name = name.as_ref();
        if name.trim().is_empty() {
            return Err(CounterKeyError::MissingName);
        }
        if owner_id.trim().is_empty() {
            return Err(CounterKeyError::MissingOwner);
        }
        Ok(Self {
            owner_id: owner_id.to_lowercase(),
            name: name.to_lowercase(),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_id, self.name)
    }
}
