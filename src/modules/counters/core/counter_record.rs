use crate::modules::counters::core::counter_key::CounterKey;
use std::fmt;
use uuid::Uuid;

/// Opaque concurrency token assigned to every committed write.
///
/// Only ever compared for equality; the engine never interprets its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// A token no previous write of any record has used.
    pub fn fresh() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Version {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRecord {
    pub key: CounterKey,
    pub value: i64,
    pub version: Version,
}

impl CounterRecord {
    pub fn new(key: CounterKey, value: i64, version: Version) -> Self {
        Self {
            key,
            value,
            version,
        }
    }
}
