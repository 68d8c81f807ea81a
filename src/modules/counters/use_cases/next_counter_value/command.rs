use crate::modules::counters::core::counter_key::CounterKey;

/// Request to advance (or reset) one counter and read back its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextCounterValue {
    pub key: CounterKey,
    pub increment: i64,
    pub reset: bool,
}

impl NextCounterValue {
    pub fn new(key: CounterKey, increment: i64, reset: bool) -> Self {
        Self {
            key,
            increment,
            reset,
        }
    }

    /// Reads the current value without changing it.
    pub fn read(key: CounterKey) -> Self {
        Self::new(key, 0, false)
    }
}
