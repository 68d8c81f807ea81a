use crate::modules::counters::core::counter_record::{CounterRecord, Version};
use crate::modules::counters::use_cases::next_counter_value::command::NextCounterValue;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("count value must be a positive integer: \"{0}\"")]
    NegativeIncrement(i64),

    #[error("counter value {current} cannot be increased by {increment}")]
    Overflow { current: i64, increment: i64 },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// No record exists yet; create one holding `value`.
    Insert { value: i64 },
    /// Overwrite the record, but only if it still carries `expected_version`.
    Replace {
        value: i64,
        expected_version: Version,
    },
    /// The stored value already is the answer; nothing to write.
    Unchanged { value: i64 },
    Rejected { reason: DecideError },
}

pub fn validate_increment(increment: i64) -> Result<(), DecideError> {
    if increment < 0 {
        return Err(DecideError::NegativeIncrement(increment));
    }
    Ok(())
}

/// Computes the write needed to apply `command` on top of `current`.
///
/// Pure: called once per attempt with whatever state that attempt read.
pub fn decide(current: Option<&CounterRecord>, command: &NextCounterValue) -> Decision {
    if let Err(reason) = validate_increment(command.increment) {
        return Decision::Rejected { reason };
    }

    let Some(record) = current else {
        return Decision::Insert {
            value: command.increment,
        };
    };

    let base = if command.reset { 0 } else { record.value };
    let Some(value) = base.checked_add(command.increment) else {
        return Decision::Rejected {
            reason: DecideError::Overflow {
                current: base,
                increment: command.increment,
            },
        };
    };

    if value == record.value {
        return Decision::Unchanged { value };
    }

    Decision::Replace {
        value,
        expected_version: record.version.clone(),
    }
}
