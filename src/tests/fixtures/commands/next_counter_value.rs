// Shared test fixture for the NextCounterValue command.
// Compiled into the crate only during tests (cfg(test) in src/lib.rs).

use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::use_cases::next_counter_value::command::NextCounterValue;
use serde::Deserialize;

const FIXTURE: &str = include_str!("json/next_counter_value.json");

// JSON -> DTO (transport shape)
#[derive(Debug, Clone, Deserialize)]
pub struct NextCounterValueDto {
    pub owner_id: String,
    pub name: String,
    pub increment: i64,
    pub reset: bool,
}

pub struct NextCounterValueBuilder {
    owner_id: String,
    name: String,
    increment: i64,
    reset: bool,
}

impl Default for NextCounterValueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl NextCounterValueBuilder {
    pub fn new() -> Self {
        let dto: NextCounterValueDto = serde_json::from_str(FIXTURE).unwrap();
        Self {
            owner_id: dto.owner_id,
            name: dto.name,
            increment: dto.increment,
            reset: dto.reset,
        }
    }

    pub fn owner_id(mut self, v: impl Into<String>) -> Self {
        self.owner_id = v.into();
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = v.into();
        self
    }

    pub fn increment(mut self, v: i64) -> Self {
        self.increment = v;
        self
    }

    pub fn reset(mut self, v: bool) -> Self {
        self.reset = v;
        self
    }

    pub fn build(self) -> NextCounterValue {
        NextCounterValue::new(
            CounterKey::new(self.owner_id, self.name).unwrap(),
            self.increment,
            self.reset,
        )
    }
}

#[cfg(test)]
mod next_counter_value_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = NextCounterValueBuilder::default().build();
        assert_eq!(built.key.owner_id(), "owner-fixed-0001");
        assert_eq!(built.key.name(), "orders");
        assert_eq!(built.increment, 1);
        assert!(!built.reset);
    }

    #[rstest]
    fn setters_override_all_fields() {
        let built = NextCounterValueBuilder::new()
            .owner_id("Tester")
            .name("Visits")
            .increment(9)
            .reset(true)
            .build();
        assert_eq!(built.key.owner_id(), "tester");
        assert_eq!(built.key.name(), "visits");
        assert_eq!(built.increment, 9);
        assert!(built.reset);
    }
}
