pub mod shared {
    pub mod inbound {
        pub mod caller_identity;
    }
}

pub mod modules {
    pub mod counters {
        pub mod core {
            pub mod counter_key;
            pub mod counter_record;
            pub mod decide;
        }
        pub mod use_cases {
            pub mod next_counter_value {
                pub mod command;
                pub mod handler;
                pub mod retry_policy;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod counter_store;
                pub mod counter_store_in_memory;
                pub mod counter_store_sqlite;
            }
        }
    }
}

pub mod shell;
