//! Prelude module - commonly used test helpers.
//!
//! Use `use tidings_test::prelude::*;` in test modules.

pub use crate::fixtures::{CloneCounter, PanicOnClone};
pub use crate::harness::{
    DEFAULT_TIMEOUT, completes_within, eventually, expect_closed, expect_value, init_test_tracing,
    recv_within,
};
