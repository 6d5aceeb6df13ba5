#![allow(dead_code)]
#![allow(unused_imports)]

pub use playguard_test_utils::builders;
pub use playguard_test_utils::{init_tracing, settle, with_timeout};
