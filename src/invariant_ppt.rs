//! Runtime invariants with contract tracking
//!
//! Parameter code states its invariants with [`assert_invariant!`](crate::assert_invariant).
//! Every check is recorded in a per-thread log so tests can prove that an
//! operation actually exercised the invariant it is supposed to uphold,
//! not merely that it happened not to break it.
//!
//! ```rust,ignore
//! use camera_explorer::invariant_ppt::*;
//!
//! assert_invariant!(
//!     !modifiable || supported,
//!     "Modifiable parameter must be supported",
//!     "Flash mode"
//! );
//!
//! #[test]
//! fn contract_refresh() {
//!     clear_invariant_log();
//!     parameter.refresh();
//!     contract_test("refresh", &["Modifiable parameter must be supported"]);
//! }
//! ```
//!
//! The log is thread-local: checks performed inside a spawned task on
//! another worker thread are not visible to the test thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashMap<String, usize>> = RefCell::new(HashMap::new());
}

/// Assert an invariant and record it for contract testing.
///
/// # Panics
/// Panics if the condition is false. The optional context (usually the
/// parameter name) is included in the message.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        *log.borrow_mut().entry(message.to_string()).or_insert(0) += 1;
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// How many times `message` has been checked on this thread since the last
/// [`clear_invariant_log`].
pub fn invariant_check_count(message: &str) -> usize {
    INVARIANT_LOG.with(|log| log.borrow().get(message).copied().unwrap_or(0))
}

/// Panics unless every listed invariant was checked at least once.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| invariant_check_count(invariant) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| log.borrow_mut().clear());
}
