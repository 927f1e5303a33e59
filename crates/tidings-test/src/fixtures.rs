//! Payload fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A payload whose `Clone` panics. Publishing it exercises the bus's panic
/// isolation.
#[derive(Debug, PartialEq, Eq)]
pub struct PanicOnClone;

impl Clone for PanicOnClone {
    fn clone(&self) -> Self {
        panic!("PanicOnClone refused to clone");
    }
}

/// A payload that counts how many times it (or any of its clones) was cloned.
#[derive(Debug, Default)]
pub struct CloneCounter {
    clones: Arc<AtomicUsize>,
}

impl CloneCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clones made so far.
    #[must_use]
    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }
}

impl Clone for CloneCounter {
    fn clone(&self) -> Self {
        self.clones.fetch_add(1, Ordering::SeqCst);
        Self {
            clones: Arc::clone(&self.clones),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_counter_is_shared() {
        let original = CloneCounter::new();
        let copy = original.clone();
        let _again = copy.clone();
        assert_eq!(original.clones(), 2);
    }

    #[test]
    fn test_panic_on_clone_panics() {
        let result = std::panic::catch_unwind(|| PanicOnClone.clone());
        assert!(result.is_err());
    }
}
