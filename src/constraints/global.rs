//! Process-wide default engine.
//!
//! Installed once at startup from configured rule text. Code that needs a
//! specific rule set builds its own [`ConstraintEngine`] instead.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::constraints::engine::ConstraintEngine;
use crate::constraints::error::ConstraintError;

static ENGINE: OnceCell<Arc<ConstraintEngine>> = OnceCell::new();

/// Builds and installs the default engine.
///
/// Only the first successful call builds; later calls return the engine
/// already installed and ignore their rules.
pub fn install<S: AsRef<str>>(rules: &[S]) -> Result<Arc<ConstraintEngine>, ConstraintError> {
    if let Some(engine) = ENGINE.get() {
        warn!("Default constraint engine already installed");
        return Ok(Arc::clone(engine));
    }
    ENGINE
        .get_or_try_init(|| ConstraintEngine::build(rules).map(Arc::new))
        .map(Arc::clone)
}

/// The installed default engine, if any.
pub fn get() -> Option<Arc<ConstraintEngine>> {
    ENGINE.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_once() {
        let first = install(&["MD5"]).unwrap();
        let second = install(&["RC4"]).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &get().unwrap()));
        assert!(!first.permits_algorithm("MD5"));
        assert!(first.permits_algorithm("RC4"));
    }
}
