//! Algorithm Constraints Module
//!
//! Declarative rules restricting cryptographic algorithms, key sizes and
//! usage contexts, and the engine that evaluates queries against them.

mod curves;
mod decomposer;
mod descriptor;
mod engine;
mod error;
pub mod global;
mod query;
mod rule;


// Re-export public types
pub use curves::{is_named_curve, order_bits};
pub use decomposer::{canonical_name, decompose};
pub use descriptor::{
    AlgorithmParams, CertificateDescriptor, KeyDescriptor, KeyMaterial, UsageVariant,
};
pub use engine::{ConstraintEngine, ConstraintEngineBuilder};
pub use error::{AlgorithmConstrained, ConstraintError};
pub use query::{ConstraintQuery, Decision, QueryMode};
pub use rule::{parse_rule, Constraint, ConstraintChain, KeySizeBounds, Operator, UsageTag};

/// Splits rule text on commas and newlines, dropping blank entries.
pub fn split_rules(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .map(str::to_string)
        .collect()
}
