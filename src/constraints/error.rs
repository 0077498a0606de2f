//! Constraint Errors
//!
//! Construction-time rule errors and the evaluation-time denial type.

use thiserror::Error;

use crate::constraints::descriptor::UsageVariant;

// == Constraint Error ==
/// A rule list that cannot be turned into constraints.
///
/// Malformed rules are never skipped: ignoring one would silently widen
/// what the engine permits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// Clause matched none of the known forms
    #[error("constraint unknown: '{clause}' in rule '{rule}'")]
    UnknownClause { rule: String, clause: String },

    /// keySize operator not one of == != < <= > >=
    #[error("unknown keySize operator '{operator}' in rule '{rule}'")]
    UnknownOperator { rule: String, operator: String },

    /// keySize length missing or not a non-negative integer
    #[error("invalid keySize length '{value}' in rule '{rule}'")]
    InvalidKeySize { rule: String, value: String },

    /// jdkCA or denyAfter given more than once in one rule
    #[error("only one {clause} entry allowed in rule '{rule}'")]
    DuplicateClause { rule: String, clause: &'static str },

    /// denyAfter date malformed or outside the calendar
    #[error("invalid denyAfter date '{value}' in rule '{rule}'")]
    InvalidDate { rule: String, value: String },

    /// usage clause with no tags or an unrecognized tag
    #[error("invalid usage '{value}' in rule '{rule}'")]
    InvalidUsage { rule: String, value: String },

    /// include names a list that was never defined
    #[error("unknown include '{name}'")]
    UnknownInclude { name: String },

    /// An included list itself contains an include
    #[error("include '{name}' may not contain further includes")]
    NestedInclude { name: String },
}

// == Algorithm Constrained ==
/// A denial, carrying enough context to diagnose it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}{}", extended_message(.subject, .variant))]
pub struct AlgorithmConstrained {
    /// Offending algorithm, curve or key algorithm
    pub algorithm: String,
    /// What failed, e.g. the disabled or keysize check
    pub reason: String,
    /// Subject of the certificate under evaluation, if any
    pub subject: Option<String>,
    /// Usage the query was made for
    pub variant: UsageVariant,
}

impl AlgorithmConstrained {
    pub fn new(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            reason: reason.into(),
            subject: None,
            variant: UsageVariant::Generic,
        }
    }

    pub fn with_context(mut self, subject: Option<&str>, variant: UsageVariant) -> Self {
        self.subject = subject.map(str::to_string);
        self.variant = variant;
        self
    }

    /// Denial for an algorithm on the blanket-disabled list.
    pub fn disabled(algorithm: &str) -> Self {
        Self::new(
            algorithm,
            format!("Algorithm constraints check failed on disabled algorithm: {}", algorithm),
        )
    }
}

fn extended_message(subject: &Option<String>, variant: &UsageVariant) -> String {
    let mut message = match subject {
        Some(subject) => format!(" used with certificate: {}", subject),
        None => ".".to_string(),
    };
    if *variant != UsageVariant::Generic {
        message.push_str(&format!(". Usage was {}", variant));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_error_display() {
        let err = ConstraintError::DuplicateClause {
            rule: "RSA jdkCA & jdkCA".to_string(),
            clause: "jdkCA",
        };
        assert_eq!(
            err.to_string(),
            "only one jdkCA entry allowed in rule 'RSA jdkCA & jdkCA'"
        );
    }

    #[test]
    fn test_denial_without_context() {
        let err = AlgorithmConstrained::disabled("MD5");
        assert_eq!(
            err.to_string(),
            "Algorithm constraints check failed on disabled algorithm: MD5."
        );
    }

    #[test]
    fn test_denial_with_certificate_and_usage() {
        let err = AlgorithmConstrained::disabled("SHA1")
            .with_context(Some("CN=leaf"), UsageVariant::TlsServer);
        assert_eq!(
            err.to_string(),
            "Algorithm constraints check failed on disabled algorithm: SHA1 used with \
             certificate: CN=leaf. Usage was tls server"
        );
        assert_eq!(err.subject.as_deref(), Some("CN=leaf"));
    }
}
