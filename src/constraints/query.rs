//! Evaluation queries and their outcome.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constraints::descriptor::{
    AlgorithmParams, CertificateDescriptor, KeyDescriptor, UsageVariant,
};
use crate::constraints::error::AlgorithmConstrained;

// == Query Mode ==
/// Which evaluation semantics a query asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Boolean key and primitive checks; multi-clause chains permit as soon
    /// as a later clause permits.
    #[default]
    Legacy,
    /// Certificate path validation; a chain denies only when every clause
    /// applies.
    CertPath,
}

// == Constraint Query ==
/// Everything known about one use of an algorithm.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConstraintQuery {
    pub mode: QueryMode,
    pub algorithm: Option<String>,
    pub key: Option<KeyDescriptor>,
    pub certificate: Option<CertificateDescriptor>,
    pub parameters: Option<AlgorithmParams>,
    pub variant: UsageVariant,
    /// Validation date supplied by the path validator
    pub pkix_date: Option<DateTime<Utc>>,
    /// Signing timestamp, e.g. from a timestamped signature
    pub timestamp: Option<DateTime<Utc>>,
    /// The path ends at a trusted root
    pub trusted_anchor: bool,
}

impl ConstraintQuery {
    pub fn legacy() -> Self {
        Self::default()
    }

    pub fn cert_path() -> Self {
        Self {
            mode: QueryMode::CertPath,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn with_key(mut self, key: KeyDescriptor) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_certificate(mut self, certificate: CertificateDescriptor) -> Self {
        self.certificate = Some(certificate);
        self
    }

    pub fn with_parameters(mut self, parameters: AlgorithmParams) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_variant(mut self, variant: UsageVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_pkix_date(mut self, date: DateTime<Utc>) -> Self {
        self.pkix_date = Some(date);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_trusted_anchor(mut self, trusted: bool) -> Self {
        self.trusted_anchor = trusted;
        self
    }

    /// Date `denyAfter` clauses compare against: the PKIX date, else the
    /// signing timestamp, else now.
    pub fn reference_date(&self) -> DateTime<Utc> {
        self.pkix_date.or(self.timestamp).unwrap_or_else(Utc::now)
    }

    /// True when the certificate path semantics apply.
    pub fn is_cert_path(&self) -> bool {
        self.mode == QueryMode::CertPath || self.certificate.is_some()
    }

    /// Supplied key followed by the certificate's public key.
    pub(crate) fn keys(&self) -> Vec<&KeyDescriptor> {
        self.key
            .iter()
            .chain(self.certificate.as_ref().map(|cert| &cert.public_key))
            .collect()
    }

    pub(crate) fn subject(&self) -> Option<&str> {
        self.certificate.as_ref().map(|cert| cert.subject.as_str())
    }
}

// == Decision ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Permitted,
    Denied(AlgorithmConstrained),
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Decision::Permitted)
    }

    pub fn into_result(self) -> Result<(), AlgorithmConstrained> {
        match self {
            Decision::Permitted => Ok(()),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

impl From<Result<(), AlgorithmConstrained>> for Decision {
    fn from(result: Result<(), AlgorithmConstrained>) -> Self {
        match result {
            Ok(()) => Decision::Permitted,
            Err(denial) => Decision::Denied(denial),
        }
    }
}
