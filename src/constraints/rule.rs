//! Rule parsing.
//!
//! A rule reads `ALGORITHM [CLAUSE (& CLAUSE)*]`. With no clauses the
//! algorithm is disabled outright; otherwise each clause becomes one node
//! of a [`ConstraintChain`], in the order written.

use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::constraints::curves;
use crate::constraints::decomposer;
use crate::constraints::descriptor::UsageVariant;
use crate::constraints::error::ConstraintError;

// == Operator ==
/// Comparison operator of a `keySize` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            _ => None,
        }
    }
}

// == Key Size Bounds ==
/// Sizes outside `min..=max`, or equal to `prohibited`, are constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySizeBounds {
    pub min: u32,
    pub max: u32,
    pub prohibited: Option<u32>,
}

impl KeySizeBounds {
    /// Bounds for `keySize <op> <length>`.
    ///
    /// The clause names the *disallowed* sizes, so `< 1024` means sizes
    /// from 1024 up are accepted.
    pub fn new(op: Operator, length: u32) -> Self {
        let (min, max, prohibited) = match op {
            Operator::Eq => (0, u32::MAX, Some(length)),
            Operator::Ne => (length, length, None),
            Operator::Lt => (length, u32::MAX, None),
            Operator::Le => (length.saturating_add(1), u32::MAX, None),
            Operator::Gt => (0, length, None),
            Operator::Ge => (0, length.saturating_sub(1), None),
        };
        Self {
            min,
            max,
            prohibited,
        }
    }

    /// True if a key of `size` bits is constrained by these bounds.
    pub fn violated_by(&self, size: u32) -> bool {
        size < self.min || size > self.max || self.prohibited == Some(size)
    }
}

// == Usage Tag ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTag {
    TlsServer,
    TlsClient,
    SignedJar,
}

impl UsageTag {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "tlsserver" => Some(UsageTag::TlsServer),
            "tlsclient" => Some(UsageTag::TlsClient),
            "signedjar" => Some(UsageTag::SignedJar),
            _ => None,
        }
    }

    /// True if a query made for `variant` falls under this tag.
    pub fn matches(&self, variant: UsageVariant) -> bool {
        match self {
            UsageTag::TlsServer => variant == UsageVariant::TlsServer,
            UsageTag::TlsClient => variant == UsageVariant::TlsClient,
            UsageTag::SignedJar => matches!(
                variant,
                UsageVariant::CodeSigning | UsageVariant::PluginCodeSigning | UsageVariant::TsaServer
            ),
        }
    }
}

impl fmt::Display for UsageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UsageTag::TlsServer => "TLSServer",
            UsageTag::TlsClient => "TLSClient",
            UsageTag::SignedJar => "SignedJAR",
        })
    }
}

// == Constraint ==
/// One node of a constraint chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Unconditional deny
    Disabled,
    KeySize(KeySizeBounds),
    /// Deny once the reference date reaches this day (midnight UTC)
    DenyAfter(NaiveDate),
    /// Applies only to chains anchored at a trusted root (`jdkCA`)
    TrustAnchor,
    /// Applies only to queries for one of these usages
    Usage(Vec<UsageTag>),
}

// == Constraint Chain ==
/// The parsed form of one rule, bound to its algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintChain {
    /// Canonical algorithm (or curve) name the rule was written for
    pub algorithm: String,
    pub nodes: Vec<Constraint>,
}

impl ConstraintChain {
    pub fn disabled(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            nodes: vec![Constraint::Disabled],
        }
    }

    /// True for a rule with no clauses.
    pub fn is_blanket(&self) -> bool {
        matches!(self.nodes.as_slice(), [Constraint::Disabled])
    }
}

// == Parse Rule ==
/// Parses a single rule. Blank input yields `None`.
pub fn parse_rule(rule: &str) -> Result<Option<ConstraintChain>, ConstraintError> {
    let rule = rule.trim();
    if rule.is_empty() {
        return Ok(None);
    }

    if curves::is_named_curve(rule) {
        return Ok(Some(ConstraintChain::disabled(rule)));
    }

    let (token, tail) = match rule.split_once(char::is_whitespace) {
        Some((token, tail)) => (token, tail.trim()),
        None => (rule, ""),
    };
    let algorithm = decomposer::canonical_name(token);
    if tail.is_empty() {
        return Ok(Some(ConstraintChain::disabled(algorithm)));
    }

    let mut nodes = Vec::new();
    let mut seen_anchor = false;
    let mut seen_deny_after = false;

    for clause in tail.split('&').map(str::trim) {
        let node = if clause.starts_with("keySize") {
            Constraint::KeySize(parse_key_size(rule, clause)?)
        } else if clause.eq_ignore_ascii_case("jdkCA") {
            if seen_anchor {
                return Err(ConstraintError::DuplicateClause {
                    rule: rule.to_string(),
                    clause: "jdkCA",
                });
            }
            seen_anchor = true;
            Constraint::TrustAnchor
        } else if let Some(date) = deny_after_date(clause) {
            if seen_deny_after {
                return Err(ConstraintError::DuplicateClause {
                    rule: rule.to_string(),
                    clause: "denyAfter",
                });
            }
            seen_deny_after = true;
            Constraint::DenyAfter(parse_date(rule, date)?)
        } else if let Some(tags) = clause.strip_prefix("usage") {
            Constraint::Usage(parse_usage(rule, tags)?)
        } else {
            return Err(ConstraintError::UnknownClause {
                rule: rule.to_string(),
                clause: clause.to_string(),
            });
        };
        nodes.push(node);
    }

    debug!(algorithm = %algorithm, clauses = nodes.len(), "Parsed constraint rule");
    Ok(Some(ConstraintChain { algorithm, nodes }))
}

fn parse_key_size(rule: &str, clause: &str) -> Result<KeySizeBounds, ConstraintError> {
    let mut tokens = clause.split_whitespace();
    if tokens.next() != Some("keySize") {
        return Err(ConstraintError::UnknownClause {
            rule: rule.to_string(),
            clause: clause.to_string(),
        });
    }

    let op_token = tokens.next().unwrap_or_default();
    let op = Operator::parse(op_token).ok_or_else(|| ConstraintError::UnknownOperator {
        rule: rule.to_string(),
        operator: op_token.to_string(),
    })?;

    let length_token = tokens.next().unwrap_or_default();
    let length: u32 = length_token
        .parse()
        .map_err(|_| ConstraintError::InvalidKeySize {
            rule: rule.to_string(),
            value: length_token.to_string(),
        })?;

    if let Some(extra) = tokens.next() {
        return Err(ConstraintError::UnknownClause {
            rule: rule.to_string(),
            clause: format!("{} ({})", clause, extra),
        });
    }

    Ok(KeySizeBounds::new(op, length))
}

/// Returns the date text of a `denyAfter yyyy-mm-dd` clause.
fn deny_after_date(clause: &str) -> Option<&str> {
    let rest = clause.strip_prefix("denyAfter")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let date = rest.trim_start();
    let bytes = date.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    shaped.then_some(date)
}

fn parse_date(rule: &str, date: &str) -> Result<NaiveDate, ConstraintError> {
    let invalid = || ConstraintError::InvalidDate {
        rule: rule.to_string(),
        value: date.to_string(),
    };
    let year: i32 = date[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = date[5..7].parse().map_err(|_| invalid())?;
    let day: u32 = date[8..10].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn parse_usage(rule: &str, tags: &str) -> Result<Vec<UsageTag>, ConstraintError> {
    let invalid = |value: &str| ConstraintError::InvalidUsage {
        rule: rule.to_string(),
        value: value.to_string(),
    };
    let parsed = tags
        .split_whitespace()
        .map(|tag| UsageTag::parse(tag).ok_or_else(|| invalid(tag)))
        .collect::<Result<Vec<_>, _>>()?;
    if parsed.is_empty() {
        return Err(invalid(tags.trim()));
    }
    Ok(parsed)
}
