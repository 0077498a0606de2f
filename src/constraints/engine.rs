//! Constraint Engine
//!
//! Holds the parsed rule table and answers whether a use of an algorithm
//! is permitted. The table is immutable once built; only the memo of
//! disabled-set lookups is shared mutable state. The memo is a bounded,
//! reclaimable [`CacheStore`], so arbitrary query names cannot grow it
//! past [`MEMO_CAPACITY`].

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::constraints::decomposer::{self, decompose, lookup_key};
use crate::constraints::descriptor::{AlgorithmParams, KeyDescriptor};
use crate::constraints::error::{AlgorithmConstrained, ConstraintError};
use crate::constraints::query::{ConstraintQuery, Decision};
use crate::constraints::rule::{parse_rule, Constraint, ConstraintChain, KeySizeBounds};

/// Most algorithm names whose disabled-set result is remembered
pub const MEMO_CAPACITY: usize = 1024;

// == Builder ==
/// Collects rules and named rule lists before parsing them.
#[derive(Debug, Default)]
pub struct ConstraintEngineBuilder {
    lists: HashMap<String, Vec<String>>,
    rules: Vec<String>,
}

impl ConstraintEngineBuilder {
    /// Registers a rule list that `include <name>` expands to.
    pub fn define<S: AsRef<str>>(mut self, name: &str, rules: &[S]) -> Self {
        let list = rules.iter().map(|r| r.as_ref().to_string()).collect();
        self.lists.insert(name.to_string(), list);
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn rules<S: AsRef<str>>(mut self, rules: &[S]) -> Self {
        self.rules.extend(rules.iter().map(|r| r.as_ref().to_string()));
        self
    }

    /// Parses every rule. The first malformed rule aborts the build.
    pub fn build(self) -> Result<ConstraintEngine, ConstraintError> {
        let rules = self.expand_includes()?;
        let mut engine = ConstraintEngine {
            rules: Vec::with_capacity(rules.len()),
            disabled: BTreeSet::new(),
            chains: Vec::new(),
            index: HashMap::new(),
            memo: OnceCell::new(),
        };

        for rule in rules {
            if let Some(chain) = parse_rule(&rule)? {
                engine.register(chain);
                engine.rules.push(rule);
            }
        }

        info!(
            rules = engine.rules.len(),
            disabled = engine.disabled.len(),
            "Built algorithm constraint engine"
        );
        Ok(engine)
    }

    fn expand_includes(&self) -> Result<Vec<String>, ConstraintError> {
        let mut expanded = Vec::new();
        for rule in &self.rules {
            let rule = rule.trim();
            let Some(name) = include_target(rule) else {
                if !rule.is_empty() {
                    expanded.push(rule.to_string());
                }
                continue;
            };

            let list = self
                .lists
                .get(name)
                .ok_or_else(|| ConstraintError::UnknownInclude {
                    name: name.to_string(),
                })?;
            for included in list.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
                if include_target(included).is_some() {
                    return Err(ConstraintError::NestedInclude {
                        name: name.to_string(),
                    });
                }
                expanded.push(included.to_string());
            }
            debug!(include = name, rules = list.len(), "Expanded rule include");
        }
        Ok(expanded)
    }
}

fn include_target(rule: &str) -> Option<&str> {
    let prefix = rule.get(..8)?;
    prefix
        .eq_ignore_ascii_case("include ")
        .then(|| rule[8..].trim())
}

// == Evaluation State ==
/// Progress through one chain on the certificate path.
#[derive(Debug)]
enum ChainState {
    Checking(usize),
    Permitted,
    Denied(AlgorithmConstrained),
}

/// What a `keySize` clause measures.
#[derive(Debug, Clone, Copy)]
enum Measured<'a> {
    Key(&'a KeyDescriptor),
    Params(&'a AlgorithmParams),
    Nothing,
}

// == Constraint Engine ==
#[derive(Debug)]
pub struct ConstraintEngine {
    /// Rules in effect, after include expansion
    rules: Vec<String>,
    /// Lookup keys of blanket-disabled algorithms and curves
    disabled: BTreeSet<String>,
    /// Chain lists; aliases index the same list
    chains: Vec<Vec<ConstraintChain>>,
    index: HashMap<String, usize>,
    /// Results of disabled-set lookups by algorithm name
    memo: OnceCell<CacheStore<String, bool>>,
}

impl ConstraintEngine {
    pub fn builder() -> ConstraintEngineBuilder {
        ConstraintEngineBuilder::default()
    }

    /// Builds an engine from a list of rules.
    ///
    /// # Arguments
    /// * `rules` - Rule strings such as `"RSA keySize < 1024"`
    pub fn build<S: AsRef<str>>(rules: &[S]) -> Result<Self, ConstraintError> {
        Self::builder().rules(rules).build()
    }

    fn register(&mut self, chain: ConstraintChain) {
        let names = decomposer::aliases(&chain.algorithm);
        let slot = names
            .iter()
            .find_map(|name| self.index.get(&lookup_key(name)).copied())
            .unwrap_or_else(|| {
                self.chains.push(Vec::new());
                self.chains.len() - 1
            });

        for name in &names {
            let key = lookup_key(name);
            if chain.is_blanket() {
                self.disabled.insert(key.clone());
            }
            self.index.entry(key).or_insert(slot);
        }
        self.chains[slot].push(chain);
    }

    /// Rules in effect, after include expansion.
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Algorithms and curves disabled outright.
    ///
    /// Building a new engine from this set disables exactly the same names.
    pub fn disabled_algorithms(&self) -> BTreeSet<String> {
        self.disabled.clone()
    }

    // == Disabled Set ==
    /// True unless the name, or any primitive it decomposes into, is
    /// disabled outright. Results are memoized per name.
    pub fn permits_algorithm(&self, algorithm: &str) -> bool {
        let memo = self.memo.get_or_init(|| {
            CacheStore::from_config(&CacheConfig {
                reclaimable: true,
                max_size: MEMO_CAPACITY,
                ttl_seconds: 0,
                max_queue_depth: 0,
            })
        });
        let key = algorithm.to_string();
        if let Some(permitted) = memo.get(&key) {
            return permitted;
        }

        let permitted = !self.is_disabled(algorithm);
        memo.put(key, permitted);
        permitted
    }

    fn is_disabled(&self, algorithm: &str) -> bool {
        self.disabled.contains(&lookup_key(algorithm))
            || decompose(algorithm)
                .iter()
                .any(|element| self.disabled.contains(&lookup_key(element)))
    }

    fn require_enabled(&self, algorithm: &str) -> Result<(), AlgorithmConstrained> {
        if self.permits_algorithm(algorithm) {
            Ok(())
        } else {
            Err(AlgorithmConstrained::disabled(algorithm))
        }
    }

    /// Chains registered for any of `names`, each list visited once.
    fn chains_for<I, S>(&self, names: I) -> Vec<&ConstraintChain>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slots: Vec<usize> = Vec::new();
        for name in names {
            if let Some(&slot) = self.index.get(&lookup_key(name.as_ref())) {
                if !slots.contains(&slot) {
                    slots.push(slot);
                }
            }
        }
        slots
            .into_iter()
            .flat_map(|slot| self.chains[slot].iter())
            .collect()
    }

    // == Permits ==
    /// Evaluates a query.
    pub fn permits(&self, query: &ConstraintQuery) -> Decision {
        self.check(query).into()
    }

    /// Evaluates a query, returning the denial as an error.
    pub fn check(&self, query: &ConstraintQuery) -> Result<(), AlgorithmConstrained> {
        self.evaluate(query).map_err(|denial| {
            debug!(algorithm = %denial.algorithm, reason = %denial.reason, "Algorithm constrained");
            denial.with_context(query.subject(), query.variant)
        })
    }

    fn evaluate(&self, query: &ConstraintQuery) -> Result<(), AlgorithmConstrained> {
        let reference = query.reference_date();

        for algorithm in signature_algorithms(query) {
            self.require_enabled(algorithm)?;
        }

        if let Some(params) = &query.parameters {
            self.check_parameters(params, reference)?;
        }

        if query.is_cert_path() {
            self.check_cert_path(query, reference)
        } else {
            self.check_legacy(query, reference)
        }
    }

    fn check_parameters(
        &self,
        params: &AlgorithmParams,
        reference: DateTime<Utc>,
    ) -> Result<(), AlgorithmConstrained> {
        if let AlgorithmParams::RsaPss { digest, mgf_digest } = params {
            self.require_enabled(digest)?;
            self.require_enabled(mgf_digest)?;
        }
        for chain in self.chains_for([params.algorithm()]) {
            self.legacy_node(chain, 0, Measured::Params(params), reference)?;
        }
        Ok(())
    }

    // == Legacy Path ==
    fn check_legacy(
        &self,
        query: &ConstraintQuery,
        reference: DateTime<Utc>,
    ) -> Result<(), AlgorithmConstrained> {
        if let Some(algorithm) = &query.algorithm {
            let sized = query.parameters.as_ref().map_or(Measured::Nothing, Measured::Params);
            let mut names = decompose(algorithm);
            names.insert(algorithm.clone());
            for chain in self.chains_for(&names) {
                self.legacy_node(chain, 0, sized, reference)?;
            }
        }

        if let Some(key) = &query.key {
            self.require_enabled(&key.algorithm)?;
            for curve in key.named_curves() {
                self.require_enabled(&curve)?;
            }
            for chain in self.chains_for([key.algorithm.as_str()]) {
                self.legacy_node(chain, 0, Measured::Key(key), reference)?;
            }
        }
        Ok(())
    }

    /// A node permits when the rest of its chain permits, or when its own
    /// check passes. Usage and anchor clauses always permit here.
    fn legacy_node(
        &self,
        chain: &ConstraintChain,
        index: usize,
        sized: Measured<'_>,
        reference: DateTime<Utc>,
    ) -> Result<(), AlgorithmConstrained> {
        let Some(node) = chain.nodes.get(index) else {
            return Ok(());
        };
        let rest_permits = || {
            index + 1 < chain.nodes.len()
                && self.legacy_node(chain, index + 1, sized, reference).is_ok()
        };

        match node {
            Constraint::Disabled => Err(AlgorithmConstrained::disabled(&chain.algorithm)),
            Constraint::KeySize(bounds) => {
                if rest_permits() {
                    return Ok(());
                }
                match size_violation(&chain.algorithm, bounds, sized) {
                    Some(size) => Err(key_size_denial(&chain.algorithm, size)),
                    None => Ok(()),
                }
            }
            Constraint::DenyAfter(date) => {
                if rest_permits() || reference.date_naive() < *date {
                    Ok(())
                } else {
                    Err(deny_after_denial(&chain.algorithm, *date, reference))
                }
            }
            Constraint::TrustAnchor | Constraint::Usage(_) => Ok(()),
        }
    }

    // == Certificate Path ==
    fn check_cert_path(
        &self,
        query: &ConstraintQuery,
        reference: DateTime<Utc>,
    ) -> Result<(), AlgorithmConstrained> {
        let keys = query.keys();
        for key in &keys {
            for curve in key.named_curves() {
                self.require_enabled(&curve)?;
            }
        }

        let mut names: BTreeSet<String> = BTreeSet::new();
        for algorithm in signature_algorithms(query) {
            names.insert(algorithm.to_string());
            names.extend(decompose(algorithm));
        }
        names.extend(keys.iter().map(|key| key.algorithm.clone()));

        for chain in self.chains_for(&names) {
            if keys.is_empty() {
                self.walk_chain(chain, None, query, reference)?;
            }
            for key in &keys {
                self.walk_chain(chain, Some(key), query, reference)?;
            }
        }
        Ok(())
    }

    /// Walks a chain node by node. A clause that does not apply permits the
    /// whole chain; the chain denies only when its last clause applies.
    fn walk_chain(
        &self,
        chain: &ConstraintChain,
        key: Option<&KeyDescriptor>,
        query: &ConstraintQuery,
        reference: DateTime<Utc>,
    ) -> Result<(), AlgorithmConstrained> {
        let mut state = ChainState::Checking(0);
        loop {
            state = match state {
                ChainState::Checking(index) => match chain.nodes.get(index) {
                    None => ChainState::Permitted,
                    Some(node) => match applies(chain, node, key, query, reference) {
                        None => ChainState::Permitted,
                        Some(_) if index + 1 < chain.nodes.len() => {
                            ChainState::Checking(index + 1)
                        }
                        Some(denial) => ChainState::Denied(denial),
                    },
                },
                ChainState::Permitted => return Ok(()),
                ChainState::Denied(denial) => return Err(denial),
            };
        }
    }
}

/// The query's algorithm and its certificate's signature algorithm.
fn signature_algorithms(query: &ConstraintQuery) -> impl Iterator<Item = &str> {
    query.algorithm.as_deref().into_iter().chain(
        query
            .certificate
            .as_ref()
            .map(|cert| cert.signature_algorithm.as_str()),
    )
}

/// The denial a node produces when its gate applies, `None` otherwise.
fn applies(
    chain: &ConstraintChain,
    node: &Constraint,
    key: Option<&KeyDescriptor>,
    query: &ConstraintQuery,
    reference: DateTime<Utc>,
) -> Option<AlgorithmConstrained> {
    let algorithm = chain.algorithm.as_str();
    match node {
        Constraint::Disabled => Some(AlgorithmConstrained::disabled(algorithm)),
        Constraint::KeySize(bounds) => key
            .and_then(|key| size_violation(algorithm, bounds, Measured::Key(key)))
            .map(|size| key_size_denial(algorithm, size)),
        Constraint::TrustAnchor => query.trusted_anchor.then(|| {
            AlgorithmConstrained::new(
                algorithm,
                format!(
                    "Algorithm constraints check failed on certificate anchor limits. {}",
                    algorithm
                ),
            )
        }),
        Constraint::DenyAfter(date) => (reference.date_naive() >= *date)
            .then(|| deny_after_denial(algorithm, *date, reference)),
        Constraint::Usage(tags) => tags
            .iter()
            .find(|tag| tag.matches(query.variant))
            .map(|tag| {
                AlgorithmConstrained::new(
                    algorithm,
                    format!("Usage constraint {} check failed: {}", tag, algorithm),
                )
            }),
    }
}

/// Size of the measured key when it falls inside the constrained range.
/// Unknown sizes never violate; zero-length material always does.
fn size_violation(algorithm: &str, bounds: &KeySizeBounds, sized: Measured<'_>) -> Option<u32> {
    let (subject, size) = match sized {
        Measured::Key(key) => (key.algorithm.as_str(), key.key_size()),
        Measured::Params(params) => (params.algorithm(), params.key_size()),
        Measured::Nothing => return None,
    };
    if !decomposer::same_algorithm(subject, algorithm) {
        return None;
    }
    size.filter(|&size| size == 0 || bounds.violated_by(size))
}

fn key_size_denial(algorithm: &str, size: u32) -> AlgorithmConstrained {
    AlgorithmConstrained::new(
        algorithm,
        format!(
            "Algorithm constraints check failed on keysize limits: {} {} bit key",
            algorithm, size
        ),
    )
}

fn deny_after_denial(
    algorithm: &str,
    date: NaiveDate,
    reference: DateTime<Utc>,
) -> AlgorithmConstrained {
    AlgorithmConstrained::new(
        algorithm,
        format!(
            "denyAfter constraint check failed: {} used with Constraint date: {}; params date: {}",
            algorithm,
            date.format("%Y-%m-%d"),
            reference.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    )
}
