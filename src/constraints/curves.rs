//! Named curve table.
//!
//! Maps curve names and their aliases to a canonical name and the bit
//! length of the curve order.

/// (canonical name, order bits, aliases)
const NAMED_CURVES: &[(&str, u32, &[&str])] = &[
    ("secp192r1", 192, &["NIST P-192", "X9.62 prime192v1", "prime192v1"]),
    ("secp224r1", 224, &["NIST P-224"]),
    ("secp256r1", 256, &["NIST P-256", "X9.62 prime256v1", "prime256v1"]),
    ("secp384r1", 384, &["NIST P-384"]),
    ("secp521r1", 521, &["NIST P-521"]),
    ("secp256k1", 256, &[]),
    ("sect163k1", 163, &["NIST K-163"]),
    ("sect233k1", 233, &["NIST K-233"]),
    ("sect283k1", 283, &["NIST K-283"]),
    ("sect409k1", 409, &["NIST K-409"]),
    ("sect571k1", 571, &["NIST K-571"]),
    ("sect163r2", 163, &["NIST B-163"]),
    ("sect233r1", 233, &["NIST B-233"]),
    ("sect283r1", 283, &["NIST B-283"]),
    ("sect409r1", 409, &["NIST B-409"]),
    ("sect571r1", 571, &["NIST B-571"]),
    ("brainpoolP256r1", 256, &[]),
    ("brainpoolP320r1", 320, &[]),
    ("brainpoolP384r1", 384, &[]),
    ("brainpoolP512r1", 512, &[]),
];

fn find(name: &str) -> Option<&'static (&'static str, u32, &'static [&'static str])> {
    NAMED_CURVES.iter().find(|(canonical, _, aliases)| {
        canonical.eq_ignore_ascii_case(name)
            || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

/// True if `name` is a known elliptic curve name or alias.
pub fn is_named_curve(name: &str) -> bool {
    find(name.trim()).is_some()
}

/// Order bit length of a known curve.
pub fn order_bits(name: &str) -> Option<u32> {
    find(name).map(|(_, bits, _)| *bits)
}

/// The curve's canonical name followed by its aliases.
///
/// Unknown curves yield just the given name.
pub fn names_and_aliases(name: &str) -> Vec<String> {
    match find(name) {
        Some((canonical, _, aliases)) => std::iter::once(*canonical)
            .chain(aliases.iter().copied())
            .map(str::to_string)
            .collect(),
        None => vec![name.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_alias() {
        assert!(is_named_curve("NIST P-256"));
        assert!(is_named_curve("secp384R1"));
        assert!(!is_named_curve("RSA"));
        assert_eq!(order_bits("prime256v1"), Some(256));
    }

    #[test]
    fn test_names_and_aliases() {
        assert_eq!(
            names_and_aliases("NIST P-384"),
            vec!["secp384r1".to_string(), "NIST P-384".to_string()]
        );
        assert_eq!(names_and_aliases("curveX"), vec!["curveX".to_string()]);
    }
}
