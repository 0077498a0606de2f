//! Algorithm name decomposition.
//!
//! Breaks composite names such as `SHA256withRSA` or
//! `AES/GCM/NoPadding` into the primitives they are built from, so each
//! primitive can be checked against the disabled set.

use std::collections::BTreeSet;

/// Digest names written with and without the dash.
const DIGEST_FORMS: &[(&str, &str)] = &[
    ("SHA-1", "SHA1"),
    ("SHA-224", "SHA224"),
    ("SHA-256", "SHA256"),
    ("SHA-384", "SHA384"),
    ("SHA-512", "SHA512"),
    ("SHA-512/224", "SHA512/224"),
    ("SHA-512/256", "SHA512/256"),
];

/// Names that refer to the same algorithm.
const ALIASES: &[&[&str]] = &[&["DH", "DiffieHellman"]];

// == Decompose ==
/// Splits an algorithm name into its component primitives.
///
/// Transformations are split on `/`, then each part on `with`, `and` and
/// `in` (case-insensitive; `in` is kept inside `Padding`). Digest names are
/// reported in both their dashed and undashed form.
pub fn decompose(algorithm: &str) -> BTreeSet<String> {
    let mut elements = BTreeSet::new();
    if algorithm.is_empty() {
        return elements;
    }

    for part in transformation_parts(algorithm) {
        for token in split_connectives(&part) {
            if !token.is_empty() {
                elements.insert(token.to_string());
            }
        }
    }

    let found: Vec<String> = elements.iter().cloned().collect();
    for element in found {
        if let Some(other) = other_digest_form(&element) {
            elements.insert(other.to_string());
        }
    }
    elements
}

/// Splits on `/`, keeping the truncated SHA-512 variants in one piece.
fn transformation_parts(algorithm: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for piece in algorithm.split('/') {
        if piece.is_empty() {
            continue;
        }
        let truncated = piece.starts_with("224") || piece.starts_with("256");
        match parts.last_mut() {
            Some(prev) if truncated && prev.ends_with("512") => {
                prev.push('/');
                prev.push_str(piece);
            }
            _ => parts.push(piece.to_string()),
        }
    }
    parts
}

fn split_connectives(part: &str) -> Vec<&str> {
    let lower = part.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        let matched = if rest.starts_with(b"with") {
            4
        } else if rest.starts_with(b"and") {
            3
        } else if rest.starts_with(b"in") && !bytes[..i].ends_with(b"padd") {
            2
        } else {
            0
        };

        if matched > 0 {
            tokens.push(&part[start..i]);
            i += matched;
            start = i;
        } else {
            i += 1;
        }
    }
    tokens.push(&part[start..]);
    tokens
}

fn other_digest_form(name: &str) -> Option<&'static str> {
    DIGEST_FORMS.iter().find_map(|(dashed, plain)| {
        if name.eq_ignore_ascii_case(dashed) {
            Some(*plain)
        } else if name.eq_ignore_ascii_case(plain) {
            Some(*dashed)
        } else {
            None
        }
    })
}

// == Canonical Names ==
/// Canonical spelling of a name: digests lose their dash, everything else
/// is returned unchanged.
pub fn canonical_name(name: &str) -> String {
    DIGEST_FORMS
        .iter()
        .find(|(dashed, _)| name.eq_ignore_ascii_case(dashed))
        .map(|(_, plain)| plain.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Map key for a name: canonical and uppercased.
pub fn lookup_key(name: &str) -> String {
    canonical_name(name).to_ascii_uppercase()
}

/// The name followed by any aliases it has.
pub fn aliases(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if let Some(group) = ALIASES
        .iter()
        .find(|group| group.iter().any(|alias| alias.eq_ignore_ascii_case(name)))
    {
        names.extend(
            group
                .iter()
                .filter(|alias| !alias.eq_ignore_ascii_case(name))
                .map(|alias| alias.to_string()),
        );
    }
    names
}

/// True if both names denote the same algorithm.
pub fn same_algorithm(a: &str, b: &str) -> bool {
    let key = lookup_key(b);
    aliases(a).iter().any(|alias| lookup_key(alias) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_signature_algorithm() {
        assert_eq!(decompose("MD5withRSA"), set(&["MD5", "RSA"]));
        assert_eq!(
            decompose("SHA256withECDSA"),
            set(&["SHA256", "SHA-256", "ECDSA"])
        );
    }

    #[test]
    fn test_transformation() {
        assert_eq!(
            decompose("AES/GCM/NoPadding"),
            set(&["AES", "GCM", "NoPadding"])
        );
        assert_eq!(
            decompose("RSA/ECB/OAEPWithSHA-1AndMGF1Padding"),
            set(&["RSA", "ECB", "OAEP", "SHA-1", "SHA1", "MGF1Padding"])
        );
    }

    #[test]
    fn test_in_connective() {
        assert_eq!(
            decompose("SHA256withECDSAinP1363Format"),
            set(&["SHA256", "SHA-256", "ECDSA", "P1363Format"])
        );
    }

    #[test]
    fn test_truncated_sha512() {
        assert_eq!(
            decompose("SHA512/224withRSA"),
            set(&["SHA512/224", "SHA-512/224", "RSA"])
        );
    }

    #[test]
    fn test_empty() {
        assert!(decompose("").is_empty());
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("SHA-256"), "SHA256");
        assert_eq!(canonical_name("sha-1"), "SHA1");
        assert_eq!(canonical_name("RSASSA-PSS"), "RSASSA-PSS");
        assert_eq!(lookup_key("sha-512/256"), "SHA512/256");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(aliases("DH"), vec!["DH".to_string(), "DiffieHellman".to_string()]);
        assert_eq!(aliases("RSA"), vec!["RSA".to_string()]);
        assert!(same_algorithm("diffiehellman", "DH"));
        assert!(same_algorithm("SHA-1", "SHA1"));
        assert!(!same_algorithm("RSA", "DSA"));
    }
}
