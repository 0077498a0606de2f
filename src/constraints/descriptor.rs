//! Key, certificate and parameter descriptors.
//!
//! The engine never parses keys or certificates itself. Callers describe
//! them with these plain types, filled in by whatever introspection layer
//! they already have.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraints::curves;

// == Usage Variant ==
/// What a key or certificate is being validated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageVariant {
    #[default]
    Generic,
    CodeSigning,
    JceSigning,
    TlsClient,
    TlsServer,
    TsaServer,
    PluginCodeSigning,
}

impl fmt::Display for UsageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UsageVariant::Generic => "generic",
            UsageVariant::CodeSigning => "code signing",
            UsageVariant::JceSigning => "jce signing",
            UsageVariant::TlsClient => "tls client",
            UsageVariant::TlsServer => "tls server",
            UsageVariant::TsaServer => "tsa server",
            UsageVariant::PluginCodeSigning => "plugin code signing",
        };
        f.write_str(name)
    }
}

// == Key Material ==
/// The size-bearing part of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyMaterial {
    Rsa { modulus_bits: u32 },
    Ec {
        #[serde(default)]
        curve: Option<String>,
        #[serde(default)]
        order_bits: Option<u32>,
    },
    Dh { prime_bits: u32 },
    Dsa { prime_bits: u32 },
    /// Montgomery curve key (X25519, X448)
    Xec { curve: String },
    /// Edwards curve key (Ed25519, Ed448)
    EdDsa { curve: String },
    /// Symmetric key; `raw_length` is the RAW encoding length in bytes,
    /// `None` when the material is not extractable
    Secret {
        #[serde(default)]
        raw_length: Option<usize>,
    },
    /// Nothing about the size is known
    Opaque,
}

// == Key Descriptor ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    /// Key algorithm name, e.g. "RSA", "EC", "DiffieHellman"
    pub algorithm: String,
    pub material: KeyMaterial,
}

impl KeyDescriptor {
    pub fn new(algorithm: impl Into<String>, material: KeyMaterial) -> Self {
        Self {
            algorithm: algorithm.into(),
            material,
        }
    }

    pub fn rsa(modulus_bits: u32) -> Self {
        Self::new("RSA", KeyMaterial::Rsa { modulus_bits })
    }

    pub fn ec(curve: &str) -> Self {
        Self::new(
            "EC",
            KeyMaterial::Ec {
                curve: Some(curve.to_string()),
                order_bits: None,
            },
        )
    }

    pub fn dh(prime_bits: u32) -> Self {
        Self::new("DH", KeyMaterial::Dh { prime_bits })
    }

    pub fn secret(algorithm: &str, raw_length: Option<usize>) -> Self {
        Self::new(algorithm, KeyMaterial::Secret { raw_length })
    }

    // == Key Size ==
    /// Key size in bits.
    ///
    /// `None` means the size cannot be determined; `Some(0)` means the key
    /// has zero-length extractable material.
    pub fn key_size(&self) -> Option<u32> {
        match &self.material {
            KeyMaterial::Rsa { modulus_bits } => Some(*modulus_bits),
            KeyMaterial::Ec { curve, order_bits } => {
                order_bits.or_else(|| curve.as_deref().and_then(curves::order_bits))
            }
            KeyMaterial::Dh { prime_bits } | KeyMaterial::Dsa { prime_bits } => Some(*prime_bits),
            KeyMaterial::Xec { curve } | KeyMaterial::EdDsa { curve } => edwards_montgomery_size(curve),
            KeyMaterial::Secret { raw_length } => raw_length.map(|len| (len as u32).saturating_mul(8)),
            KeyMaterial::Opaque => None,
        }
    }

    // == Named Curves ==
    /// Curve names (with aliases) the key is defined over.
    pub fn named_curves(&self) -> Vec<String> {
        match &self.material {
            KeyMaterial::Ec {
                curve: Some(curve), ..
            } => curves::names_and_aliases(curve),
            KeyMaterial::Xec { curve } | KeyMaterial::EdDsa { curve } => vec![curve.clone()],
            _ => Vec::new(),
        }
    }
}

fn edwards_montgomery_size(curve: &str) -> Option<u32> {
    match curve.to_ascii_uppercase().as_str() {
        "X25519" | "ED25519" => Some(255),
        "X448" | "ED448" => Some(448),
        _ => None,
    }
}

// == Certificate Descriptor ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDescriptor {
    /// Subject distinguished name, used in denial messages
    pub subject: String,
    /// Signature algorithm, e.g. "SHA256withRSA"
    pub signature_algorithm: String,
    pub public_key: KeyDescriptor,
}

// == Algorithm Params ==
/// Algorithm parameters accompanying a signature or key agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlgorithmParams {
    Dh { prime_bits: u32 },
    Ec {
        #[serde(default)]
        curve: Option<String>,
        #[serde(default)]
        order_bits: Option<u32>,
    },
    /// RSASSA-PSS parameters; both digests must themselves be permitted
    RsaPss { digest: String, mgf_digest: String },
    Other { algorithm: String },
}

impl AlgorithmParams {
    /// Algorithm the parameters belong to.
    pub fn algorithm(&self) -> &str {
        match self {
            AlgorithmParams::Dh { .. } => "DH",
            AlgorithmParams::Ec { .. } => "EC",
            AlgorithmParams::RsaPss { .. } => "RSASSA-PSS",
            AlgorithmParams::Other { algorithm } => algorithm,
        }
    }

    /// Size implied by the parameters, with the same conventions as
    /// [`KeyDescriptor::key_size`].
    pub fn key_size(&self) -> Option<u32> {
        match self {
            AlgorithmParams::Dh { prime_bits } => Some(*prime_bits),
            AlgorithmParams::Ec { curve, order_bits } => {
                order_bits.or_else(|| curve.as_deref().and_then(curves::order_bits))
            }
            AlgorithmParams::RsaPss { .. } | AlgorithmParams::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sizes() {
        assert_eq!(KeyDescriptor::rsa(2048).key_size(), Some(2048));
        assert_eq!(KeyDescriptor::ec("secp256r1").key_size(), Some(256));
        assert_eq!(KeyDescriptor::ec("unknownCurve").key_size(), None);
        assert_eq!(KeyDescriptor::dh(1024).key_size(), Some(1024));
        assert_eq!(KeyDescriptor::secret("AES", Some(16)).key_size(), Some(128));
        assert_eq!(KeyDescriptor::secret("AES", Some(0)).key_size(), Some(0));
        assert_eq!(KeyDescriptor::secret("AES", None).key_size(), None);
        assert_eq!(
            KeyDescriptor::new("XDH", KeyMaterial::Xec { curve: "X25519".into() }).key_size(),
            Some(255)
        );
        assert_eq!(
            KeyDescriptor::new("EdDSA", KeyMaterial::EdDsa { curve: "Ed448".into() }).key_size(),
            Some(448)
        );
        assert_eq!(KeyDescriptor::new("RSA", KeyMaterial::Opaque).key_size(), None);
    }

    #[test]
    fn test_named_curves_include_aliases() {
        let curves = KeyDescriptor::ec("secp256r1").named_curves();
        assert!(curves.contains(&"NIST P-256".to_string()));
        assert!(KeyDescriptor::rsa(2048).named_curves().is_empty());
    }

    #[test]
    fn test_params_size_and_algorithm() {
        let params = AlgorithmParams::Dh { prime_bits: 2048 };
        assert_eq!(params.algorithm(), "DH");
        assert_eq!(params.key_size(), Some(2048));

        let pss = AlgorithmParams::RsaPss {
            digest: "SHA-256".into(),
            mgf_digest: "SHA-256".into(),
        };
        assert_eq!(pss.algorithm(), "RSASSA-PSS");
        assert_eq!(pss.key_size(), None);
    }

    #[test]
    fn test_key_descriptor_deserialize() {
        let json = r#"{"algorithm":"EC","material":{"kind":"ec","curve":"secp384r1"}}"#;
        let key: KeyDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(key.key_size(), Some(384));

        let json = r#"{"algorithm":"RSA","material":{"kind":"rsa","modulus_bits":512}}"#;
        let key: KeyDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(key, KeyDescriptor::rsa(512));
    }

    #[test]
    fn test_usage_variant_display() {
        assert_eq!(UsageVariant::TlsServer.to_string(), "tls server");
        assert_eq!(UsageVariant::default(), UsageVariant::Generic);
    }
}
