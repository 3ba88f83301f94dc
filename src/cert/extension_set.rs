//! Typed description of the extensions applied at signing time.
//!
//! An [`ExtensionSet`] is built from user input (SAN lists) or from a named
//! [`ExtensionProfile`] and only turned into DER by the signer, once the subject and
//! issuer keys are known. Its `Display` output is the equivalent OpenSSL extension
//! config, which is handy in logs.

use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;

use super::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet,
    KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier, ia5,
};
use super::params::ExtensionParam;
use crate::error::{CertSmithError, Result};
use crate::key::PublicKey;

/// Raw SAN input: DNS names, IP literals and URIs as handed over by the caller.
///
/// Entries that are empty (after trimming) are dropped when the set is built;
/// everything else keeps its position relative to the other survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubjectAltNames {
    #[serde(default, rename = "dnsList")]
    pub dns: Vec<String>,
    #[serde(default, rename = "ipList")]
    pub ip: Vec<String>,
    #[serde(default, rename = "uriList")]
    pub uri: Vec<String>,
}

fn non_empty(list: &[String]) -> impl Iterator<Item = &str> {
    list.iter().map(|entry| entry.trim()).filter(|entry| !entry.is_empty())
}

impl SubjectAltNames {
    pub fn new(dns: Vec<String>, ip: Vec<String>, uri: Vec<String>) -> Self {
        Self { dns, ip, uri }
    }

    /// Filters the lists, parses IP literals and checks that DNS names and URIs are
    /// IA5 (ASCII) strings.
    pub fn resolve(&self) -> Result<SubjectAltName> {
        let ip_addresses = non_empty(&self.ip)
            .map(|ip| {
                ip.parse::<IpAddr>().map_err(|_| {
                    CertSmithError::InvalidInput(format!("`{ip}` is not an IP address"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let ia5_names = |list: &[String]| {
            non_empty(list)
                .map(|name| ia5(name).map(|_| name.to_owned()))
                .collect::<Result<Vec<_>>>()
        };
        Ok(SubjectAltName {
            dns_names: ia5_names(self.dns.as_slice())?,
            ip_addresses,
            uris: ia5_names(self.uri.as_slice())?,
        })
    }
}

/// One extension of an [`ExtensionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionKind {
    /// Key identifier of the issuing key.
    AuthorityKeyIdentifier,
    /// Hash of the subject's own public key.
    SubjectKeyIdentifier,
    BasicConstraints {
        constraints: BasicConstraints,
        critical: bool,
    },
    KeyUsage {
        usage: KeyUsage,
        critical: bool,
    },
    ExtendedKeyUsage(ExtendedKeyUsage),
    SubjectAltName(SubjectAltName),
}

/// Ordered set of extensions to put into a certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    kinds: Vec<ExtensionKind>,
}

const LEAF_KEY_USAGE: [KeyUsages; 4] = [
    KeyUsages::DigitalSignature,
    KeyUsages::NonRepudiation,
    KeyUsages::KeyEncipherment,
    KeyUsages::DataEncipherment,
];

const LEAF_EXTENDED_KEY_USAGE: [ExtendedKeyUsageOption; 4] = [
    ExtendedKeyUsageOption::ServerAuth,
    ExtendedKeyUsageOption::ClientAuth,
    ExtendedKeyUsageOption::CodeSigning,
    ExtendedKeyUsageOption::EmailProtection,
];

impl ExtensionSet {
    /// Extensions of a leaf certificate.
    ///
    /// The baseline (authority key id, `CA:FALSE`, the fixed key usages and
    /// extended key usages) is always present; the SAN extension is added only when
    /// at least one alternative name survives filtering.
    pub fn for_leaf(alt_names: &SubjectAltNames) -> Result<Self> {
        let mut kinds = vec![
            ExtensionKind::AuthorityKeyIdentifier,
            ExtensionKind::BasicConstraints {
                constraints: BasicConstraints {
                    is_ca: false,
                    max_path_length: None,
                },
                critical: false,
            },
            ExtensionKind::KeyUsage {
                usage: KeyUsage(
                    LEAF_KEY_USAGE
                        .into_iter()
                        .fold(FlagSet::default(), |set, flag| set | flag),
                ),
                critical: false,
            },
            ExtensionKind::ExtendedKeyUsage(ExtendedKeyUsage {
                usage: LEAF_EXTENDED_KEY_USAGE.to_vec(),
            }),
        ];
        let san = alt_names.resolve()?;
        if !san.is_empty() {
            kinds.push(ExtensionKind::SubjectAltName(san));
        }
        Ok(Self { kinds })
    }

    /// Extensions described by a CA profile.
    pub fn from_profile(profile: &ExtensionProfile) -> Self {
        let mut kinds = Vec::new();
        if let Some(bc) = &profile.basic_constraints {
            kinds.push(ExtensionKind::BasicConstraints {
                constraints: BasicConstraints {
                    is_ca: bc.ca,
                    max_path_length: bc.path_len,
                },
                critical: bc.critical,
            });
        }
        if let Some(ku) = &profile.key_usage {
            let flags = ku
                .usages
                .iter()
                .fold(FlagSet::default(), |set, usage| set | KeyUsages::from(*usage));
            kinds.push(ExtensionKind::KeyUsage {
                usage: KeyUsage(flags),
                critical: ku.critical,
            });
        }
        if profile.subject_key_identifier {
            kinds.push(ExtensionKind::SubjectKeyIdentifier);
        }
        if profile.authority_key_identifier {
            kinds.push(ExtensionKind::AuthorityKeyIdentifier);
        }
        Self { kinds }
    }

    pub fn kinds(&self) -> &[ExtensionKind] {
        &self.kinds
    }

    pub fn subject_alt_name(&self) -> Option<&SubjectAltName> {
        self.kinds.iter().find_map(|kind| match kind {
            ExtensionKind::SubjectAltName(san) => Some(san),
            _ => None,
        })
    }

    /// Lowers the set into DER extensions.
    ///
    /// # Arguments
    /// * `subject_key` - Public key the certificate is issued for.
    /// * `issuer_key_id` - Key identifier of the signing key.
    pub fn to_extension_params(
        &self,
        subject_key: &PublicKey,
        issuer_key_id: &[u8],
    ) -> Result<Vec<ExtensionParam>> {
        self.kinds
            .iter()
            .map(|kind| -> Result<ExtensionParam> {
                match kind {
                    ExtensionKind::AuthorityKeyIdentifier => ExtensionParam::from_extension(
                        &AuthorityKeyIdentifier {
                            key_identifier: issuer_key_id.to_vec(),
                        },
                        false,
                    ),
                    ExtensionKind::SubjectKeyIdentifier => ExtensionParam::from_extension(
                        &SubjectKeyIdentifier(subject_key.key_identifier()?),
                        false,
                    ),
                    ExtensionKind::BasicConstraints {
                        constraints,
                        critical,
                    } => ExtensionParam::from_extension(constraints, *critical),
                    ExtensionKind::KeyUsage { usage, critical } => {
                        ExtensionParam::from_extension(usage, *critical)
                    }
                    ExtensionKind::ExtendedKeyUsage(eku) => {
                        ExtensionParam::from_extension(eku, false)
                    }
                    ExtensionKind::SubjectAltName(san) => {
                        ExtensionParam::from_extension(san, false)
                    }
                }
            })
            .collect()
    }
}

const KEY_USAGE_NAMES: [(KeyUsages, &str); 9] = [
    (KeyUsages::DigitalSignature, "digitalSignature"),
    (KeyUsages::NonRepudiation, "nonRepudiation"),
    (KeyUsages::KeyEncipherment, "keyEncipherment"),
    (KeyUsages::DataEncipherment, "dataEncipherment"),
    (KeyUsages::KeyAgreement, "keyAgreement"),
    (KeyUsages::KeyCertSign, "keyCertSign"),
    (KeyUsages::CRLSign, "cRLSign"),
    (KeyUsages::EncipherOnly, "encipherOnly"),
    (KeyUsages::DecipherOnly, "decipherOnly"),
];

fn critical_prefix(critical: bool) -> &'static str {
    if critical { "critical, " } else { "" }
}

impl fmt::Display for ExtensionSet {
    /// Renders the set as an OpenSSL extension section, `[alt_names]` included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        let mut alt_names = Vec::new();
        for kind in &self.kinds {
            match kind {
                ExtensionKind::AuthorityKeyIdentifier => {
                    lines.push("authorityKeyIdentifier = keyid,issuer".to_string());
                }
                ExtensionKind::SubjectKeyIdentifier => {
                    lines.push("subjectKeyIdentifier = hash".to_string());
                }
                ExtensionKind::BasicConstraints {
                    constraints,
                    critical,
                } => {
                    let mut value = format!(
                        "{}CA:{}",
                        critical_prefix(*critical),
                        if constraints.is_ca { "TRUE" } else { "FALSE" }
                    );
                    if let Some(path_len) = constraints.max_path_length {
                        value.push_str(&format!(", pathlen:{path_len}"));
                    }
                    lines.push(format!("basicConstraints = {value}"));
                }
                ExtensionKind::KeyUsage { usage, critical } => {
                    let names: Vec<&str> = KEY_USAGE_NAMES
                        .iter()
                        .filter(|(flag, _)| usage.0.contains(*flag))
                        .map(|(_, name)| *name)
                        .collect();
                    lines.push(format!(
                        "keyUsage = {}{}",
                        critical_prefix(*critical),
                        names.join(", ")
                    ));
                }
                ExtensionKind::ExtendedKeyUsage(eku) => {
                    let names: Vec<&str> = eku.usage.iter().map(|u| u.openssl_name()).collect();
                    lines.push(format!("extendedKeyUsage = {}", names.join(", ")));
                }
                ExtensionKind::SubjectAltName(san) => {
                    lines.push("subjectAltName = @alt_names".to_string());
                    for (i, dns) in san.dns_names.iter().enumerate() {
                        alt_names.push(format!("DNS.{} = {dns}", i + 1));
                    }
                    for (i, ip) in san.ip_addresses.iter().enumerate() {
                        alt_names.push(format!("IP.{} = {ip}", i + 1));
                    }
                    for (i, uri) in san.uris.iter().enumerate() {
                        alt_names.push(format!("URI.{} = {uri}", i + 1));
                    }
                }
            }
        }
        if !alt_names.is_empty() {
            lines.push(String::new());
            lines.push("[alt_names]".to_string());
            lines.extend(alt_names);
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// A named extension block for self-signed CA certificates, the equivalent of an
/// OpenSSL `[v3_ca]` section.
///
/// Profiles are read from TOML, one table per profile:
///
/// ```toml
/// [v3_ca]
/// basic_constraints = { ca = true, path_len = 0, critical = true }
/// key_usage = { usages = ["keyCertSign", "cRLSign"], critical = true }
/// subject_key_identifier = true
/// authority_key_identifier = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionProfile {
    #[serde(default)]
    pub basic_constraints: Option<BasicConstraintsProfile>,
    #[serde(default)]
    pub key_usage: Option<KeyUsageProfile>,
    #[serde(default)]
    pub subject_key_identifier: bool,
    #[serde(default)]
    pub authority_key_identifier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicConstraintsProfile {
    pub ca: bool,
    #[serde(default)]
    pub path_len: Option<u8>,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyUsageProfile {
    pub usages: Vec<KeyUsageOption>,
    #[serde(default)]
    pub critical: bool,
}

/// Key usage bits by their OpenSSL names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsageOption {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    #[serde(rename = "cRLSign")]
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl From<KeyUsageOption> for KeyUsages {
    fn from(value: KeyUsageOption) -> Self {
        match value {
            KeyUsageOption::DigitalSignature => KeyUsages::DigitalSignature,
            KeyUsageOption::NonRepudiation => KeyUsages::NonRepudiation,
            KeyUsageOption::KeyEncipherment => KeyUsages::KeyEncipherment,
            KeyUsageOption::DataEncipherment => KeyUsages::DataEncipherment,
            KeyUsageOption::KeyAgreement => KeyUsages::KeyAgreement,
            KeyUsageOption::KeyCertSign => KeyUsages::KeyCertSign,
            KeyUsageOption::CrlSign => KeyUsages::CRLSign,
            KeyUsageOption::EncipherOnly => KeyUsages::EncipherOnly,
            KeyUsageOption::DecipherOnly => KeyUsages::DecipherOnly,
        }
    }
}

impl ExtensionProfile {
    /// Name of the profile used when the caller does not pick one.
    pub const DEFAULT_NAME: &'static str = "default";

    /// `CA:TRUE` (critical) plus subject and authority key identifiers.
    pub fn default_ca() -> Self {
        Self {
            basic_constraints: Some(BasicConstraintsProfile {
                ca: true,
                path_len: None,
                critical: true,
            }),
            key_usage: None,
            subject_key_identifier: true,
            authority_key_identifier: true,
        }
    }

    /// A root that may only sign leaves: `pathlen:0`, `keyCertSign` and `cRLSign`.
    pub fn v3_ca() -> Self {
        Self {
            basic_constraints: Some(BasicConstraintsProfile {
                ca: true,
                path_len: Some(0),
                critical: true,
            }),
            key_usage: Some(KeyUsageProfile {
                usages: vec![KeyUsageOption::KeyCertSign, KeyUsageOption::CrlSign],
                critical: true,
            }),
            subject_key_identifier: true,
            authority_key_identifier: true,
        }
    }

    /// Looks up a profile shipped with the crate.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            Self::DEFAULT_NAME => Some(Self::default_ca()),
            "v3_ca" => Some(Self::v3_ca()),
            _ => None,
        }
    }
}
