//! Option records handed to the issuance pipeline.
//!
//! Both records can be assembled with a builder or read from TOML using the
//! camelCase keys of the command-line tool:
//!
//! ```toml
//! countryName = "CN"
//! commonName = "quan.dev"
//! ipList = ["127.0.0.1"]
//! dayCount = 1780
//! keyPathname = "quan.dev.key"
//! certPathname = "quan.dev.pem"
//! rootCAKeyPathname = "RootCA.key"
//! rootCACertPathname = "RootCA.pem"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bon::Builder;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cert::extension_set::{ExtensionProfile, SubjectAltNames};
use crate::cert::params::{DistinguishedName, Validity};
use crate::error::{CertSmithError, Result};
use crate::key::DEFAULT_KEY_BITS;

/// Validity of a root certificate when the caller does not pick one.
pub const DEFAULT_ROOT_DAY_COUNT: i64 = 365;

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

fn default_root_day_count() -> i64 {
    DEFAULT_ROOT_DAY_COUNT
}

fn parse_toml<T: DeserializeOwned>(source: &str, origin: &str) -> Result<T> {
    toml::from_str(source)
        .map_err(|e| CertSmithError::InvalidInput(format!("failed to parse {origin}: {e}")))
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CertSmithError::ConfigNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path).map_err(|e| CertSmithError::io(path, e))?;
    parse_toml(&contents, &format!("`{}`", path.display()))
}

fn require_path(path: &Path, name: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(CertSmithError::InvalidInput(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Everything needed to issue one leaf certificate.
///
/// # Fields
/// * `issuer` - Subject of the leaf certificate.
/// * `alt_names` - DNS, IP and URI subject alternative names.
/// * `day_count` - Validity in days, counted from the signing time.
/// * `key_pathname` - Where the new private key is written.
/// * `cert_pathname` - Where the new certificate is written.
/// * `root_ca_key_pathname` - Private key of the signing CA.
/// * `root_ca_cert_pathname` - Certificate of the signing CA.
/// * `key_bits` - RSA modulus length of the new key.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateOptions {
    #[serde(flatten)]
    pub issuer: DistinguishedName,
    #[serde(flatten)]
    #[builder(default)]
    pub alt_names: SubjectAltNames,
    pub day_count: i64,
    #[builder(into)]
    pub key_pathname: PathBuf,
    #[builder(into)]
    pub cert_pathname: PathBuf,
    #[serde(rename = "rootCAKeyPathname")]
    #[builder(into)]
    pub root_ca_key_pathname: PathBuf,
    #[serde(rename = "rootCACertPathname")]
    #[builder(into)]
    pub root_ca_cert_pathname: PathBuf,
    #[serde(default = "default_key_bits")]
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
}

impl CertificateOptions {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        parse_toml(source, "certificate options")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        read_toml(path.as_ref())
    }

    /// Checks the parts that need no filesystem access.
    pub fn validate(&self) -> Result<()> {
        require_path(&self.key_pathname, "keyPathname")?;
        require_path(&self.cert_pathname, "certPathname")?;
        require_path(&self.root_ca_key_pathname, "rootCAKeyPathname")?;
        require_path(&self.root_ca_cert_pathname, "rootCACertPathname")?;
        Validity::for_days(self.day_count)?;
        Ok(())
    }
}

/// Everything needed to self-sign a root certificate for an existing key.
///
/// # Fields
/// * `issuer` - Subject (and issuer) of the root certificate.
/// * `day_count` - Validity in days, 365 unless given.
/// * `root_ca_key_pathname` - Existing private key of the CA.
/// * `root_ca_cert_pathname` - Where the root certificate is written.
/// * `config_pathname` - Optional TOML file of named extension profiles.
/// * `request_ext_name` - Profile to apply; `default` unless given.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCertificateOptions {
    #[serde(flatten)]
    pub issuer: DistinguishedName,
    #[serde(default = "default_root_day_count")]
    #[builder(default = DEFAULT_ROOT_DAY_COUNT)]
    pub day_count: i64,
    #[serde(rename = "rootCAKeyPathname")]
    #[builder(into)]
    pub root_ca_key_pathname: PathBuf,
    #[serde(rename = "rootCACertPathname")]
    #[builder(into)]
    pub root_ca_cert_pathname: PathBuf,
    #[serde(default)]
    #[builder(into)]
    pub config_pathname: Option<PathBuf>,
    #[serde(default)]
    #[builder(into)]
    pub request_ext_name: Option<String>,
}

impl RootCertificateOptions {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        parse_toml(source, "root certificate options")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        read_toml(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        require_path(&self.root_ca_key_pathname, "rootCAKeyPathname")?;
        require_path(&self.root_ca_cert_pathname, "rootCACertPathname")?;
        Validity::for_days(self.day_count)?;
        Ok(())
    }
}

/// Named extension profiles for root certificates, one TOML table per name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ProfileSet {
    profiles: HashMap<String, ExtensionProfile>,
}

impl ProfileSet {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        parse_toml(source, "extension profiles")
    }

    /// Loads a profile file; a missing file is [`CertSmithError::ConfigNotFound`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        read_toml(path.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionProfile> {
        self.profiles.get(name)
    }

    /// Looks `name` up in this set first and in the built-in profiles second.
    pub fn resolve(&self, name: &str) -> Result<ExtensionProfile> {
        self.get(name)
            .cloned()
            .or_else(|| ExtensionProfile::builtin(name))
            .ok_or_else(|| {
                CertSmithError::InvalidInput(format!("unknown extension profile `{name}`"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extension_set::KeyUsageOption;

    #[test]
    fn test_certificate_options_from_toml() {
        let options = CertificateOptions::from_toml_str(
            r#"
            countryName = "CN"
            commonName = "quan.dev"
            dnsList = ["quan.dev", ""]
            ipList = ["127.0.0.1"]
            dayCount = 1780
            keyPathname = "quan.dev.key"
            certPathname = "quan.dev.pem"
            rootCAKeyPathname = "RootCA.key"
            rootCACertPathname = "RootCA.pem"
            "#,
        )
        .unwrap();

        assert_eq!(options.issuer.country.as_deref(), Some("CN"));
        assert_eq!(options.issuer.common_name.as_deref(), Some("quan.dev"));
        assert!(options.issuer.organization.is_none());
        assert_eq!(options.alt_names.dns, vec!["quan.dev", ""]);
        assert_eq!(options.alt_names.ip, vec!["127.0.0.1"]);
        assert!(options.alt_names.uri.is_empty());
        assert_eq!(options.day_count, 1780);
        assert_eq!(options.root_ca_cert_pathname, PathBuf::from("RootCA.pem"));
        assert_eq!(options.key_bits, DEFAULT_KEY_BITS);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_matches_toml() {
        let built = CertificateOptions::builder()
            .issuer(
                DistinguishedName::builder()
                    .country("CN".to_string())
                    .common_name("quan.dev".to_string())
                    .build(),
            )
            .alt_names(SubjectAltNames::new(
                vec![],
                vec!["127.0.0.1".to_string()],
                vec![],
            ))
            .day_count(1780)
            .key_pathname("quan.dev.key")
            .cert_pathname("quan.dev.pem")
            .root_ca_key_pathname("RootCA.key")
            .root_ca_cert_pathname("RootCA.pem")
            .build();
        let parsed = CertificateOptions::from_toml_str(
            r#"
            countryName = "CN"
            commonName = "quan.dev"
            ipList = ["127.0.0.1"]
            dayCount = 1780
            keyPathname = "quan.dev.key"
            certPathname = "quan.dev.pem"
            rootCAKeyPathname = "RootCA.key"
            rootCACertPathname = "RootCA.pem"
            "#,
        )
        .unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_validate() {
        let mut options = CertificateOptions::builder()
            .issuer(DistinguishedName::default())
            .day_count(0)
            .key_pathname("a.key")
            .cert_pathname("a.pem")
            .root_ca_key_pathname("RootCA.key")
            .root_ca_cert_pathname("RootCA.pem")
            .build();
        assert!(matches!(
            options.validate(),
            Err(CertSmithError::InvalidDuration(0))
        ));

        options.day_count = 1;
        options.cert_pathname = PathBuf::new();
        assert!(matches!(
            options.validate(),
            Err(CertSmithError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_root_options_defaults() {
        let options = RootCertificateOptions::from_toml_str(
            r#"
            commonName = "Local Root"
            rootCAKeyPathname = "RootCA.key"
            rootCACertPathname = "RootCA.pem"
            "#,
        )
        .unwrap();
        assert_eq!(options.day_count, DEFAULT_ROOT_DAY_COUNT);
        assert!(options.config_pathname.is_none());
        assert!(options.request_ext_name.is_none());

        let built = RootCertificateOptions::builder()
            .issuer(DistinguishedName::default())
            .root_ca_key_pathname("RootCA.key")
            .root_ca_cert_pathname("RootCA.pem")
            .build();
        assert_eq!(built.day_count, DEFAULT_ROOT_DAY_COUNT);
    }

    #[test]
    fn test_profile_set_resolution() {
        let profiles = ProfileSet::from_toml_str(
            r#"
            [server_ca]
            basic_constraints = { ca = true, path_len = 1, critical = true }
            key_usage = { usages = ["keyCertSign"], critical = false }
            subject_key_identifier = true
            "#,
        )
        .unwrap();

        let custom = profiles.resolve("server_ca").unwrap();
        assert_eq!(custom.basic_constraints.unwrap().path_len, Some(1));
        assert_eq!(
            custom.key_usage.unwrap().usages,
            vec![KeyUsageOption::KeyCertSign]
        );
        assert!(!custom.authority_key_identifier);

        assert_eq!(profiles.resolve("v3_ca").unwrap(), ExtensionProfile::v3_ca());
        assert!(matches!(
            profiles.resolve("nope"),
            Err(CertSmithError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("openssl.toml");
        assert!(matches!(
            ProfileSet::from_toml_file(&missing),
            Err(CertSmithError::ConfigNotFound(_))
        ));
    }
}
