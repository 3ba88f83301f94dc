use std::path::{Path, PathBuf};

use certsmith::cert::Certificate;
use certsmith::cert::extension_set::SubjectAltNames;
use certsmith::cert::params::DistinguishedName;
use certsmith::config::{CertificateOptions, RootCertificateOptions};
use tempfile::TempDir;

/// Small keys keep the suite fast; the pipeline does not care about the size.
pub const TEST_KEY_BITS: usize = 1024;

pub struct TestCa {
    pub dir: TempDir,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    pub cert: Certificate,
}

impl TestCa {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn root_subject() -> DistinguishedName {
    DistinguishedName::builder()
        .country("CN".to_string())
        .state("Beijing".to_string())
        .organization("Quan Dev".to_string())
        .common_name("Quan Dev Root CA".to_string())
        .build()
}

pub fn root_options(dir: &Path) -> RootCertificateOptions {
    RootCertificateOptions::builder()
        .issuer(root_subject())
        .root_ca_key_pathname(dir.join("RootCA.key"))
        .root_ca_cert_pathname(dir.join("RootCA.pem"))
        .build()
}

pub fn create_root_ca() -> TestCa {
    create_root_ca_with(|options| options)
}

pub fn create_root_ca_with(
    customize: impl FnOnce(RootCertificateOptions) -> RootCertificateOptions,
) -> TestCa {
    let dir = tempfile::tempdir().unwrap();
    let options = customize(root_options(dir.path()));
    certsmith::generate_key(&options.root_ca_key_pathname, TEST_KEY_BITS).unwrap();
    let cert = certsmith::generate_root_cert(&options).unwrap();
    TestCa {
        key_path: options.root_ca_key_pathname.clone(),
        cert_path: options.root_ca_cert_pathname.clone(),
        cert,
        dir,
    }
}

pub fn leaf_options(ca: &TestCa, name: &str, alt_names: SubjectAltNames) -> CertificateOptions {
    CertificateOptions::builder()
        .issuer(
            DistinguishedName::builder()
                .country("CN".to_string())
                .common_name(name.to_string())
                .build(),
        )
        .alt_names(alt_names)
        .day_count(1780)
        .key_pathname(ca.path(&format!("{name}.key")))
        .cert_pathname(ca.path(&format!("{name}.pem")))
        .root_ca_key_pathname(&ca.key_path)
        .root_ca_cert_pathname(&ca.cert_path)
        .key_bits(TEST_KEY_BITS)
        .build()
}

/// File names in the CA directory, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
