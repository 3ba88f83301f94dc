//! The issuance pipeline: key files, the self-signed root and leaf certificates.

use std::path::Path;

use crate::artifact::ArtifactScope;
use crate::cert::extension_set::{ExtensionProfile, ExtensionSet};
use crate::cert::params::Validity;
use crate::cert::request::SigningRequest;
use crate::cert::{Certificate, CertificateAuthority};
use crate::config::{CertificateOptions, ProfileSet, RootCertificateOptions};
use crate::error::{CertSmithError, Result};
use crate::issuer::SelfIssuer;
use crate::key::{self, KeyPair};
use crate::serial::random_serial;

/// Generates an RSA private key of `bits` bits and writes it to `path`.
///
/// Never overwrites: an existing file at `path` is [`CertSmithError::AlreadyExists`].
pub fn generate_key(path: impl AsRef<Path>, bits: usize) -> Result<KeyPair> {
    key::generate_key_file(path, bits)
}

/// Self-signs a root certificate for an existing CA key.
///
/// An existing certificate at the target path is refused before anything else is
/// looked at. Then, before the key is read: the key must exist, the profile file
/// must exist if one is named, and the options must be valid.
///
/// # Arguments
/// * `options` - Subject, validity and file locations of the root.
///
/// # Returns
/// The root certificate, already written to `options.root_ca_cert_pathname`.
pub fn generate_root_cert(options: &RootCertificateOptions) -> Result<Certificate> {
    let key_path = options.root_ca_key_pathname.as_path();
    let cert_path = options.root_ca_cert_pathname.as_path();

    if cert_path.exists() {
        return Err(CertSmithError::CaAlreadyExists(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(CertSmithError::CaKeyNotFound(key_path.to_path_buf()));
    }
    let profiles = match &options.config_pathname {
        Some(config_path) => ProfileSet::from_toml_file(config_path)?,
        None => ProfileSet::default(),
    };
    options.validate()?;
    let profile_name = options
        .request_ext_name
        .as_deref()
        .unwrap_or(ExtensionProfile::DEFAULT_NAME);
    let profile = profiles.resolve(profile_name)?;
    tracing::debug!("using extension profile `{profile_name}` for the root certificate");

    let key = KeyPair::read_from_file(key_path)?;
    let public_key = key.public_key();
    let extensions = ExtensionSet::from_profile(&profile);
    tracing::debug!("applying extensions:\n{extensions}");
    let extension_params =
        extensions.to_extension_params(&public_key, &public_key.key_identifier()?)?;

    let cert = SelfIssuer::new(options.issuer.as_x509_name()?, &key).issue_self_signed(
        random_serial(),
        Validity::for_days(options.day_count)?,
        extension_params,
    )?;

    cert.write_to_file(cert_path).map_err(|e| match e {
        CertSmithError::AlreadyExists(path) => CertSmithError::CaAlreadyExists(path),
        other => other,
    })?;
    tracing::info!(
        "Root Certificate generated successfully: {}",
        cert_path.display()
    );
    Ok(cert)
}

/// Signs a certificate request with a CA read from disk.
///
/// The CA certificate, the CA key and the validity are checked in that order before
/// anything is parsed, so a missing file is always reported as such.
pub fn sign_certificate(
    request: &SigningRequest,
    ca_cert_path: &Path,
    ca_key_path: &Path,
    day_count: i64,
    extensions: Option<&ExtensionSet>,
    out_path: &Path,
) -> Result<Certificate> {
    if !ca_cert_path.exists() {
        return Err(CertSmithError::CaNotFound(ca_cert_path.to_path_buf()));
    }
    if !ca_key_path.exists() {
        return Err(CertSmithError::CaKeyNotFound(ca_key_path.to_path_buf()));
    }
    Validity::for_days(day_count)?;
    let ca = CertificateAuthority::load(ca_cert_path, ca_key_path)?;
    ca.sign_request(request, day_count, extensions, out_path)
}

/// Issues a leaf certificate end to end.
///
/// Generates the leaf key, builds the certificate request as a transient file next
/// to the output certificate, and signs it with the CA. The request file is removed
/// whatever the outcome; the key file is kept once written.
///
/// # Arguments
/// * `options` - Subject, alternative names, validity and all file locations.
///
/// # Returns
/// The leaf certificate, already written to `options.cert_pathname`.
pub fn generate_certificate(options: &CertificateOptions) -> Result<Certificate> {
    options.validate()?;
    let cert_path = options.cert_pathname.as_path();
    if cert_path.exists() {
        return Err(CertSmithError::AlreadyExists(cert_path.to_path_buf()));
    }

    let ca = CertificateAuthority::load(
        &options.root_ca_cert_pathname,
        &options.root_ca_key_pathname,
    )?;
    let extensions = ExtensionSet::for_leaf(&options.alt_names)?;

    let key = key::generate_key_file(&options.key_pathname, options.key_bits)?;

    let mut scope = ArtifactScope::beside(cert_path);
    let request = SigningRequest::build_in(&mut scope, &key, &options.issuer)?;
    tracing::debug!("signing request for {}", options.issuer.encode());

    ca.sign_request(&request, options.day_count, Some(&extensions), cert_path)
}
