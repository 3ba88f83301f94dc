pub mod extension_set;
pub mod extensions;
pub mod params;
pub mod request;

use std::path::{Path, PathBuf};

use crate::artifact::write_new_file;
use crate::error::{CertSmithError, Result};
use der::{Decode, DecodePem, Encode, EncodePem};
use extension_set::ExtensionSet;
use extensions::{SubjectKeyIdentifier, ToAndFromX509Extension};
use params::{ExtensionParam, Validity};
use request::SigningRequest;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use crate::serial::SerialFile;
use crate::tbs_certificate::time_to_offset;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// # Returns
    /// An `AlgorithmIdentifierOwned` object containing the OID and parameters for the algorithm.
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                // RFC 4055: the parameters are an explicit NULL.
                parameters: Some(der::asn1::Any::null()),
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_pem(pem)?,
        })
    }

    /// Reads a PEM certificate from disk.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let pem = crate::pem_utils::read_pem_file(path, "CERTIFICATE")?;
        Self::from_pem(&pem)
    }

    /// Writes the certificate as PEM to a path that must not exist yet.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        write_new_file(path, self.to_pem()?.as_bytes(), true)
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// The `notBefore`/`notAfter` window.
    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: time_to_offset(&validity.not_before),
            not_after: time_to_offset(&validity.not_after),
        }
    }

    /// All extensions carried by the certificate.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Decodes the extension `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension::<E>())
            .transpose()
    }

    /// Checks the certificate signature against `issuer_key`.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<()> {
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertSmithError::DecodingError("signature has unused bits".to_string())
        })?;
        issuer_key.verify(&self.inner.tbs_certificate.to_der()?, signature)
    }
}

/// A CA certificate together with its private key: the signer of leaf certificates.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    pub cert: Certificate,
    pub key: KeyPair,
    cert_path: PathBuf,
}

impl CertificateAuthority {
    /// Loads and validates the CA material.
    ///
    /// Fails with [`CertSmithError::CaNotFound`] or [`CertSmithError::CaKeyNotFound`]
    /// if a file is missing, [`CertSmithError::CaNotValid`] if the certificate is not
    /// valid right now and [`CertSmithError::InvalidInput`] if the key does not belong
    /// to the certificate.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        if !cert_path.exists() {
            return Err(CertSmithError::CaNotFound(cert_path.to_path_buf()));
        }
        if !key_path.exists() {
            return Err(CertSmithError::CaKeyNotFound(key_path.to_path_buf()));
        }
        let cert = Certificate::read_from_file(cert_path)?;
        let key = KeyPair::read_from_file(key_path)?;

        let validity = cert.validity();
        let now = OffsetDateTime::now_utc();
        if !validity.contains(now) {
            return Err(CertSmithError::CaNotValid(format!(
                "{} is valid from {} until {}",
                cert_path.display(),
                validity.not_before,
                validity.not_after
            )));
        }
        if cert.public_key()? != key.public_key() {
            return Err(CertSmithError::InvalidInput(format!(
                "key `{}` does not match root certificate `{}`",
                key_path.display(),
                cert_path.display()
            )));
        }

        Ok(Self {
            cert,
            key,
            cert_path: cert_path.to_path_buf(),
        })
    }

    /// Serial number bookkeeping file of this CA.
    pub fn serial_file(&self) -> SerialFile {
        SerialFile::for_certificate(&self.cert_path)
    }

    /// Signs `request` and writes the resulting certificate to `out_path`.
    ///
    /// The request signature is verified first. The serial number is taken from
    /// the CA serial file, which is only advanced once the certificate is on disk.
    /// If the serial file cannot be advanced, the written certificate is removed
    /// again so the serial is never handed out twice.
    pub fn sign_request(
        &self,
        request: &SigningRequest,
        day_count: i64,
        extensions: Option<&ExtensionSet>,
        out_path: &Path,
    ) -> Result<Certificate> {
        let validity = Validity::for_days(day_count)?;
        request.verify()?;

        let subject_key = request.public_key()?;
        let extensions = match extensions {
            Some(set) => {
                tracing::debug!("applying extensions:\n{set}");
                set.to_extension_params(&subject_key, &self.key_identifier()?)?
            }
            None => Vec::new(),
        };

        let serial_file = self.serial_file();
        let serial = serial_file.next_serial()?;
        let cert = self.issue(
            request.subject().clone(),
            subject_key,
            serial.clone(),
            validity,
            extensions,
        )?;

        cert.write_to_file(out_path)?;
        if let Err(e) = serial_file.commit(&serial) {
            if let Err(remove_err) = std::fs::remove_file(out_path) {
                tracing::warn!(
                    "Failed to remove {} after serial update failed: {remove_err}",
                    out_path.display()
                );
            }
            return Err(e);
        }
        tracing::info!("Certificate generated successfully: {}", out_path.display());
        Ok(cert)
    }
}

impl Issuer for CertificateAuthority {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.subject().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    /// The CA's subject key identifier if it carries one, otherwise the hash of its key.
    fn key_identifier(&self) -> Result<Vec<u8>> {
        match self.cert.extension::<SubjectKeyIdentifier>()? {
            Some(ski) => Ok(ski.0),
            None => self.key.public_key().key_identifier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{BasicConstraints, SubjectAltName};
    use crate::cert::params::DistinguishedName;
    use crate::issuer::SelfIssuer;

    fn write_ca(dir: &Path, validity: Validity) -> (PathBuf, PathBuf) {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let name = DistinguishedName::builder()
            .common_name("Test Root".to_string())
            .build()
            .as_x509_name()
            .unwrap();
        let extensions = ExtensionSet::from_profile(
            &crate::cert::extension_set::ExtensionProfile::v3_ca(),
        )
        .to_extension_params(&key.public_key(), &key.public_key().key_identifier().unwrap())
        .unwrap();
        let cert = SelfIssuer::new(name, &key)
            .issue_self_signed(vec![1], validity, extensions)
            .unwrap();

        let cert_path = dir.join("RootCA.pem");
        let key_path = dir.join("RootCA.key");
        cert.write_to_file(&cert_path).unwrap();
        write_new_file(&key_path, key.to_pkcs8_pem().unwrap().as_bytes(), false).unwrap();
        (cert_path, key_path)
    }

    #[test]
    fn test_load_reports_missing_material() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, key_path) = write_ca(dir.path(), Validity::for_days(30).unwrap());

        let missing = dir.path().join("missing.pem");
        assert!(matches!(
            CertificateAuthority::load(&missing, &key_path),
            Err(CertSmithError::CaNotFound(_))
        ));
        assert!(matches!(
            CertificateAuthority::load(&cert_path, &missing),
            Err(CertSmithError::CaKeyNotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_expired_ca() {
        let dir = tempfile::tempdir().unwrap();
        let not_after = OffsetDateTime::now_utc() - time::Duration::days(1);
        let validity = Validity {
            not_before: not_after - time::Duration::days(10),
            not_after,
        };
        let (cert_path, key_path) = write_ca(dir.path(), validity);

        assert!(matches!(
            CertificateAuthority::load(&cert_path, &key_path),
            Err(CertSmithError::CaNotValid(_))
        ));
    }

    #[test]
    fn test_load_rejects_foreign_key() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, _) = write_ca(dir.path(), Validity::for_days(30).unwrap());
        let other_key = dir.path().join("other.key");
        crate::key::generate_key_file(&other_key, 1024).unwrap();

        assert!(matches!(
            CertificateAuthority::load(&cert_path, &other_key),
            Err(CertSmithError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sign_request() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, key_path) = write_ca(dir.path(), Validity::for_days(30).unwrap());
        let ca = CertificateAuthority::load(&cert_path, &key_path).unwrap();

        let leaf_key = KeyPair::generate_rsa(1024).unwrap();
        let subject = DistinguishedName::builder()
            .common_name("quan.dev".to_string())
            .build();
        let request = SigningRequest::build(&leaf_key, &subject).unwrap();
        let alt_names = extension_set::SubjectAltNames::new(
            vec!["quan.dev".to_string()],
            vec![],
            vec![],
        );
        let set = ExtensionSet::for_leaf(&alt_names).unwrap();

        let out_path = dir.path().join("quan.pem");
        let leaf = ca.sign_request(&request, 10, Some(&set), &out_path).unwrap();

        assert!(out_path.exists());
        assert_eq!(leaf.issuer(), ca.cert.subject());
        assert!(leaf.verify_signature(&ca.key.public_key()).is_ok());
        assert_eq!(leaf.validity().duration(), time::Duration::days(10));
        assert_eq!(
            leaf.extension::<BasicConstraints>().unwrap(),
            Some(BasicConstraints::default())
        );
        assert_eq!(
            leaf.extension::<SubjectAltName>().unwrap().unwrap().dns_names,
            vec!["quan.dev".to_string()]
        );
        assert!(ca.serial_file().path().exists());
    }

    #[test]
    fn test_sign_request_removes_certificate_when_serial_update_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, key_path) = write_ca(dir.path(), Validity::for_days(30).unwrap());
        let mut ca = CertificateAuthority::load(&cert_path, &key_path).unwrap();
        // The serial file lives next to the CA certificate; its directory is gone.
        ca.cert_path = dir.path().join("gone").join("RootCA.pem");

        let leaf_key = KeyPair::generate_rsa(1024).unwrap();
        let request = SigningRequest::build(&leaf_key, &DistinguishedName::default()).unwrap();
        let out_path = dir.path().join("quan.pem");
        let err = ca.sign_request(&request, 10, None, &out_path).unwrap_err();

        assert!(matches!(err, CertSmithError::Io { .. }));
        assert!(!out_path.exists());
        assert!(!ca.serial_file().path().exists());
    }

    #[test]
    fn test_sign_request_rejects_non_positive_days() {
        let dir = tempfile::tempdir().unwrap();
        let (cert_path, key_path) = write_ca(dir.path(), Validity::for_days(30).unwrap());
        let ca = CertificateAuthority::load(&cert_path, &key_path).unwrap();
        let leaf_key = KeyPair::generate_rsa(1024).unwrap();
        let request = SigningRequest::build(&leaf_key, &DistinguishedName::default()).unwrap();

        let out_path = dir.path().join("quan.pem");
        let err = ca.sign_request(&request, 0, None, &out_path).unwrap_err();
        assert!(matches!(err, CertSmithError::InvalidDuration(0)));
        assert!(!out_path.exists());
        assert!(!ca.serial_file().path().exists());
    }
}
