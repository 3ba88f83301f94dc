use der::Encode;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::{CertSmithError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Key identifier placed in the authority key identifier of issued certificates.
    fn key_identifier(&self) -> Result<Vec<u8>>;

    /// Issues a certificate for `subject_key` under `subject`.
    ///
    /// # Arguments
    /// * `subject` - Subject name of the new certificate.
    /// * `subject_key` - Public key being certified.
    /// * `serial_number` - Positive big-endian serial number.
    /// * `validity` - The validity window.
    /// * `extensions` - Fully encoded extensions, in order.
    ///
    /// # Returns
    /// A `Certificate` object representing the issued certificate.
    fn issue(
        &self,
        subject: Name,
        subject_key: PublicKey,
        serial_number: Vec<u8>,
        validity: Validity,
        extensions: Vec<ExtensionParam>,
    ) -> Result<Certificate> {
        let signature_algo = SignatureAlgorithm::Sha256WithRSA;

        let tbs_cert = TbsCertificate {
            serial_number,
            signature_algorithm: signature_algo,
            issuer: self.issuer_name(),
            validity,
            subject,
            subject_public_key_info: subject_key.to_spki()?,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;

        let signature = self
            .signing_key()
            .sign_data(&tbs_cert_inner.to_der()?)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| CertSmithError::SigningError(e.to_string()))?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// Issuer of a self-signed certificate: the subject name doubles as issuer name.
pub struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl<'a> SelfIssuer<'a> {
    pub fn new(name: Name, key: &'a KeyPair) -> Self {
        Self { name, key }
    }

    /// Issues the self-signed certificate for the issuer's own key.
    pub fn issue_self_signed(
        &self,
        serial_number: Vec<u8>,
        validity: Validity,
        extensions: Vec<ExtensionParam>,
    ) -> Result<Certificate> {
        self.issue(
            self.name.clone(),
            self.key.public_key(),
            serial_number,
            validity,
            extensions,
        )
    }
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn key_identifier(&self) -> Result<Vec<u8>> {
        self.key.public_key().key_identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;

    #[test]
    fn test_self_signed_issuer_equals_subject() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let name = DistinguishedName::builder()
            .country("CN".to_string())
            .common_name("quan.dev".to_string())
            .build()
            .as_x509_name()
            .unwrap();

        let cert = SelfIssuer::new(name.clone(), &key)
            .issue_self_signed(vec![0x01, 0x02], Validity::for_days(365).unwrap(), vec![])
            .unwrap();

        assert_eq!(cert.subject(), &name);
        assert_eq!(cert.issuer(), &name);
        assert_eq!(cert.serial_number(), &[0x01, 0x02]);
        assert!(cert.inner.tbs_certificate.extensions.is_none());
        assert!(cert.verify_signature(&key.public_key()).is_ok());
        assert_eq!(cert.validity().duration(), time::Duration::days(365));
    }

    #[test]
    fn test_issue_rejects_negative_serial() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let issuer = SelfIssuer::new(Name::default(), &key);
        let result = issuer.issue_self_signed(vec![0x80], Validity::for_days(1).unwrap(), vec![]);
        assert!(matches!(result, Err(CertSmithError::InvalidInput(_))));
    }
}
