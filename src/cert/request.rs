use std::path::Path;

use der::asn1::BitString;
use der::{Decode, DecodePem, Encode, EncodePem};
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use super::SignatureAlgorithm;
use super::params::DistinguishedName;
use crate::artifact::ArtifactScope;
use crate::error::{CertSmithError, Result};
use crate::key::{KeyPair, PublicKey};

/// A PKCS#10 certificate signing request.
///
/// The request only carries the subject name and public key; extensions are
/// chosen by the signer.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub inner: CertReq,
}

impl SigningRequest {
    /// Builds and self-signs a request for `key` with the given subject.
    pub fn build(key: &KeyPair, subject: &DistinguishedName) -> Result<Self> {
        let info = CertReqInfo {
            version: Version::V1,
            subject: subject.as_x509_name()?,
            public_key: key.as_spki()?,
            attributes: Default::default(),
        };
        let signature = key.sign_data(&info.to_der()?)?;
        Ok(Self {
            inner: CertReq {
                info,
                algorithm: SignatureAlgorithm::Sha256WithRSA.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    /// Builds a request, stores it as a transient artifact of `scope` and reads it
    /// back.
    ///
    /// The request that is returned is the one parsed from disk, after its
    /// signature was checked. Every failure is reported as
    /// [`CertSmithError::CsrGenerationError`]; a file that was written but could
    /// not be verified is removed before returning.
    pub fn build_in(
        scope: &mut ArtifactScope,
        key: &KeyPair,
        subject: &DistinguishedName,
    ) -> Result<Self> {
        let csr_error = |e: CertSmithError| CertSmithError::CsrGenerationError(e.to_string());

        let request = Self::build(key, subject).map_err(csr_error)?;
        let pem = request.to_pem().map_err(csr_error)?;
        let path = scope.create(".csr", pem.as_bytes()).map_err(csr_error)?;

        match Self::read_from_file(&path).and_then(|stored| stored.verify().map(|()| stored)) {
            Ok(stored) => {
                tracing::debug!("certificate request written to {}", path.display());
                Ok(stored)
            }
            Err(e) => {
                scope.discard(&path);
                Err(csr_error(e))
            }
        }
    }

    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// Checks the signature algorithm and that the request is signed by its own key.
    pub fn verify(&self) -> Result<()> {
        let expected: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithRSA.into();
        if self.inner.algorithm.oid != expected.oid {
            return Err(CertSmithError::InvalidRequest(format!(
                "unsupported signature algorithm {}",
                self.inner.algorithm.oid
            )));
        }
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertSmithError::InvalidRequest("signature has unused bits".to_string())
        })?;
        self.public_key()?
            .verify(&self.inner.info.to_der()?, signature)
            .map_err(|e| CertSmithError::InvalidRequest(e.to_string()))
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_pem(pem)?,
        })
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        let pem = crate::pem_utils::read_pem_file(path, "CERTIFICATE REQUEST")?;
        Self::from_pem(&pem)
    }
}
