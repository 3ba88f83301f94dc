//! use certsmith::error::CertSmithError;

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`CertSmithError`].
///
/// Callers use this to tell precondition failures (nothing was touched) apart from
/// operational failures in the cryptographic pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input, or a CA that is not usable right now.
    Validation,
    /// Refusal to overwrite an existing key or certificate.
    AlreadyExists,
    /// A required key, certificate or config file is missing.
    NotFound,
    /// Building or verifying the certificate signing request failed.
    CsrGeneration,
    /// The CA signing step failed.
    Signing,
    /// DER/PEM encoding or decoding, or key generation, failed.
    Encoding,
    /// Filesystem failure outside of the cases above.
    Io,
}

/// Represents errors that can occur while issuing certificates.
///
/// This enum provides detailed error messages for various failure scenarios.
#[derive(Debug, Error)]
pub enum CertSmithError {
    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Validity period of zero or negative days.
    #[error("Invalid duration: dayCount must be a positive number, got {0}")]
    InvalidDuration(i64),

    /// A certificate signing request that fails to parse or verify.
    #[error("Invalid certificate request: {0}")]
    InvalidRequest(String),

    /// The CA certificate is outside its validity window.
    #[error("Root certificate is not valid at this time: {0}")]
    CaNotValid(String),

    /// Target key or certificate already exists.
    #[error("`{}` already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// Target root certificate already exists.
    #[error("Root certificate `{}` already exists", .0.display())]
    CaAlreadyExists(PathBuf),

    #[error("Root certificate not found: {}", .0.display())]
    CaNotFound(PathBuf),

    #[error("Root certificate key not found: {}", .0.display())]
    CaKeyNotFound(PathBuf),

    #[error("Key not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Error while creating the certificate signing request.
    #[error("Failed to create certificate request: {0}")]
    CsrGenerationError(String),

    /// Error while signing the certificate with the CA key.
    #[error("Failed to sign certificate: {0}")]
    SigningError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("I/O error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CertSmithError>;

impl CertSmithError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertSmithError::InvalidInput(_)
            | CertSmithError::InvalidDuration(_)
            | CertSmithError::InvalidRequest(_)
            | CertSmithError::CaNotValid(_) => ErrorKind::Validation,
            CertSmithError::AlreadyExists(_) | CertSmithError::CaAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            CertSmithError::CaNotFound(_)
            | CertSmithError::CaKeyNotFound(_)
            | CertSmithError::KeyNotFound(_)
            | CertSmithError::ConfigNotFound(_) => ErrorKind::NotFound,
            CertSmithError::CsrGenerationError(_) => ErrorKind::CsrGeneration,
            CertSmithError::SigningError(_) => ErrorKind::Signing,
            CertSmithError::EncodingError(_)
            | CertSmithError::DecodingError(_)
            | CertSmithError::KeyGenerationError(_) => ErrorKind::Encoding,
            CertSmithError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CertSmithError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<der::Error> for CertSmithError {
    /// Converts a `der::Error` into a `CertSmithError`.
    fn from(err: der::Error) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertSmithError {
    fn from(err: rsa::Error) -> Self {
        CertSmithError::KeyGenerationError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertSmithError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertSmithError {
    fn from(err: pkcs8::Error) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertSmithError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertSmithError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertSmithError {
    fn from(err: pem::PemError) -> Self {
        CertSmithError::DecodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CertSmithError::InvalidDuration(0).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CertSmithError::CaAlreadyExists("RootCA.pem".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            CertSmithError::CaKeyNotFound("RootCA.key".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CertSmithError::CsrGenerationError("bad subject".into()).kind(),
            ErrorKind::CsrGeneration
        );
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = CertSmithError::CaNotFound("cert/RootCA.pem".into());
        assert_eq!(err.to_string(), "Root certificate not found: cert/RootCA.pem");
    }
}
