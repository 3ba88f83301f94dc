//! # CertSmith - Local Certificate Authority in Pure Rust
//!
//! CertSmith issues X.509 certificates for local and test environments. It creates a
//! self-signed root certificate authority and signs leaf certificates with it, with
//! optional DNS, IP and URI subject alternative names. Every cryptographic step runs
//! in-process on rustcrypto libraries; no `openssl` binary is invoked.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any modulus of at least 512 bits, 2048 by default, signed with SHA-256
//!
//! ## Files
//!
//! - **Private keys**: PKCS#8 PEM, created once and never overwritten
//! - **Certificates**: X.509 v3 PEM, created once and never overwritten
//! - **CA serial file**: `<root cert>.srl`, the last serial issued by the root, in hex
//! - **Certificate requests**: PKCS#10 PEM, transient, removed when issuance ends
//!
//! ## Quick Start
//!
//! ### Creating a Root Certificate
//!
//! ```rust,no_run
//! use certsmith::{
//!     cert::params::DistinguishedName,
//!     config::RootCertificateOptions,
//! };
//!
//! # fn main() -> Result<(), certsmith::error::CertSmithError> {
//! certsmith::generate_key("RootCA.key", 2048)?;
//!
//! let options = RootCertificateOptions::builder()
//!     .issuer(
//!         DistinguishedName::builder()
//!             .country("CN".to_string())
//!             .organization("Quan Dev".to_string())
//!             .common_name("Quan Dev Root CA".to_string())
//!             .build(),
//!     )
//!     .root_ca_key_pathname("RootCA.key")
//!     .root_ca_cert_pathname("RootCA.pem")
//!     .request_ext_name("v3_ca".to_string())
//!     .build();
//!
//! let root = certsmith::generate_root_cert(&options)?;
//! println!("Root certificate:\n{}", root.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing a Leaf Certificate
//!
//! ```rust,no_run
//! use certsmith::{
//!     cert::{extension_set::SubjectAltNames, params::DistinguishedName},
//!     config::CertificateOptions,
//! };
//!
//! # fn main() -> Result<(), certsmith::error::CertSmithError> {
//! let options = CertificateOptions::builder()
//!     .issuer(
//!         DistinguishedName::builder()
//!             .country("CN".to_string())
//!             .common_name("quan.dev".to_string())
//!             .build(),
//!     )
//!     .alt_names(SubjectAltNames::new(
//!         vec!["quan.dev".to_string(), "www.quan.dev".to_string()],
//!         vec!["127.0.0.1".to_string()],
//!         vec![],
//!     ))
//!     .day_count(825)
//!     .key_pathname("quan.dev.key")
//!     .cert_pathname("quan.dev.pem")
//!     .root_ca_key_pathname("RootCA.key")
//!     .root_ca_cert_pathname("RootCA.pem")
//!     .build();
//!
//! let leaf = certsmith::generate_certificate(&options)?;
//! println!("Leaf serial: {:02X?}", leaf.serial_number());
//! # Ok(())
//! # }
//! ```
//!
//! ### Signing an Existing Request
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use certsmith::cert::{
//!     extension_set::{ExtensionSet, SubjectAltNames},
//!     request::SigningRequest,
//! };
//!
//! # fn main() -> Result<(), certsmith::error::CertSmithError> {
//! let request = SigningRequest::read_from_file(Path::new("service.csr"))?;
//! let extensions = ExtensionSet::for_leaf(&SubjectAltNames::new(
//!     vec!["service.local".to_string()],
//!     vec![],
//!     vec![],
//! ))?;
//!
//! certsmith::sign_certificate(
//!     &request,
//!     Path::new("RootCA.pem"),
//!     Path::new("RootCA.key"),
//!     30,
//!     Some(&extensions),
//!     Path::new("service.pem"),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns a [`error::CertSmithError`]; [`error::CertSmithError::kind`]
//! groups the variants for callers that only care about the category:
//!
//! ```rust
//! use certsmith::error::{CertSmithError, ErrorKind};
//!
//! match certsmith::generate_key("/nonexistent-dir/key.pem", 256) {
//!     Ok(_) => println!("Key generated"),
//!     Err(CertSmithError::InvalidInput(msg)) => println!("Invalid input: {}", msg),
//!     Err(e) if e.kind() == ErrorKind::Io => println!("Filesystem error: {}", e),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Progress is reported through `tracing`: produced files at `info`, pipeline steps
//! and the applied extensions at `debug`, and failed cleanups at `warn`. No
//! subscriber is installed by the library.
//!
//! ## Module Organization
//!
//! - [`pki`]: The issuance pipeline (keys, root and leaf certificates)
//! - [`key`]: Key generation, import/export, and signing
//! - [`cert`]: Certificates, requests, names and extensions
//! - [`issuer`]: Certificate issuing and self-signing
//! - [`config`]: Option records and extension profiles, from builders or TOML
//! - [`serial`]: CA serial number bookkeeping
//! - [`artifact`]: Transient files and create-once writes
//! - [`error`]: Error types and their classification
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`pem_utils`]: PEM framing helpers

pub mod artifact;
pub mod cert;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod pki;
pub mod serial;
pub mod tbs_certificate;

pub use pki::{generate_certificate, generate_key, generate_root_cert, sign_certificate};
