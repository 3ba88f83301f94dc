//! Serial number bookkeeping for a CA.
//!
//! The serial file sits next to the CA certificate with the `.srl` extension and
//! holds the last serial handed out, as upper-case hex.

use std::io::Write;
use std::path::{Path, PathBuf};

use rand_core::{OsRng, RngCore};

use crate::artifact::parent_dir;
use crate::error::{CertSmithError, Result};

const SERIAL_LENGTH: usize = 16;

/// A random positive serial of 16 bytes.
pub fn random_serial() -> Vec<u8> {
    let mut serial = vec![0u8; SERIAL_LENGTH];
    loop {
        OsRng.fill_bytes(&mut serial);
        // Positive: the DER INTEGER must not have its sign bit set.
        serial[0] &= 0x7f;
        if serial.iter().any(|b| *b != 0) {
            return normalize(serial);
        }
    }
}

/// Strips redundant leading zero bytes and prepends one if the sign bit is set.
fn normalize(mut serial: Vec<u8>) -> Vec<u8> {
    let leading = serial
        .iter()
        .take(serial.len().saturating_sub(1))
        .take_while(|b| **b == 0)
        .count();
    serial.drain(..leading);
    if serial.first().is_some_and(|b| b & 0x80 != 0) {
        serial.insert(0, 0);
    }
    serial
}

fn increment(mut serial: Vec<u8>) -> Vec<u8> {
    for byte in serial.iter_mut().rev() {
        let (next, overflow) = byte.overflowing_add(1);
        *byte = next;
        if !overflow {
            return normalize(serial);
        }
    }
    serial.insert(0, 1);
    normalize(serial)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialFile {
    path: PathBuf,
}

impl SerialFile {
    /// Serial file belonging to the CA certificate at `cert_path`.
    pub fn for_certificate(cert_path: &Path) -> Self {
        Self {
            path: cert_path.with_extension("srl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serial to use for the next certificate. Does not touch the file.
    pub fn next_serial(&self) -> Result<Vec<u8>> {
        if !self.path.exists() {
            return Ok(random_serial());
        }
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| CertSmithError::io(&self.path, e))?;
        let text = contents.trim();
        let padded = if text.len() % 2 == 1 {
            format!("0{text}")
        } else {
            text.to_string()
        };
        let current = hex::decode(&padded)
            .ok()
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| {
                CertSmithError::InvalidInput(format!(
                    "malformed serial file `{}`",
                    self.path.display()
                ))
            })?;
        Ok(increment(current))
    }

    /// Records `serial` as the last one issued.
    pub fn commit(&self, serial: &[u8]) -> Result<()> {
        let dir = parent_dir(&self.path);
        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| CertSmithError::io(dir, e))?;
        writeln!(file, "{}", hex::encode_upper(serial))
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| CertSmithError::io(file.path(), e))?;
        file.persist(&self.path)
            .map_err(|e| CertSmithError::io(&self.path, e.error))?;
        tracing::debug!(
            "serial {} recorded in {}",
            hex::encode_upper(serial),
            self.path.display()
        );
        Ok(())
    }
}
