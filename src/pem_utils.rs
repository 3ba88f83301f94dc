use std::path::Path;

use crate::error::{CertSmithError, Result};

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(CertSmithError::DecodingError(format!(
            "expected PEM label `{expected_label}`, found `{}`",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}

/// Reads a PEM file and returns its text once the label matched `expected_label`.
pub fn read_pem_file(path: &Path, expected_label: &str) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| CertSmithError::io(path, e))?;
    pem_to_der(&text, expected_label)
        .map_err(|e| CertSmithError::DecodingError(format!("{}: {e}", path.display())))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_checked() {
        let pem = der_to_pem(&[0x30, 0x00], "CERTIFICATE");
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert_eq!(pem_to_der(&pem, "CERTIFICATE").unwrap(), vec![0x30, 0x00]);
        assert!(matches!(
            pem_to_der(&pem, "PRIVATE KEY"),
            Err(CertSmithError::DecodingError(_))
        ));
    }

    #[test]
    fn test_read_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RootCA.pem");
        std::fs::write(&path, der_to_pem(&[0x30, 0x00], "CERTIFICATE")).unwrap();

        assert!(read_pem_file(&path, "CERTIFICATE").is_ok());
        assert!(read_pem_file(&path, "CERTIFICATE REQUEST").is_err());
        assert!(matches!(
            read_pem_file(&dir.path().join("missing.pem"), "CERTIFICATE"),
            Err(CertSmithError::Io { .. })
        ));
    }
}
