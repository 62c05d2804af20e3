/// PEM label of an X.509 certificate block.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of a PKCS#1 RSA private key block.
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Extract the payload of the first PEM block in `data`.
///
/// Returns `None` when no well-formed block is found or its label is not `label`;
/// anything after the first block is ignored.
pub fn pem_to_der(data: &[u8], label: &str) -> Option<Vec<u8>> {
    let pem = pem::parse(data).ok()?;
    (pem.tag() == label).then(|| pem.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_block_wins() {
        let mut data = der_to_pem(&[1, 2, 3], CERTIFICATE_LABEL);
        data.push_str(&der_to_pem(&[4, 5, 6], CERTIFICATE_LABEL));
        assert_eq!(
            pem_to_der(data.as_bytes(), CERTIFICATE_LABEL),
            Some(vec![1, 2, 3])
        );
        assert!(!data.contains('\r'));
    }

    #[test]
    fn test_wrong_label_or_garbage() {
        let data = der_to_pem(&[1, 2, 3], RSA_PRIVATE_KEY_LABEL);
        assert_eq!(pem_to_der(data.as_bytes(), CERTIFICATE_LABEL), None);
        assert_eq!(pem_to_der(b"0", CERTIFICATE_LABEL), None);
    }
}
