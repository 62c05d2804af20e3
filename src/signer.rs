//! Key generation, serial numbers and the signing operation.

use rand_core::{OsRng, RngCore};
use tracing::info;
use x509_cert::serial_number::SerialNumber;

use crate::cert::params::{CertificateTemplate, IssuanceRequest, Role, SigningMaterial};
use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::error::{DevCaError, Result};
use crate::issuer::Issuer;
use crate::key::KeyPair;

/// Draws a serial number uniformly from `[0, 2^128)` using the operating system CSPRNG.
pub fn generate_serial_number() -> Result<SerialNumber> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| DevCaError::SerialNumberError(e.to_string()))?;
    serial_number_from_u128(u128::from_be_bytes(bytes))
}

/// Encodes `value` as a positive, minimally encoded DER INTEGER serial number.
pub fn serial_number_from_u128(value: u128) -> Result<SerialNumber> {
    let bytes = value.to_be_bytes();
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);

    let mut encoded = Vec::with_capacity(bytes.len() + 1);
    if bytes[first] & 0x80 != 0 {
        encoded.push(0);
    }
    encoded.extend_from_slice(&bytes[first..]);

    SerialNumber::new(&encoded).map_err(|e| DevCaError::SerialNumberError(e.to_string()))
}

/// Issues a certificate for `request`.
///
/// A CA request must come with [`SigningMaterial::SelfSigned`]; a leaf request
/// must come with [`SigningMaterial::Issuer`]. The request and signing material
/// are checked before the serial number is drawn or any key is generated.
pub fn issue(
    request: &IssuanceRequest,
    material: SigningMaterial<'_>,
) -> Result<CertificateWithPrivateKey> {
    request.validate()?;
    match (&request.role, material) {
        (Role::CertificateAuthority, SigningMaterial::Issuer(_)) => {
            return Err(DevCaError::InvalidInput(
                "a certificate authority is self-signed and takes no issuer".to_string(),
            ));
        }
        (Role::Leaf { .. }, SigningMaterial::SelfSigned) => {
            return Err(DevCaError::MissingSigningMaterial);
        }
        (_, SigningMaterial::Issuer(ca)) => ca.validate_as_issuer()?,
        (_, SigningMaterial::SelfSigned) => {}
    }

    let serial_number = generate_serial_number()?;
    let key = KeyPair::generate_rsa(request.effective_key_bits())?;
    let template = CertificateTemplate::from_request(request, serial_number)?;

    let cert = match material {
        SigningMaterial::SelfSigned => Certificate::new_self_signed(&template, &key)?,
        SigningMaterial::Issuer(ca) => ca.issue(&template, &key)?,
    };

    info!(
        common_name = %template.subject.common_name,
        is_ca = template.is_ca,
        bits = key.bits(),
        hosts = template.subject_alt_names.len(),
        "issued certificate"
    );

    Ok(CertificateWithPrivateKey { cert, key })
}

/// Issues a self-signed CA certificate with its own fresh key.
pub fn issue_ca(request: &IssuanceRequest) -> Result<CertificateWithPrivateKey> {
    issue(request, SigningMaterial::SelfSigned)
}

/// Issues a leaf certificate with its own fresh key, signed by `ca`.
pub fn issue_leaf(
    request: &IssuanceRequest,
    ca: &CertificateWithPrivateKey,
) -> Result<CertificateWithPrivateKey> {
    issue(request, SigningMaterial::Issuer(ca))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::Validity;
    use der::Encode;

    // Content octets of the DER INTEGER, after tag and short-form length.
    fn integer_content(serial: &SerialNumber) -> Vec<u8> {
        let der = serial.to_der().unwrap();
        assert_eq!(der[0], 0x02);
        der[2..].to_vec()
    }

    fn small_ca() -> CertificateWithPrivateKey {
        let mut request = IssuanceRequest::ca(Validity::for_days(30).unwrap());
        request.key_bits = 1024;
        issue_ca(&request).unwrap()
    }

    #[test]
    fn test_serial_numbers_are_positive_and_distinct() {
        let first = generate_serial_number().unwrap();
        let second = generate_serial_number().unwrap();
        assert_ne!(first, second);
        for serial in [&first, &second] {
            let content = integer_content(serial);
            assert!(content.len() <= 17);
            assert_eq!(content[0] & 0x80, 0);
        }
    }

    #[test]
    fn test_serial_number_with_high_bit_stays_positive() {
        let content = integer_content(&serial_number_from_u128(u128::MAX).unwrap());
        assert_eq!(content.len(), 17);
        assert_eq!(content[0], 0);
        assert!(content[1..].iter().all(|b| *b == 0xff));

        assert_eq!(integer_content(&serial_number_from_u128(0x7f).unwrap()), vec![0x7f]);
    }

    #[test]
    fn test_empty_hosts_rejected_before_key_generation() {
        let ca = small_ca();
        // An invalid key size would fail key generation; validation must win first.
        let mut request = IssuanceRequest::leaf(vec![], Validity::for_days(1).unwrap());
        request.key_bits = 1;
        assert!(matches!(
            issue_leaf(&request, &ca),
            Err(DevCaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_leaf_without_issuer_is_rejected() {
        let mut request = IssuanceRequest::leaf(vec!["example.com".into()], Validity::for_days(1).unwrap());
        request.key_bits = 1;
        assert!(matches!(
            issue(&request, SigningMaterial::SelfSigned),
            Err(DevCaError::MissingSigningMaterial)
        ));
    }

    #[test]
    fn test_ca_with_issuer_is_rejected() {
        let ca = small_ca();
        let mut request = IssuanceRequest::ca(Validity::for_days(1).unwrap());
        request.key_bits = 1;
        assert!(matches!(
            issue(&request, SigningMaterial::Issuer(&ca)),
            Err(DevCaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mismatched_issuer_key_is_rejected() {
        let ca = small_ca();
        let other = small_ca();
        let forged = CertificateWithPrivateKey {
            cert: ca.cert.clone(),
            key: other.key.clone(),
        };
        let request = IssuanceRequest::leaf(vec!["example.com".into()], Validity::for_days(1).unwrap());
        assert!(matches!(
            issue_leaf(&request, &forged),
            Err(DevCaError::IssuerKeyMismatch)
        ));
    }

    #[test]
    fn test_leaf_cannot_act_as_issuer() {
        let ca = small_ca();
        let mut request = IssuanceRequest::leaf(vec!["example.com".into()], Validity::for_days(1).unwrap());
        request.key_bits = 1024;
        let leaf = issue_leaf(&request, &ca).unwrap();
        assert!(matches!(
            issue_leaf(&request, &leaf),
            Err(DevCaError::InvalidIssuer(_))
        ));
    }
}
