pub mod extensions;
pub mod params;

use crate::error::DevCaError;
pub type Result<T> = std::result::Result<T, DevCaError>;
use der::{Decode, Encode, EncodePem};
use extensions::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SanType, SubjectAltName, SubjectKeyIdentifier,
    ToAndFromX509Extension,
};
use params::{CertificateTemplate, DistinguishedName, Validity};
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use sha2::{Digest, Sha256};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::issuer::Issuer;
use crate::key::{self, KeyPair};

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRsa,
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA signature algorithms carry an explicit NULL parameter (RFC 4055).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRsa => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::Any::null()),
            },
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for SignatureAlgorithm {
    type Error = DevCaError;

    fn try_from(value: &AlgorithmIdentifierOwned) -> Result<Self> {
        match value.oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Ok(SignatureAlgorithm::Sha256WithRsa)
            }
            oid => Err(DevCaError::VerificationError(format!(
                "Unsupported signature algorithm {oid}"
            ))),
        }
    }
}

/// Represents an X.509 certificate.
///
/// Provides encoding to DER or PEM and read access to the fields this crate issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a single DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| DevCaError::CertificateDecodingError(e.to_string()))?;
        Ok(Certificate { inner })
    }

    /// Encodes the certificate into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| DevCaError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| DevCaError::EncodingError(e.to_string()))
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.inner.tbs_certificate.serial_number
    }

    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// Subject common name, empty if the subject carries none.
    pub fn common_name(&self) -> String {
        DistinguishedName::from_x509_name(self.subject_name()).common_name
    }

    /// Issuer common name, empty if the issuer carries none.
    pub fn issuer_common_name(&self) -> String {
        DistinguishedName::from_x509_name(self.issuer_name()).common_name
    }

    pub fn validity(&self) -> Validity {
        Validity::from_x509_validity(&self.inner.tbs_certificate.validity)
    }

    /// Decodes the first extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Whether basic constraints mark this certificate as a CA.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .extension::<BasicConstraints>()?
            .is_some_and(|bc| bc.is_ca))
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension::<KeyUsage>()
    }

    pub fn extended_key_usage(&self) -> Result<Option<ExtendedKeyUsage>> {
        self.extension::<ExtendedKeyUsage>()
    }

    /// Subject alternative names in certificate order; empty when the extension is absent.
    pub fn subject_alt_names(&self) -> Result<Vec<SanType>> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|san| san.names)
            .unwrap_or_default())
    }

    /// The subject key identifier, from the extension or computed from the public key.
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        match self.extension::<SubjectKeyIdentifier>()? {
            Some(SubjectKeyIdentifier(id)) => Ok(id),
            None => Ok(key::key_identifier(
                &self.inner.tbs_certificate.subject_public_key_info,
            )),
        }
    }

    /// The subject's RSA public key.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        let spki = &self.inner.tbs_certificate.subject_public_key_info;
        if spki.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
            return Err(DevCaError::CertificateDecodingError(format!(
                "Unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes())
            .map_err(|e| DevCaError::CertificateDecodingError(e.to_string()))
    }

    /// Verifies the certificate signature against `issuer_key`.
    pub fn verify_signed_by(&self, issuer_key: &RsaPublicKey) -> Result<()> {
        SignatureAlgorithm::try_from(&self.inner.signature_algorithm)?;
        let tbs = self.inner.tbs_certificate.to_der()?;
        key::verify_signature(issuer_key, &tbs, self.inner.signature.raw_bytes())
    }

    /// Verifies the certificate signature against its own public key.
    pub fn verify_self_signed(&self) -> Result<()> {
        self.verify_signed_by(&self.public_key()?)
    }

    /// SHA-256 over the DER encoding.
    pub fn fingerprint_sha256(&self) -> Result<Vec<u8>> {
        Ok(Sha256::digest(self.to_der()?).to_vec())
    }

    /// Creates a new self-signed certificate from `template`, signed by `key`.
    ///
    /// The issuer name is the template subject.
    pub fn new_self_signed(template: &CertificateTemplate, key: &KeyPair) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: template.subject.clone(),
            key,
        };
        self_issuer.issue(template, key)
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: DistinguishedName,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        self.name.as_x509_name()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// An issued certificate together with its freshly generated private key.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Checks that this pair can sign leaf certificates: the key must belong to the
    /// certificate and the certificate must be a CA.
    pub fn validate_as_issuer(&self) -> Result<()> {
        if self.cert.public_key()? != *self.key.public_key() {
            return Err(DevCaError::IssuerKeyMismatch);
        }
        if !self.cert.is_ca()? {
            return Err(DevCaError::InvalidIssuer(format!(
                "certificate {:?} is not a certificate authority",
                self.cert.common_name()
            )));
        }
        Ok(())
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate, byte for byte
        Ok(self.cert.subject_name().clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        self.cert.key_identifier().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_algorithm_identifier() {
        let id = AlgorithmIdentifierOwned::from(SignatureAlgorithm::Sha256WithRsa);
        assert_eq!(
            SignatureAlgorithm::try_from(&id).unwrap(),
            SignatureAlgorithm::Sha256WithRsa
        );
        assert_eq!(id.parameters, Some(der::asn1::Any::null()));

        let unsupported = AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            parameters: None,
        };
        assert!(matches!(
            SignatureAlgorithm::try_from(&unsupported),
            Err(DevCaError::VerificationError(_))
        ));
    }

    #[test]
    fn test_garbage_der_is_a_decoding_error() {
        assert!(matches!(
            Certificate::from_der(&[0x30, 0x00]),
            Err(DevCaError::CertificateDecodingError(_))
        ));
    }
}
