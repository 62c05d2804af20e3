use der::Encode;
use tracing::debug;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::params::CertificateTemplate;
use crate::cert::{Certificate, Result, SignatureAlgorithm};
use crate::key::{self, KeyPair};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// A self-signed CA and a loaded CA certificate with its key both implement this;
/// only the issuer name, signing key and authority key identifier differ.
pub trait Issuer {
    /// Returns the name written into the issued certificate's issuer field.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Key identifier of the issuer, or `None` when the certificate is self-signed.
    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>>;

    /// Issues a certificate for `subject_key` from the given template.
    ///
    /// # Arguments
    /// * `template` - The populated certificate descriptor.
    /// * `subject_key` - The key pair whose public half is certified.
    ///
    /// # Returns
    /// A `Certificate` signed with [`Issuer::signing_key`].
    fn issue(&self, template: &CertificateTemplate, subject_key: &KeyPair) -> Result<Certificate> {
        let signature_algorithm = SignatureAlgorithm::Sha256WithRsa;

        let subject_public_key = subject_key.as_spki()?;
        let subject_key_id = key::key_identifier(&subject_public_key);
        let authority_key_id = self.authority_key_identifier()?;
        let extensions = template.extensions(&subject_key_id, authority_key_id.as_deref())?;

        let tbs_cert = TbsCertificate {
            serial_number: template.serial_number.clone(),
            signature_algorithm,
            issuer: self.issuer_name()?,
            validity: template.validity.clone(),
            subject: template.subject.clone(),
            subject_public_key,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self.signing_key().sign_data(&tbs_cert_inner.to_der()?)?;
        debug!(
            subject = %template.subject.common_name,
            is_ca = template.is_ca,
            "signed certificate"
        );

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}
