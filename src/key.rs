use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    signature::{SignatureEncoding, Signer, Verifier},
    traits::PublicKeyParts,
};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tracing::debug;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{DevCaError, Result};

/// RSA modulus size used when a request leaves it unset.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA key pair used both as certificate subject key and as signing key.
#[derive(Clone)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &"rsa")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    ///
    /// A failure here (bad bit size, entropy source unavailable) is final; it is not retried.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        debug!(bits, "generating RSA key pair");
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| DevCaError::KeyGenerationError(format!("{bits}-bit RSA key: {e}")))?;
        Ok(Self::from_private_key(private))
    }

    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair {
            private: Box::new(private),
            public,
        }
    }

    /// Parse a PKCS#1 `RSAPrivateKey` DER structure.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| DevCaError::KeyDecodingError(e.to_string()))?;
        Ok(Self::from_private_key(private))
    }

    /// Encode the private key as PKCS#1 DER.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        let document = self
            .private
            .to_pkcs1_der()
            .map_err(|e| DevCaError::EncodingError(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }

    /// Returns the public key as an X.509 `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        SubjectPublicKeyInfoOwned::from_key(self.public.clone())
            .map_err(|e| DevCaError::EncodingError(e.to_string()))
    }

    /// Sign `data` with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new((*self.private).clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| DevCaError::SigningError(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

/// Verify an RSASSA-PKCS1-v1_5 / SHA-256 signature over `data`.
pub fn verify_signature(public: &RsaPublicKey, data: &[u8], signature: &[u8]) -> Result<()> {
    let signature = Signature::try_from(signature)
        .map_err(|e| DevCaError::VerificationError(e.to_string()))?;
    VerifyingKey::<Sha256>::new(public.clone())
        .verify(data, &signature)
        .map_err(|e| DevCaError::VerificationError(e.to_string()))
}

/// Key identifier per RFC 5280 4.2.1.2 method (1): SHA-1 over the subject public key bits.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_reload_pkcs1() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        assert_eq!(key.bits(), 1024);

        let der = key.to_pkcs1_der().unwrap();
        let reloaded = KeyPair::from_pkcs1_der(&der).unwrap();
        assert_eq!(key.public_key(), reloaded.public_key());
    }

    #[test]
    fn test_sign_and_verify() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let signature = key.sign_data(b"to be signed").unwrap();

        verify_signature(key.public_key(), b"to be signed", &signature).unwrap();
        assert!(matches!(
            verify_signature(key.public_key(), b"tampered", &signature),
            Err(DevCaError::VerificationError(_))
        ));
    }

    #[test]
    fn test_garbage_pkcs1_is_rejected() {
        assert!(matches!(
            KeyPair::from_pkcs1_der(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(DevCaError::KeyDecodingError(_))
        ));
    }
}
