//! use devca::error::DevCaError;

use std::path::PathBuf;

use thiserror::Error;

/// Represents errors that can occur while issuing, encoding or loading certificates.
///
/// Variants are grouped by stage so a caller can tell input problems from
/// cryptographic failures and certificate-side from key-side persistence failures.
#[derive(Debug, Error)]
pub enum DevCaError {
    /// The request was rejected before any key material was generated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A leaf certificate was requested without a CA key and certificate.
    #[error("Leaf issuance requires a CA key and certificate")]
    MissingSigningMaterial,

    /// Error during RSA key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error while drawing a random serial number.
    #[error("Serial number error: {0}")]
    SerialNumberError(String),

    /// Error while producing a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// The CA private key does not belong to the CA certificate.
    #[error("The CA private key does not match the CA certificate public key")]
    IssuerKeyMismatch,

    /// The certificate offered as issuer cannot sign other certificates.
    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    /// A signature did not verify.
    #[error("Verification error: {0}")]
    VerificationError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// A certificate or key file could not be created, written or read.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No usable `CERTIFICATE` PEM block was found.
    #[error("The certificate is invalid: {0}")]
    InvalidCertificate(String),

    /// No usable `RSA PRIVATE KEY` PEM block was found.
    #[error("The key is invalid: {0}")]
    InvalidKey(String),

    /// The certificate PEM block held a DER payload that did not parse.
    #[error("Failed to decode certificate: {0}")]
    CertificateDecodingError(String),

    /// The key PEM block held a DER payload that did not parse as PKCS#1.
    #[error("Failed to decode key: {0}")]
    KeyDecodingError(String),
}

impl From<der::Error> for DevCaError {
    /// Converts a `der::Error` raised while building a certificate into a `DevCaError`.
    fn from(err: der::Error) -> Self {
        DevCaError::EncodingError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DevCaError>;
