//! PEM persistence of certificate/key pairs.
//!
//! A pair named `<name>` is two sibling artifacts: `<name>.crt` holding one
//! `CERTIFICATE` block and `<name>.key` holding one `RSA PRIVATE KEY` block
//! (PKCS#1). The two files are written one after the other with no rollback;
//! a half-written pair is caught when it is read back.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use der::{Decode, Reader, SliceReader};
use tracing::{debug, info};
use x509_cert::certificate::CertificateInner;

use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::error::{DevCaError, Result};
use crate::key::KeyPair;
use crate::pem_utils::{CERTIFICATE_LABEL, RSA_PRIVATE_KEY_LABEL, der_to_pem, pem_to_der};

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// `<base>.crt`; the suffix is appended, never substituted, so `cert/example.com` keeps its dot.
pub fn certificate_path(base: &Path) -> PathBuf {
    with_suffix(base, ".crt")
}

/// `<base>.key`
pub fn key_path(base: &Path) -> PathBuf {
    with_suffix(base, ".key")
}

pub fn encode_certificate_pem(cert: &Certificate) -> Result<String> {
    Ok(der_to_pem(&cert.to_der()?, CERTIFICATE_LABEL))
}

pub fn encode_key_pem(key: &KeyPair) -> Result<String> {
    Ok(der_to_pem(&key.to_pkcs1_der()?, RSA_PRIVATE_KEY_LABEL))
}

/// Decodes every certificate in the first `CERTIFICATE` block of `data`.
///
/// The block payload may hold several concatenated DER certificates; all must parse.
/// `source` names the origin in error messages.
pub fn decode_certificates_pem(data: &[u8], source: &str) -> Result<Vec<Certificate>> {
    let der = pem_to_der(data, CERTIFICATE_LABEL)
        .ok_or_else(|| DevCaError::InvalidCertificate(source.to_string()))?;

    let decode_error = |e: der::Error| DevCaError::CertificateDecodingError(format!("{source}: {e}"));
    let mut reader = SliceReader::new(&der).map_err(decode_error)?;
    let mut certificates = Vec::new();
    while !reader.is_finished() {
        let inner = CertificateInner::decode(&mut reader).map_err(decode_error)?;
        certificates.push(Certificate { inner });
    }

    Ok(certificates)
}

/// Decodes the first `RSA PRIVATE KEY` block of `data` as PKCS#1.
pub fn decode_key_pem(data: &[u8], source: &str) -> Result<KeyPair> {
    let der = pem_to_der(data, RSA_PRIVATE_KEY_LABEL)
        .ok_or_else(|| DevCaError::InvalidKey(source.to_string()))?;
    KeyPair::from_pkcs1_der(&der).map_err(|e| match e {
        DevCaError::KeyDecodingError(msg) => DevCaError::KeyDecodingError(format!("{source}: {msg}")),
        other => other,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| DevCaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    let io_error = |source| DevCaError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(path).map_err(io_error)?;
    // mode() only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(io_error)?;
        }
    }
    file.write_all(contents).map_err(io_error)?;
    file.flush().map_err(io_error)
}

/// Reads every certificate from the first PEM block of the file at `path`.
pub fn read_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let data = read_file(path)?;
    decode_certificates_pem(&data, &path.display().to_string())
}

/// Writes `<base>.crt` and then `<base>.key`.
///
/// If writing the key fails, the certificate file is left in place.
pub fn write_pair(base: &Path, pair: &CertificateWithPrivateKey) -> Result<()> {
    let cert_path = certificate_path(base);
    write_file(&cert_path, encode_certificate_pem(&pair.cert)?.as_bytes(), false)?;

    let key_path = key_path(base);
    write_file(&key_path, encode_key_pem(&pair.key)?.as_bytes(), true)?;

    debug!(cert = %cert_path.display(), key = %key_path.display(), "wrote certificate pair");
    Ok(())
}

/// Reads `<base>.crt` and `<base>.key` back into memory.
///
/// Only the first certificate of the block is kept.
pub fn read_pair(base: &Path) -> Result<CertificateWithPrivateKey> {
    let cert_path = certificate_path(base);
    let cert = first_certificate(read_certificates(&cert_path)?, &cert_path.display().to_string())?;

    let key_path = key_path(base);
    let key = decode_key_pem(&read_file(&key_path)?, &key_path.display().to_string())?;

    debug!(cert = %cert_path.display(), key = %key_path.display(), "read certificate pair");
    Ok(CertificateWithPrivateKey { cert, key })
}

fn first_certificate(certificates: Vec<Certificate>, source: &str) -> Result<Certificate> {
    certificates.into_iter().next().ok_or_else(|| {
        DevCaError::CertificateDecodingError(format!("{source}: empty certificate block"))
    })
}

/// Where named certificate pairs live.
///
/// The CA-reuse workflow only talks to this capability, so its decision logic
/// runs the same against a directory or an in-memory map.
pub trait PairStore {
    /// Whether a certificate named `name` is present.
    fn exists(&self, name: &str) -> Result<bool>;

    fn load(&self, name: &str) -> Result<CertificateWithPrivateKey>;

    fn save(&self, name: &str, pair: &CertificateWithPrivateKey) -> Result<()>;

    /// Rejects a name `save` could not store, without touching the store.
    fn check_name(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Pairs stored as `<dir>/<name>.crt` and `<dir>/<name>.key`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens `dir` as a store, creating it and any missing parents.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|source| DevCaError::Io {
                path: dir.clone(),
                source,
            })?;
            info!(dir = %dir.display(), "created output directory");
        }
        Ok(Self { dir })
    }

    /// Base path for `name`. Names that would escape the directory are rejected.
    pub fn base_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DevCaError::InvalidInput(format!(
                "{name:?} cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(name))
    }
}

impl PairStore for FileStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(certificate_path(&self.base_path(name)?).exists())
    }

    fn load(&self, name: &str) -> Result<CertificateWithPrivateKey> {
        read_pair(&self.base_path(name)?)
    }

    fn save(&self, name: &str, pair: &CertificateWithPrivateKey) -> Result<()> {
        write_pair(&self.base_path(name)?, pair)
    }

    fn check_name(&self, name: &str) -> Result<()> {
        self.base_path(name).map(|_| ())
    }
}

/// In-memory store holding the same PEM text a [`FileStore`] would write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pairs: RefCell<HashMap<String, (String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw PEM text under `name`, bypassing encoding.
    pub fn insert_pem(&self, name: &str, cert_pem: String, key_pem: String) {
        self.pairs
            .borrow_mut()
            .insert(name.to_string(), (cert_pem, key_pem));
    }

    pub fn len(&self) -> usize {
        self.pairs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.borrow().is_empty()
    }
}

impl PairStore for MemoryStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.pairs.borrow().contains_key(name))
    }

    fn load(&self, name: &str) -> Result<CertificateWithPrivateKey> {
        let pairs = self.pairs.borrow();
        let (cert_pem, key_pem) = pairs.get(name).ok_or_else(|| DevCaError::Io {
            path: PathBuf::from(name),
            source: std::io::ErrorKind::NotFound.into(),
        })?;

        let cert = first_certificate(decode_certificates_pem(cert_pem.as_bytes(), name)?, name)?;
        let key = decode_key_pem(key_pem.as_bytes(), name)?;
        Ok(CertificateWithPrivateKey { cert, key })
    }

    fn save(&self, name: &str, pair: &CertificateWithPrivateKey) -> Result<()> {
        let cert_pem = encode_certificate_pem(&pair.cert)?;
        let key_pem = encode_key_pem(&pair.key)?;
        self.insert_pem(name, cert_pem, key_pem);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_is_appended() {
        let base = Path::new("cert/example.com");
        assert_eq!(certificate_path(base), PathBuf::from("cert/example.com.crt"));
        assert_eq!(key_path(base), PathBuf::from("cert/example.com.key"));
    }

    #[test]
    fn test_file_store_rejects_escaping_names() {
        let store = FileStore {
            dir: PathBuf::from("cert"),
        };
        for name in ["", ".", "..", "../ca", "a/b", "a\\b"] {
            assert!(matches!(
                store.base_path(name),
                Err(DevCaError::InvalidInput(_))
            ));
            assert!(matches!(
                store.check_name(name),
                Err(DevCaError::InvalidInput(_))
            ));
        }
        store.check_name("example.com").unwrap();
        assert_eq!(
            store.base_path("127.0.0.1").unwrap(),
            PathBuf::from("cert/127.0.0.1")
        );
    }

    #[test]
    fn test_non_pem_certificate_is_invalid() {
        assert!(matches!(
            decode_certificates_pem(b"0", "ca.crt"),
            Err(DevCaError::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_non_pem_or_mislabeled_key_is_invalid() {
        assert!(matches!(
            decode_key_pem(b"0", "ca.key"),
            Err(DevCaError::InvalidKey(_))
        ));

        let data = der_to_pem(&[0x30, 0x00], "PRIVATE KEY");
        assert!(matches!(
            decode_key_pem(data.as_bytes(), "ca.key"),
            Err(DevCaError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_bad_der_payload_is_a_decoding_error() {
        let data = der_to_pem(&[0x30, 0x01], CERTIFICATE_LABEL);
        assert!(matches!(
            decode_certificates_pem(data.as_bytes(), "ca.crt"),
            Err(DevCaError::CertificateDecodingError(_))
        ));

        let data = der_to_pem(&[0x30, 0x01], RSA_PRIVATE_KEY_LABEL);
        assert!(matches!(
            decode_key_pem(data.as_bytes(), "ca.key"),
            Err(DevCaError::KeyDecodingError(_))
        ));
    }

    #[test]
    fn test_memory_store_missing_pair() {
        let store = MemoryStore::new();
        assert!(!store.exists("ca").unwrap());
        assert!(matches!(store.load("ca"), Err(DevCaError::Io { .. })));
        assert!(store.is_empty());
    }
}
