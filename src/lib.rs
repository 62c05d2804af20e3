//! # devca - A Local Certificate Authority for Development TLS
//!
//! devca issues a self-signed root CA once and then signs RSA leaf certificates
//! for any mix of DNS names and IP addresses with it. It is built entirely with
//! rustcrypto libraries; OpenSSL is only used by the tests to cross-check output.
//!
//! ## What gets issued
//!
//! - **Root CA**: RSA key, common name `Root CA`, basic constraints `CA:TRUE`,
//!   key usage `digitalSignature, keyCertSign`, valid for ten years by default.
//! - **Leaf**: RSA key, common name = first host, `CA:FALSE`, key usage
//!   `digitalSignature, keyEncipherment`, extended key usage `serverAuth, clientAuth`,
//!   every host in the subject alternative names (IP literals as IP addresses).
//!
//! Every certificate gets a fresh random 128-bit serial number and is signed
//! with SHA-256 with RSA.
//!
//! ## On-disk format
//!
//! A pair named `<name>` is written as `<name>.crt` (PEM `CERTIFICATE`) and
//! `<name>.key` (PEM `RSA PRIVATE KEY`, PKCS#1). The CA lives under the name `ca`;
//! a leaf lives under its first host.
//!
//! ## Quick Start
//!
//! ### Issuing a CA and a leaf in memory
//!
//! ```rust,no_run
//! use devca::cert::params::{IssuanceRequest, Validity};
//! use devca::signer;
//!
//! # fn main() -> Result<(), devca::error::DevCaError> {
//! let ca = signer::issue_ca(&IssuanceRequest::ca(Validity::for_days(3650)?))?;
//!
//! let request = IssuanceRequest::leaf(
//!     vec!["localhost".to_string(), "127.0.0.1".to_string()],
//!     Validity::for_days(365)?,
//! );
//! let leaf = signer::issue_leaf(&request, &ca)?;
//!
//! leaf.cert.verify_signed_by(&ca.cert.public_key()?)?;
//! println!("{}", leaf.cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reusing a CA kept in a directory
//!
//! ```rust,no_run
//! use devca::storage::FileStore;
//! use devca::workflow::{IssueOptions, issue_with_store, parse_hosts};
//!
//! # fn main() -> Result<(), devca::error::DevCaError> {
//! let store = FileStore::create("cert")?;
//! let options = IssueOptions::builder()
//!     .hosts(parse_hosts("example.com, 10.0.0.1"))
//!     .build();
//!
//! // Creates cert/ca.crt and cert/ca.key on the first run, loads them afterwards.
//! let issued = issue_with_store(&store, &options)?;
//! println!("CA created: {}", issued.root.was_created());
//! println!("wrote {}", issued.leaf_name);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading a pair back
//!
//! ```rust,no_run
//! use std::path::Path;
//! use devca::storage;
//!
//! # fn main() -> Result<(), devca::error::DevCaError> {
//! let ca = storage::read_pair(Path::new("cert/ca"))?;
//! println!("{}", ca.cert.common_name());
//! # Ok(())
//! # }
//! ```

pub mod cert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod signer;
pub mod storage;
pub mod tbs_certificate;
pub mod workflow;

pub use cert::{Certificate, CertificateWithPrivateKey};
pub use error::{DevCaError, Result};
pub use storage::{FileStore, MemoryStore, PairStore};
