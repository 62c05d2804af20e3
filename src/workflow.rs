//! Issue a leaf certificate, creating the root CA on first use and reusing it afterwards.
//!
//! The decision is driven entirely by whether a pair named [`CA_NAME`] exists in
//! the [`PairStore`]. An existing CA is loaded as-is; it is never regenerated,
//! even if it has expired or the requested key size differs.

use bon::Builder;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::info;

use crate::cert::CertificateWithPrivateKey;
use crate::cert::params::{IssuanceRequest, Role, Validity};
use crate::error::{DevCaError, Result};
use crate::key::DEFAULT_KEY_BITS;
use crate::signer;
use crate::storage::PairStore;

/// Name of the root CA pair in a store.
pub const CA_NAME: &str = "ca";
/// Default leaf validity, in days.
pub const DEFAULT_DAYS: i64 = 365;
/// Default CA validity, in days. Only applies when the CA is created.
pub const DEFAULT_CA_DAYS: i64 = 3650;

/// The CA held for the rest of a run.
#[derive(Debug, Clone)]
pub enum RootOfTrust {
    /// Read back from the store.
    Loaded(CertificateWithPrivateKey),
    /// Generated during this run and written to the store.
    Created(CertificateWithPrivateKey),
}

impl RootOfTrust {
    /// Loads the CA from `store`, or issues one from `request` and saves it.
    pub fn load_or_create<S: PairStore + ?Sized>(
        store: &S,
        request: &IssuanceRequest,
    ) -> Result<Self> {
        if store.exists(CA_NAME)? {
            let ca = store.load(CA_NAME)?;
            info!(common_name = %ca.cert.common_name(), "using existing CA");
            return Ok(RootOfTrust::Loaded(ca));
        }

        if !request.role.is_ca() {
            return Err(DevCaError::InvalidInput(
                "the root of trust must be created from a CA request".to_string(),
            ));
        }

        let ca = signer::issue_ca(request)?;
        store.save(CA_NAME, &ca)?;
        info!(common_name = %ca.cert.common_name(), "created CA");
        Ok(RootOfTrust::Created(ca))
    }

    pub fn ca(&self) -> &CertificateWithPrivateKey {
        match self {
            RootOfTrust::Loaded(ca) | RootOfTrust::Created(ca) => ca,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, RootOfTrust::Created(_))
    }
}

/// Everything one run needs to know.
///
/// `common_name` and `key_bits` apply to the leaf; `key_bits` also sizes a CA
/// created during the run. The CA always gets the default common name.
#[derive(Clone, Debug, Builder)]
pub struct IssueOptions {
    pub hosts: Vec<String>,
    pub common_name: Option<String>,
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
    #[builder(default = OffsetDateTime::now_utc())]
    pub not_before: OffsetDateTime,
    #[builder(default = DEFAULT_DAYS)]
    pub days: i64,
    #[builder(default = DEFAULT_CA_DAYS)]
    pub ca_days: i64,
}

impl IssueOptions {
    pub fn ca_request(&self) -> Result<IssuanceRequest> {
        Ok(IssuanceRequest::builder()
            .role(Role::CertificateAuthority)
            .key_bits(self.key_bits)
            .validity(Validity::starting_at(self.not_before, self.ca_days)?)
            .build())
    }

    pub fn leaf_request(&self) -> Result<IssuanceRequest> {
        Ok(IssuanceRequest::builder()
            .role(Role::Leaf {
                hosts: self.hosts.clone(),
            })
            .maybe_common_name(self.common_name.clone())
            .key_bits(self.key_bits)
            .validity(Validity::starting_at(self.not_before, self.days)?)
            .build())
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct Issued {
    pub root: RootOfTrust,
    pub leaf: CertificateWithPrivateKey,
    /// Name the leaf was saved under: the first host.
    pub leaf_name: String,
}

/// Loads or creates the CA in `store`, issues the leaf and saves it under the first host.
///
/// Both requests and the leaf name are checked before the store is touched,
/// so a bad request never creates a CA as a side effect.
pub fn issue_with_store<S: PairStore + ?Sized>(store: &S, options: &IssueOptions) -> Result<Issued> {
    let leaf_request = options.leaf_request()?;
    leaf_request.validate()?;
    let ca_request = options.ca_request()?;
    ca_request.validate()?;
    let leaf_name = options.hosts[0].clone();
    store.check_name(&leaf_name)?;

    let root = RootOfTrust::load_or_create(store, &ca_request)?;
    let leaf = signer::issue_leaf(&leaf_request, root.ca())?;
    store.save(&leaf_name, &leaf)?;

    info!(
        name = %leaf_name,
        hosts = ?options.hosts,
        ca_created = root.was_created(),
        "issued leaf certificate"
    );

    Ok(Issued {
        root,
        leaf,
        leaf_name,
    })
}

/// Splits a comma-separated host list, trimming whitespace and dropping empty entries.
pub fn parse_hosts(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `YYYY-MM-DD HH:MM:SS` as a UTC instant.
pub fn parse_not_before(value: &str) -> Result<OffsetDateTime> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value.trim(), format)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| DevCaError::InvalidInput(format!("start time {value:?}: {e}")))
}
