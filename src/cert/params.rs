use bon::Builder;
use const_oid::ObjectIdentifier;
use der::DateTime;
use der::asn1::{GeneralizedTime, Ia5StringRef, PrintableStringRef, SetOfVec, UtcTime, Utf8StringRef};
use time::{Duration, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;

use super::CertificateWithPrivateKey;
use super::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    SanType, SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use crate::error::DevCaError;
use crate::key::DEFAULT_KEY_BITS;

/// Subject common name given to a CA when the request carries no override.
pub const DEFAULT_CA_COMMON_NAME: &str = "Root CA";

/// What kind of certificate a request produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// A self-signed root authority. Carries no hosts.
    CertificateAuthority,
    /// An end-entity certificate for the given hosts, signed by a CA.
    Leaf { hosts: Vec<String> },
}

impl Role {
    pub fn is_ca(&self) -> bool {
        matches!(self, Role::CertificateAuthority)
    }

    pub fn hosts(&self) -> &[String] {
        match self {
            Role::CertificateAuthority => &[],
            Role::Leaf { hosts } => hosts,
        }
    }
}

/// Input to the issuance pipeline.
///
/// # Fields
/// * `role` - CA or leaf (with its hosts).
/// * `common_name` - Overrides the default subject common name when non-empty.
/// * `key_bits` - RSA modulus size; zero means [`DEFAULT_KEY_BITS`].
/// * `validity` - The validity window, used as given.
#[derive(Clone, Debug, Builder)]
pub struct IssuanceRequest {
    pub role: Role,
    pub common_name: Option<String>,
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
    pub validity: Validity,
}

impl IssuanceRequest {
    /// A CA request with default key size and common name.
    pub fn ca(validity: Validity) -> Self {
        IssuanceRequest::builder()
            .role(Role::CertificateAuthority)
            .validity(validity)
            .build()
    }

    /// A leaf request for `hosts` with default key size and common name.
    pub fn leaf(hosts: Vec<String>, validity: Validity) -> Self {
        IssuanceRequest::builder()
            .role(Role::Leaf { hosts })
            .validity(validity)
            .build()
    }

    pub fn effective_key_bits(&self) -> usize {
        if self.key_bits == 0 {
            DEFAULT_KEY_BITS
        } else {
            self.key_bits
        }
    }

    /// Checks the request on its own, before any key material exists.
    pub fn validate(&self) -> Result<(), DevCaError> {
        if let Role::Leaf { hosts } = &self.role {
            if hosts.is_empty() {
                return Err(DevCaError::InvalidInput(
                    "a leaf certificate needs at least one host".to_string(),
                ));
            }
            for host in hosts {
                SanType::from_host(host).check()?;
            }
        }
        self.validity.check()
    }

    /// Subject common name: the override if non-empty, else "Root CA" or the first host.
    pub fn subject_common_name(&self) -> Result<String, DevCaError> {
        if let Some(name) = self.common_name.as_deref().filter(|name| !name.is_empty()) {
            return Ok(name.to_string());
        }
        match &self.role {
            Role::CertificateAuthority => Ok(DEFAULT_CA_COMMON_NAME.to_string()),
            Role::Leaf { hosts } => hosts.first().cloned().ok_or_else(|| {
                DevCaError::InvalidInput("a leaf certificate needs at least one host".to_string())
            }),
        }
    }
}

/// Who signs an issued certificate.
#[derive(Clone, Copy, Debug)]
pub enum SigningMaterial<'a> {
    /// The new certificate signs itself with its own fresh key (CA role).
    SelfSigned,
    /// The given CA key and certificate sign the new certificate (leaf role).
    Issuer(&'a CertificateWithPrivateKey),
}

/// Distinguished name of a certificate subject or issuer.
///
/// Only the common name is produced. Reading a name keeps the first CN found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
        }
    }

    /// Converts the distinguished name to an X.509 `Name` holding a single UTF8String CN.
    pub fn as_x509_name(&self) -> Result<Name, DevCaError> {
        let common_name = AttributeTypeAndValue {
            oid: const_oid::db::rfc4519::CN,
            value: Utf8StringRef::new(&self.common_name)?.into(),
        };

        let mut attributes = SetOfVec::new();
        attributes.insert_ordered(common_name)?;

        Ok(RdnSequence(vec![RelativeDistinguishedName::from(attributes)]))
    }

    /// Creates a `DistinguishedName` from an X.509 `Name`.
    ///
    /// Common names in UTF8String, PrintableString or IA5String form are understood;
    /// a name without a readable CN yields an empty common name.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let common_name = x509dn
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .filter(|attr| attr.oid == const_oid::db::rfc4519::CN)
            .find_map(|attr| {
                if let Ok(s) = attr.value.decode_as::<Utf8StringRef<'_>>() {
                    Some(s.to_string())
                } else if let Ok(s) = attr.value.decode_as::<PrintableStringRef<'_>>() {
                    Some(s.to_string())
                } else {
                    attr.value
                        .decode_as::<Ia5StringRef<'_>>()
                        .ok()
                        .map(|s| s.to_string())
                }
            })
            .unwrap_or_default();

        DistinguishedName { common_name }
    }
}

/// Certificate validity period.
///
/// X.509 stores whole seconds, so the constructors drop any sub-second part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self, DevCaError> {
        Self::starting_at(OffsetDateTime::now_utc(), days)
    }

    /// Creates a validity period starting at `not_before` for the given number of days.
    ///
    /// Fails with `InvalidInput` when the end of the period is not a representable date.
    pub fn starting_at(not_before: OffsetDateTime, days: i64) -> Result<Self, DevCaError> {
        let not_before = truncate_to_seconds(not_before);
        let not_after = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|seconds| not_before.checked_add(Duration::seconds(seconds)))
            .ok_or_else(|| {
                DevCaError::InvalidInput(format!("{days} days from {not_before} is out of range"))
            })?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Checks that both ends can be written into a certificate.
    pub fn check(&self) -> Result<(), DevCaError> {
        self.to_x509_validity().map(|_| ())
    }

    pub(crate) fn to_x509_validity(&self) -> Result<x509_cert::time::Validity, DevCaError> {
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }

    pub(crate) fn from_x509_validity(validity: &x509_cert::time::Validity) -> Self {
        Self {
            not_before: from_x509_time(&validity.not_before),
            not_after: from_x509_time(&validity.not_after),
        }
    }
}

fn truncate_to_seconds(t: OffsetDateTime) -> OffsetDateTime {
    t - Duration::nanoseconds(i64::from(t.nanosecond()))
}

const SECONDS_PER_DAY: i64 = 86_400;

// RFC 5280: UTCTime through 2049, GeneralizedTime from 2050 on.
// der::DateTime starts at 1970 and ends at 9999.
fn to_x509_time(t: OffsetDateTime) -> Result<x509_cert::time::Time, DevCaError> {
    let year = u16::try_from(t.year()).map_err(|_| {
        DevCaError::InvalidInput(format!("validity time {t}: year out of range"))
    })?;
    let date_time = DateTime::new(
        year,
        t.month().into(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
    )
    .map_err(|e| DevCaError::InvalidInput(format!("validity time {t}: {e}")))?;

    match UtcTime::from_date_time(date_time) {
        Ok(utc) => Ok(x509_cert::time::Time::UtcTime(utc)),
        Err(_) => Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        )),
    }
}

fn from_x509_time(t: &x509_cert::time::Time) -> OffsetDateTime {
    match t {
        x509_cert::time::Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        x509_cert::time::Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, DevCaError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, DevCaError> {
        E::from_x509_extension_value(&self.value)
    }
}

/// A fully populated, ready-to-sign certificate descriptor.
///
/// Built only through [`CertificateTemplate::from_request`]; the CA and leaf
/// paths never share a mutable descriptor.
#[derive(Clone, Debug)]
pub struct CertificateTemplate {
    pub serial_number: SerialNumber,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub is_ca: bool,
    pub key_usage: KeyUsage,
    pub extended_key_usage: ExtendedKeyUsage,
    pub subject_alt_names: Vec<SanType>,
}

impl CertificateTemplate {
    /// Translate a request and a freshly drawn serial number into a template.
    ///
    /// Pure: no key material, no I/O.
    pub fn from_request(
        request: &IssuanceRequest,
        serial_number: SerialNumber,
    ) -> Result<Self, DevCaError> {
        request.validate()?;
        let subject = DistinguishedName::new(request.subject_common_name()?);

        let key_usage = if request.role.is_ca() {
            KeyUsage::certificate_authority()
        } else {
            KeyUsage::leaf()
        };

        let extended_key_usage = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
            ],
        };

        let subject_alt_names = request
            .role
            .hosts()
            .iter()
            .map(|host| SanType::from_host(host))
            .collect();

        Ok(Self {
            serial_number,
            validity: request.validity.clone(),
            subject,
            is_ca: request.role.is_ca(),
            key_usage,
            extended_key_usage,
            subject_alt_names,
        })
    }

    /// The extensions written into the certificate, in encoding order.
    ///
    /// Basic constraints and key usage are critical; the rest are not.
    pub fn extensions(
        &self,
        subject_key_id: &[u8],
        authority_key_id: Option<&[u8]>,
    ) -> Result<Vec<ExtensionParam>, DevCaError> {
        let basic_constraints = BasicConstraints {
            is_ca: self.is_ca,
            max_path_length: None,
        };

        let mut extensions = vec![
            ExtensionParam::from_extension(self.key_usage, true)?,
            ExtensionParam::from_extension(self.extended_key_usage.clone(), false)?,
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(SubjectKeyIdentifier(subject_key_id.to_vec()), false)?,
        ];

        if let Some(key_identifier) = authority_key_id {
            let authority_key_id = AuthorityKeyIdentifier {
                key_identifier: key_identifier.to_vec(),
            };
            extensions.push(ExtensionParam::from_extension(authority_key_id, false)?);
        }

        if !self.subject_alt_names.is_empty() {
            let san = SubjectAltName {
                names: self.subject_alt_names.clone(),
            };
            extensions.push(ExtensionParam::from_extension(san, false)?);
        }

        Ok(extensions)
    }
}
