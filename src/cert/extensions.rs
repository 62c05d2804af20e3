use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::DevCaError;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use devca::cert::extensions::{SanType, SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec![SanType::DnsName("example.com".to_string())] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError>
    where
        Self: Sized;
}

fn decoding_error(err: der::Error) -> DevCaError {
    DevCaError::CertificateDecodingError(err.to_string())
}

/// A single subject alternative name entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanType {
    DnsName(String),
    IpAddress(IpAddr),
}

impl SanType {
    /// Classify a host: a literal IP address becomes an IP entry, anything else a DNS name.
    ///
    /// IPv4-mapped IPv6 addresses collapse to their IPv4 form.
    pub fn from_host(host: &str) -> Self {
        match host.parse::<IpAddr>() {
            Ok(ip) => SanType::IpAddress(ip.to_canonical()),
            Err(_) => SanType::DnsName(host.to_string()),
        }
    }

    /// Checks that the entry can be written into a certificate.
    pub fn check(&self) -> Result<(), DevCaError> {
        self.to_general_name().map(|_| ())
    }

    fn to_general_name(&self) -> Result<GeneralName, DevCaError> {
        match self {
            SanType::DnsName(name) => Ia5String::try_from(name.clone())
                .map(GeneralName::DnsName)
                .map_err(|e| DevCaError::InvalidInput(format!("DNS name {name:?}: {e}"))),
            SanType::IpAddress(IpAddr::V4(ip)) => {
                Ok(GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?))
            }
            SanType::IpAddress(IpAddr::V6(ip)) => {
                Ok(GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?))
            }
        }
    }

    fn from_general_name(name: &GeneralName) -> Result<Self, DevCaError> {
        match name {
            GeneralName::DnsName(dns) => Ok(SanType::DnsName(dns.to_string())),
            GeneralName::IpAddress(octets) => match octets.as_bytes() {
                [a, b, c, d] => Ok(SanType::IpAddress(Ipv4Addr::new(*a, *b, *c, *d).into())),
                bytes => <[u8; 16]>::try_from(bytes)
                    .map(|v6| SanType::IpAddress(Ipv6Addr::from(v6).into()))
                    .map_err(|_| {
                        DevCaError::CertificateDecodingError(format!(
                            "IP address SAN with {} octets",
                            bytes.len()
                        ))
                    }),
            },
            _ => Err(DevCaError::CertificateDecodingError(
                "Unsupported general name type".to_string(),
            )),
        }
    }
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// Entries keep their order; DNS names and IP addresses may be interleaved.
#[derive(Debug, Clone, Default)]
pub struct SubjectAltName {
    pub names: Vec<SanType>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(SanType::to_general_name)
                .collect::<Result<Vec<_>, _>>()?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError> {
        let san =
            x509_cert::ext::pkix::SubjectAltName::from_der(extension).map_err(decoding_error)?;
        let names = san
            .0
            .iter()
            .map(SanType::from_general_name)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, DevCaError> {
        let bc =
            x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes).map_err(decoding_error)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// digitalSignature + keyCertSign.
    pub fn certificate_authority() -> Self {
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyCertSign)
    }

    /// digitalSignature + keyEncipherment.
    pub fn leaf() -> Self {
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
    }

    pub fn contains(&self, usage: KeyUsages) -> bool {
        self.0.contains(usage)
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let ku = X509KeyUsage(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError> {
        let ku = X509KeyUsage::from_der(extension).map_err(decoding_error)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
#[derive(Debug, Clone, Default)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError> {
        let eku =
            x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension).map_err(decoding_error)?;
        let usage = eku.0.iter().copied().map(ExtendedKeyUsageOption::from).collect();
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
///
/// Purposes this crate never issues are kept as their raw OID when read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    Other(ObjectIdentifier),
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::Other(oid) => oid,
        }
    }
}

impl From<ObjectIdentifier> for ExtendedKeyUsageOption {
    fn from(value: ObjectIdentifier) -> Self {
        match value {
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => ExtendedKeyUsageOption::ServerAuth,
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => ExtendedKeyUsageOption::ClientAuth,
            oid => ExtendedKeyUsageOption::Other(oid),
        }
    }
}

/// Represents the Subject Key Identifier (SKI) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.clone())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)
            .map_err(decoding_error)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the key identifier form is produced; the issuer name and serial
/// alternatives are ignored when reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, DevCaError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, DevCaError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)
            .map_err(decoding_error)?;

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_constraints_encoding_decoding() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(3),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original.is_ca, decoded.is_ca);
        assert_eq!(original.max_path_length, decoded.max_path_length);
    }

    #[test]
    fn test_san_keeps_order_and_kinds() {
        let original = SubjectAltName {
            names: vec![
                SanType::from_host("127.0.0.1"),
                SanType::from_host("example.com"),
                SanType::from_host("::1"),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(
            decoded.names,
            vec![
                SanType::IpAddress("127.0.0.1".parse().unwrap()),
                SanType::DnsName("example.com".to_string()),
                SanType::IpAddress("::1".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn test_ipv4_mapped_host_collapses_to_ipv4() {
        assert_eq!(
            SanType::from_host("::ffff:10.0.0.1"),
            SanType::IpAddress("10.0.0.1".parse().unwrap())
        );
    }

    #[test]
    fn test_non_ascii_dns_name_is_rejected() {
        let san = SubjectAltName {
            names: vec![SanType::from_host("bücher.example")],
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(DevCaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage::leaf();
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert!(decoded.contains(KeyUsages::KeyEncipherment));
        assert!(!decoded.contains(KeyUsages::KeyCertSign));
    }

    #[test]
    fn test_extended_key_usage_keeps_unknown_purposes() {
        let original = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::Other(const_oid::db::rfc5912::ID_KP_CODE_SIGNING),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original.usage, decoded.usage);
    }

    #[test]
    fn test_authority_key_identifier_encoding_decoding() {
        let original = AuthorityKeyIdentifier {
            key_identifier: vec![1, 2, 3, 4, 5],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = AuthorityKeyIdentifier::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }
}
