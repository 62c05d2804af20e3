#![allow(dead_code)]

use devca::cert::CertificateWithPrivateKey;
use devca::cert::params::{IssuanceRequest, Role, Validity};
use devca::signer;

/// Small keys keep RSA generation fast; the openssl tests use 2048.
pub const TEST_KEY_BITS: usize = 1024;

pub fn generate_ca_cert(bits: usize) -> CertificateWithPrivateKey {
    let request = IssuanceRequest::builder()
        .role(Role::CertificateAuthority)
        .key_bits(bits)
        .validity(Validity::for_days(3650).unwrap())
        .build();
    signer::issue_ca(&request).unwrap()
}

pub fn leaf_request(hosts: &[&str], bits: usize) -> IssuanceRequest {
    IssuanceRequest::builder()
        .role(Role::Leaf {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
        })
        .key_bits(bits)
        .validity(Validity::for_days(365).unwrap())
        .build()
}

pub fn generate_leaf_cert(
    ca: &CertificateWithPrivateKey,
    hosts: &[&str],
    bits: usize,
) -> CertificateWithPrivateKey {
    signer::issue_leaf(&leaf_request(hosts, bits), ca).unwrap()
}
