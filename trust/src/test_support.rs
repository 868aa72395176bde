// Copyright (c) 2023 The MobileCoin Foundation

//! Certificates for unit tests

use crate::x509::Certificate;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa,
    KeyPair, KeyUsagePurpose,
};
use x509_cert::der::asn1::Ia5String;
use x509_cert::der::Encode;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};

pub const INTEL_ROOT_CA: &str = include_str!("../data/tests/intel_root_ca.pem");
pub const INTEL_INTERMEDIATE_CA: &str = include_str!("../data/tests/intel_processor_ca.pem");
pub const INTEL_LEAF: &str = include_str!("../data/tests/intel_pck_certificate.pem");

pub fn pem_to_der(pem: &str) -> Vec<u8> {
    let (_, der) = x509_cert::der::pem::decode_vec(pem.as_bytes()).expect("Failed to decode PEM");
    der
}

pub fn intel_certificate(pem: &str) -> Certificate {
    Certificate::from_pem(pem).expect("Failed to parse certificate")
}

/// A certificate along with what is needed to issue other certificates
pub struct TestIssuer {
    pub certificate: Certificate,
    rcgen_certificate: rcgen::Certificate,
    key: KeyPair,
}

impl TestIssuer {
    fn new(rcgen_certificate: rcgen::Certificate, key: KeyPair) -> Self {
        let certificate = Certificate::try_from(rcgen_certificate.der().as_ref())
            .expect("Failed to parse generated certificate");
        Self {
            certificate,
            rcgen_certificate,
            key,
        }
    }

    fn issue(&self, params: CertificateParams, key: &KeyPair) -> rcgen::Certificate {
        params
            .signed_by(key, &self.rcgen_certificate, &self.key)
            .expect("Failed to sign certificate")
    }
}

fn params(common_name: &str, is_ca: bool) -> CertificateParams {
    params_with_dns(common_name, is_ca, Vec::new())
}

fn params_with_dns(common_name: &str, is_ca: bool, dns_names: Vec<String>) -> CertificateParams {
    let mut params =
        CertificateParams::new(dns_names).expect("Failed to create certificate params");
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    if is_ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
    }
    params.use_authority_key_identifier_extension = true;
    params
}

fn key() -> KeyPair {
    KeyPair::generate().expect("Failed to generate key")
}

fn to_certificate(certificate: &rcgen::Certificate) -> Certificate {
    Certificate::try_from(certificate.der().as_ref()).expect("Failed to parse generated certificate")
}

/// A self signed CA
pub fn root(common_name: &str) -> TestIssuer {
    let key = key();
    let certificate = params(common_name, true)
        .self_signed(&key)
        .expect("Failed to self sign certificate");
    TestIssuer::new(certificate, key)
}

/// A CA issued by `issuer`
pub fn intermediate(common_name: &str, issuer: &TestIssuer) -> TestIssuer {
    let key = key();
    let certificate = issuer.issue(params(common_name, true), &key);
    TestIssuer::new(certificate, key)
}

/// A CA issued by `issuer` that expired at the start of 2020
pub fn expired_intermediate(common_name: &str, issuer: &TestIssuer) -> TestIssuer {
    let key = key();
    let mut params = params(common_name, true);
    params.not_before = rcgen::date_time_ymd(2010, 1, 1);
    params.not_after = rcgen::date_time_ymd(2020, 1, 1);
    let certificate = issuer.issue(params, &key);
    TestIssuer::new(certificate, key)
}

/// `ca` issued again by `issuer`, keeping its subject and key but expired at
/// the start of 2020
pub fn expired_reissue(common_name: &str, ca: &TestIssuer, issuer: &TestIssuer) -> Certificate {
    let mut params = params(common_name, true);
    params.not_before = rcgen::date_time_ymd(2010, 1, 1);
    params.not_after = rcgen::date_time_ymd(2020, 1, 1);
    let certificate = params
        .signed_by(&ca.key, &issuer.rcgen_certificate, &issuer.key)
        .expect("Failed to sign certificate");
    to_certificate(&certificate)
}

/// `ca` signed by its own key, keeping its subject
pub fn self_signed_reissue(common_name: &str, ca: &TestIssuer) -> Certificate {
    let certificate = params(common_name, true)
        .self_signed(&ca.key)
        .expect("Failed to self sign certificate");
    to_certificate(&certificate)
}

/// An end entity certificate issued by `issuer`
pub fn leaf(common_name: &str, issuer: &TestIssuer) -> Certificate {
    to_certificate(&issuer.issue(params(common_name, false), &key()))
}

/// An end entity certificate with `dns_name` as both common name and
/// subject alternative name
pub fn leaf_with_dns(dns_name: &str, issuer: &TestIssuer) -> Certificate {
    let params = params_with_dns(dns_name, false, vec![dns_name.to_string()]);
    to_certificate(&issuer.issue(params, &key()))
}

/// An end entity certificate with the unknown critical extension `1.2.3.4`
pub fn leaf_with_critical_extension(common_name: &str, issuer: &TestIssuer) -> Certificate {
    let mut params = params(common_name, false);
    let mut extension = CustomExtension::from_oid_content(&[1, 2, 3, 4], vec![0x05, 0x00]);
    extension.set_criticality(true);
    params.custom_extensions.push(extension);
    to_certificate(&issuer.issue(params, &key()))
}

/// An end entity certificate whose authority information access points at
/// `url` for its issuer
pub fn leaf_with_ca_issuer(common_name: &str, issuer: &TestIssuer, url: &str) -> Certificate {
    let mut params = params(common_name, false);
    let access = AuthorityInfoAccessSyntax(vec![AccessDescription {
        access_method: const_oid::ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2"),
        access_location: GeneralName::UniformResourceIdentifier(
            Ia5String::new(url).expect("Invalid URL"),
        ),
    }]);
    let content = access.to_der().expect("Failed to encode access");
    params
        .custom_extensions
        .push(CustomExtension::from_oid_content(&[1, 3, 6, 1, 5, 5, 7, 1, 1], content));
    to_certificate(&issuer.issue(params, &key()))
}

/// Two CAs which issued each other
pub fn cross_signed_pair(name_a: &str, name_b: &str) -> (Certificate, Certificate) {
    let key_a = key();
    let key_b = key();
    let temporary_b = params(name_b, true)
        .self_signed(&key_b)
        .expect("Failed to self sign certificate");
    let a = params(name_a, true)
        .signed_by(&key_a, &temporary_b, &key_b)
        .expect("Failed to sign certificate");
    let b = params(name_b, true)
        .signed_by(&key_b, &a, &key_a)
        .expect("Failed to sign certificate");
    (to_certificate(&a), to_certificate(&b))
}
