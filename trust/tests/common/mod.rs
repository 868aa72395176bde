// Copyright (c) 2023 The MobileCoin Foundation

#![allow(dead_code)]

use mc_trust_evaluation::source::BoxFuture;
use mc_trust_evaluation::{Certificate, CertificateTable, FetchError, IssuerFetcher};
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa,
    KeyPair, KeyUsagePurpose,
};
use std::collections::HashMap;
use std::time::Duration;
use x509_cert::der::asn1::Ia5String;
use x509_cert::der::Encode;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};

const ID_AD_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";
const AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];

/// A CA certificate and its key
pub struct Issuer {
    pub certificate: Certificate,
    rcgen_certificate: rcgen::Certificate,
    key: KeyPair,
}

impl Issuer {
    fn new(rcgen_certificate: rcgen::Certificate, key: KeyPair) -> Self {
        let certificate = to_certificate(&rcgen_certificate);
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

fn params(common_name: &str, is_ca: bool, dns_names: Vec<String>) -> CertificateParams {
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

pub fn root(common_name: &str) -> Issuer {
    let key = key();
    let certificate = params(common_name, true, Vec::new())
        .self_signed(&key)
        .expect("Failed to self sign certificate");
    Issuer::new(certificate, key)
}

pub fn intermediate(common_name: &str, issuer: &Issuer) -> Issuer {
    let key = key();
    let certificate = issuer.issue(params(common_name, true, Vec::new()), &key);
    Issuer::new(certificate, key)
}

pub fn leaf(common_name: &str, issuer: &Issuer) -> Certificate {
    to_certificate(&issuer.issue(params(common_name, false, Vec::new()), &key()))
}

/// A server certificate for `dns_name`
pub fn server(dns_name: &str, issuer: &Issuer) -> Certificate {
    let params = params(dns_name, false, vec![dns_name.to_string()]);
    to_certificate(&issuer.issue(params, &key()))
}

/// A leaf naming `url` as the location of its issuer
pub fn leaf_with_ca_issuer(common_name: &str, issuer: &Issuer, url: &str) -> Certificate {
    let mut params = params(common_name, false, Vec::new());
    let access = AuthorityInfoAccessSyntax(vec![AccessDescription {
        access_method: const_oid::ObjectIdentifier::new_unwrap(ID_AD_CA_ISSUERS),
        access_location: GeneralName::UniformResourceIdentifier(
            Ia5String::new(url).expect("Invalid URL"),
        ),
    }]);
    let content = access.to_der().expect("Failed to encode access");
    params
        .custom_extensions
        .push(CustomExtension::from_oid_content(AUTHORITY_INFO_ACCESS, content));
    to_certificate(&issuer.issue(params, &key()))
}

pub fn table(certificates: &[&Certificate]) -> CertificateTable {
    certificates.iter().map(|c| (*c).clone()).collect()
}

/// Serves certificates by URL after a short delay
#[derive(Debug, Default)]
pub struct StaticFetcher {
    certificates: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, certificate: &Certificate) -> Self {
        self.certificates
            .insert(url.to_string(), certificate.der().to_vec());
        self
    }
}

impl IssuerFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let response = self
            .certificates
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport(url.to_string(), "not found".to_string()));
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            response
        })
    }
}
