// Copyright (c) 2023 The MobileCoin Foundation

//! Shared handle to a parsed X509 certificate

use super::name::{attribute_string, NormalizedName};
use super::{Error, PublicKey, Result, Signature, OID_EC_PUBLIC_KEY};
use const_oid::ObjectIdentifier;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::time::Duration;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use x509_cert::certificate::Version;
use x509_cert::der::asn1::AnyRef;
use x509_cert::der::{Any, Decode, DecodePem, Encode, Header, SliceReader};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityInfoAccessSyntax, AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage,
    KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::Certificate as X509Certificate;

const OID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");
const OID_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");
const OID_SUBJECT_ALT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.17");
const OID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");
const OID_CRL_DISTRIBUTION_POINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.31");
const OID_CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");
const OID_AUTHORITY_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.35");
const OID_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");
const OID_AUTHORITY_INFO_ACCESS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");
const OID_AD_CA_ISSUERS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");

/// A parsed X509 certificate.
///
/// Cloning is cheap, every clone shares the same parsed contents. Two
/// certificates are equal when their DER encodings are identical.
#[derive(Clone)]
pub struct Certificate(Arc<Parsed>);

struct Parsed {
    der: Vec<u8>,
    tbs: Vec<u8>,
    certificate: X509Certificate,
    subject: NormalizedName,
    issuer: NormalizedName,
    sha1: [u8; 20],
    spki_sha256: [u8; 32],
    extensions: KnownExtensions,
}

/// The extensions needed during path building and policy evaluation
#[derive(Debug, Default)]
struct KnownExtensions {
    basic_constraints: Option<BasicConstraints>,
    key_usage: Option<KeyUsage>,
    extended_key_usage: Option<Vec<ObjectIdentifier>>,
    subject_key_identifier: Option<Vec<u8>>,
    authority_key_identifier: Option<Vec<u8>>,
    dns_names: Vec<String>,
    ca_issuer_urls: Vec<String>,
    unknown_critical: Vec<ObjectIdentifier>,
}

impl KnownExtensions {
    fn from_extensions(extensions: &[Extension]) -> Self {
        let mut known = KnownExtensions::default();
        for extension in extensions {
            let bytes = extension.extn_value.as_bytes();
            let recognized = match extension.extn_id {
                OID_BASIC_CONSTRAINTS => BasicConstraints::from_der(bytes)
                    .map(|constraints| known.basic_constraints = Some(constraints))
                    .is_ok(),
                OID_KEY_USAGE => KeyUsage::from_der(bytes)
                    .map(|usage| known.key_usage = Some(usage))
                    .is_ok(),
                OID_EXTENDED_KEY_USAGE => ExtendedKeyUsage::from_der(bytes)
                    .map(|usage| known.extended_key_usage = Some(usage.0))
                    .is_ok(),
                OID_SUBJECT_KEY_IDENTIFIER => SubjectKeyIdentifier::from_der(bytes)
                    .map(|ski| known.subject_key_identifier = Some(ski.0.as_bytes().to_vec()))
                    .is_ok(),
                OID_AUTHORITY_KEY_IDENTIFIER => AuthorityKeyIdentifier::from_der(bytes)
                    .map(|aki| {
                        known.authority_key_identifier =
                            aki.key_identifier.map(|id| id.as_bytes().to_vec())
                    })
                    .is_ok(),
                OID_SUBJECT_ALT_NAME => SubjectAltName::from_der(bytes)
                    .map(|san| {
                        known.dns_names = san
                            .0
                            .iter()
                            .filter_map(|name| match name {
                                GeneralName::DnsName(dns) => Some(dns.to_string()),
                                _ => None,
                            })
                            .collect()
                    })
                    .is_ok(),
                OID_AUTHORITY_INFO_ACCESS => AuthorityInfoAccessSyntax::from_der(bytes)
                    .map(|aia| {
                        known.ca_issuer_urls = aia
                            .0
                            .iter()
                            .filter(|access| access.access_method == OID_AD_CA_ISSUERS)
                            .filter_map(|access| match &access.access_location {
                                GeneralName::UniformResourceIdentifier(uri) => {
                                    Some(uri.to_string())
                                }
                                _ => None,
                            })
                            .collect()
                    })
                    .is_ok(),
                OID_CRL_DISTRIBUTION_POINTS | OID_CERTIFICATE_POLICIES => true,
                _ => false,
            };
            if extension.critical && !recognized {
                known.unknown_critical.push(extension.extn_id);
            }
        }
        known
    }
}

impl Certificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let certificate = X509Certificate::from_der(&der)?;
        let tbs = tbs_bytes(&der)?;
        let tbs_certificate = &certificate.tbs_certificate;
        let subject = NormalizedName::from(&tbs_certificate.subject);
        let issuer = NormalizedName::from(&tbs_certificate.issuer);
        let spki_der = tbs_certificate.subject_public_key_info.to_der()?;
        let extensions = tbs_certificate
            .extensions
            .as_deref()
            .map(KnownExtensions::from_extensions)
            .unwrap_or_default();
        Ok(Self(Arc::new(Parsed {
            sha1: Sha1::digest(&der).into(),
            spki_sha256: Sha256::digest(spki_der).into(),
            der,
            tbs,
            certificate,
            subject,
            issuer,
            extensions,
        })))
    }

    /// Parse a PEM encoded certificate.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let certificate = X509Certificate::from_pem(pem)?;
        Self::from_der(certificate.to_der()?)
    }

    /// The DER encoding of the full certificate
    pub fn der(&self) -> &[u8] {
        &self.0.der
    }

    /// The DER encoding of the "to be signed" portion of the certificate
    pub fn tbs_der(&self) -> &[u8] {
        &self.0.tbs
    }

    /// The parsed certificate
    pub fn certificate(&self) -> &X509Certificate {
        &self.0.certificate
    }

    /// The subject name as encoded
    pub fn subject(&self) -> &Name {
        &self.0.certificate.tbs_certificate.subject
    }

    /// The issuer name as encoded
    pub fn issuer(&self) -> &Name {
        &self.0.certificate.tbs_certificate.issuer
    }

    /// The subject name prepared for comparison
    pub fn normalized_subject(&self) -> &NormalizedName {
        &self.0.subject
    }

    /// The issuer name prepared for comparison
    pub fn normalized_issuer(&self) -> &NormalizedName {
        &self.0.issuer
    }

    /// The serial number bytes as encoded in the certificate
    pub fn serial_number(&self) -> &[u8] {
        self.0.certificate.tbs_certificate.serial_number.as_bytes()
    }

    /// Is this a version 3 certificate
    pub fn is_v3(&self) -> bool {
        self.0.certificate.tbs_certificate.version == Version::V3
    }

    /// Start of the validity period as a duration since the unix epoch
    pub fn not_before(&self) -> Duration {
        self.0
            .certificate
            .tbs_certificate
            .validity
            .not_before
            .to_unix_duration()
    }

    /// End of the validity period as a duration since the unix epoch
    pub fn not_after(&self) -> Duration {
        self.0
            .certificate
            .tbs_certificate
            .validity
            .not_after
            .to_unix_duration()
    }

    /// Is `time`, since the unix epoch, within the validity period.
    ///
    /// Both ends of the period are inclusive.
    pub fn is_valid_at(&self, time: Duration) -> bool {
        self.not_before() <= time && time <= self.not_after()
    }

    /// The subject public key info
    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.0.certificate.tbs_certificate.subject_public_key_info
    }

    /// The public key of this certificate.
    ///
    /// `inherited` provides the elliptic curve domain parameters when this
    /// certificate's key omits them.
    pub fn public_key(&self, inherited: Option<&Any>) -> Result<PublicKey> {
        PublicKey::from_subject_public_key_info(self.subject_public_key_info(), inherited)
    }

    /// The elliptic curve domain parameters of the subject key, if present.
    pub fn key_parameters(&self) -> Option<&Any> {
        let algorithm = &self.subject_public_key_info().algorithm;
        if algorithm.oid == OID_EC_PUBLIC_KEY {
            algorithm.parameters.as_ref()
        } else {
            None
        }
    }

    /// The algorithm the issuer signed this certificate with
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.0.certificate.signature_algorithm
    }

    /// The raw signature bits, `None` if not octet aligned
    pub fn signature_bytes(&self) -> Option<&[u8]> {
        self.0.certificate.signature.as_bytes()
    }

    /// The decoded signature of this certificate
    pub fn signature(&self) -> Result<Signature> {
        let bytes = self.signature_bytes().ok_or(Error::SignatureDecoding)?;
        Signature::try_from_algorithm_and_signature(self.signature_algorithm(), bytes)
    }

    /// The subject key identifier extension value
    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.0.extensions.subject_key_identifier.as_deref()
    }

    /// The key identifier of the authority key identifier extension
    pub fn authority_key_identifier(&self) -> Option<&[u8]> {
        self.0.extensions.authority_key_identifier.as_deref()
    }

    /// The id-ad-caIssuers locations of the authority information access
    /// extension.
    pub fn ca_issuer_urls(&self) -> &[String] {
        &self.0.extensions.ca_issuer_urls
    }

    /// The `cA` flag of the basic constraints, `None` when the extension is
    /// absent.
    pub fn basic_constraints_ca(&self) -> Option<bool> {
        self.0
            .extensions
            .basic_constraints
            .as_ref()
            .map(|constraints| constraints.ca)
    }

    /// The `pathLenConstraint` of the basic constraints
    pub fn path_length_constraint(&self) -> Option<u8> {
        self.0
            .extensions
            .basic_constraints
            .as_ref()
            .and_then(|constraints| constraints.path_len_constraint)
    }

    /// Whether key usage allows signing certificates, `None` when the
    /// extension is absent.
    pub fn key_usage_allows_cert_sign(&self) -> Option<bool> {
        self.0
            .extensions
            .key_usage
            .as_ref()
            .map(|usage| usage.0.contains(KeyUsages::KeyCertSign))
    }

    /// The extended key usage purposes, `None` when the extension is absent.
    pub fn extended_key_usage(&self) -> Option<&[ObjectIdentifier]> {
        self.0.extensions.extended_key_usage.as_deref()
    }

    /// Critical extensions this crate does not understand
    pub fn unknown_critical_extensions(&self) -> &[ObjectIdentifier] {
        &self.0.extensions.unknown_critical
    }

    /// The `dNSName` entries of the subject alternative name extension
    pub fn dns_names(&self) -> &[String] {
        &self.0.extensions.dns_names
    }

    /// The first common name of the subject
    pub fn common_name(&self) -> Option<String> {
        attribute_string(self.subject(), OID_COMMON_NAME)
    }

    /// The first organization name of the subject
    pub fn organization_name(&self) -> Option<String> {
        attribute_string(self.subject(), OID_ORGANIZATION_NAME)
    }

    /// SHA-1 digest of the DER encoding
    pub fn sha1_digest(&self) -> &[u8; 20] {
        &self.0.sha1
    }

    /// SHA-256 digest of the DER encoded subject public key info
    pub fn sha256_spki_digest(&self) -> &[u8; 32] {
        &self.0.spki_sha256
    }

    /// The issuer and subject names are the same
    pub fn is_self_issued(&self) -> bool {
        self.0.subject == self.0.issuer
    }

    /// Could `issuer` have issued this certificate.
    ///
    /// The issuer name must match the subject of `issuer`, and when both
    /// key identifiers are present they must match as well.
    pub fn could_be_issued_by(&self, issuer: &Certificate) -> bool {
        self.normalized_issuer() == issuer.normalized_subject()
            && self.key_identifier_matches(issuer) != Some(false)
    }

    /// Compare the authority key identifier of this certificate with the
    /// subject key identifier of `issuer`, `None` when either is missing.
    pub fn key_identifier_matches(&self, issuer: &Certificate) -> Option<bool> {
        let authority = self.authority_key_identifier()?;
        let subject = issuer.subject_key_identifier()?;
        Some(authority == subject)
    }
}

/// Slice the "to be signed" TLV out of the outer certificate SEQUENCE.
fn tbs_bytes(der: &[u8]) -> Result<Vec<u8>> {
    let outer = AnyRef::from_der(der)?;
    let contents = outer.value();
    let mut reader = SliceReader::new(contents)?;
    let header = Header::decode(&mut reader)?;
    let length = usize::try_from((header.encoded_len()? + header.length)?)?;
    contents
        .get(..length)
        .map(<[u8]>::to_vec)
        .ok_or(Error::CertificateDecoding(
            x509_cert::der::ErrorKind::Overlength.into(),
        ))
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.der == other.0.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.der.hash(state)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject().to_string())
            .field("sha1", &hex::encode(self.0.sha1))
            .finish()
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = Error;

    fn try_from(der: &[u8]) -> core::result::Result<Self, Self::Error> {
        Self::from_der(der)
    }
}

impl TryFrom<Vec<u8>> for Certificate {
    type Error = Error;

    fn try_from(der: Vec<u8>) -> core::result::Result<Self, Self::Error> {
        Self::from_der(der)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{self, pem_to_der, INTEL_INTERMEDIATE_CA, INTEL_LEAF, INTEL_ROOT_CA};
    use assert_matches::assert_matches;
    use yare::parameterized;

    #[parameterized(
        root = { INTEL_ROOT_CA },
        intermediate = { INTEL_INTERMEDIATE_CA },
        leaf = { INTEL_LEAF },
    )]
    fn try_from_der(pem: &str) {
        let der = pem_to_der(pem);
        let certificate =
            Certificate::try_from(der.as_slice()).expect("Failed to parse certificate");
        assert_eq!(certificate.der(), der.as_slice());
        assert!(certificate.is_v3());
    }

    #[test]
    fn certificate_decoding_error_with_invalid_der() {
        let der = pem_to_der(INTEL_ROOT_CA);
        assert_matches!(
            Certificate::try_from(&der[1..]),
            Err(Error::CertificateDecoding(_))
        );
    }

    #[test]
    fn from_pem_matches_from_der() {
        let from_pem = test_support::intel_certificate(INTEL_LEAF);
        let from_der = Certificate::try_from(pem_to_der(INTEL_LEAF))
            .expect("Failed to parse certificate");
        assert_eq!(from_pem, from_der);
    }

    #[test]
    fn tbs_is_prefix_of_certificate_contents() {
        let certificate = test_support::intel_certificate(INTEL_INTERMEDIATE_CA);
        let tbs = certificate
            .certificate()
            .tbs_certificate
            .to_der()
            .expect("Failed to encode TBS");
        assert_eq!(certificate.tbs_der(), tbs.as_slice());
    }

    #[test]
    fn intel_chain_linkage() {
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let intermediate = test_support::intel_certificate(INTEL_INTERMEDIATE_CA);
        let leaf = test_support::intel_certificate(INTEL_LEAF);

        assert!(root.is_self_issued());
        assert!(!intermediate.is_self_issued());
        assert!(!leaf.is_self_issued());

        assert!(leaf.could_be_issued_by(&intermediate));
        assert!(intermediate.could_be_issued_by(&root));
        assert!(root.could_be_issued_by(&root));
        assert!(!leaf.could_be_issued_by(&root));
        assert_eq!(leaf.key_identifier_matches(&intermediate), Some(true));
        assert_eq!(
            leaf.authority_key_identifier(),
            intermediate.subject_key_identifier()
        );
    }

    #[test]
    fn intel_chain_signatures_verify() {
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let intermediate = test_support::intel_certificate(INTEL_INTERMEDIATE_CA);
        let leaf = test_support::intel_certificate(INTEL_LEAF);

        let verify = |subject: &Certificate, issuer: &Certificate| {
            let key = issuer.public_key(None).expect("Failed to decode key");
            let signature = subject.signature().expect("Failed to decode signature");
            key.verify(subject.tbs_der(), &signature)
        };

        assert_eq!(verify(&leaf, &intermediate), Ok(()));
        assert_eq!(verify(&intermediate, &root), Ok(()));
        assert_eq!(verify(&root, &root), Ok(()));
        assert_eq!(verify(&leaf, &root), Err(Error::SignatureVerification));
    }

    #[test]
    fn intel_extensions() {
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let intermediate = test_support::intel_certificate(INTEL_INTERMEDIATE_CA);
        let leaf = test_support::intel_certificate(INTEL_LEAF);

        assert_eq!(root.basic_constraints_ca(), Some(true));
        assert_eq!(root.path_length_constraint(), Some(1));
        assert_eq!(intermediate.path_length_constraint(), Some(0));
        assert_eq!(leaf.basic_constraints_ca(), Some(false));

        assert_eq!(intermediate.key_usage_allows_cert_sign(), Some(true));
        assert_eq!(leaf.key_usage_allows_cert_sign(), Some(false));

        // The SGX extensions are not critical
        assert!(leaf.unknown_critical_extensions().is_empty());
        assert!(leaf.ca_issuer_urls().is_empty());
        assert!(leaf.dns_names().is_empty());
        assert_eq!(leaf.extended_key_usage(), None);
    }

    #[test]
    fn intel_names() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        assert_eq!(
            leaf.common_name().as_deref(),
            Some("Intel SGX PCK Certificate")
        );
        assert_eq!(
            leaf.organization_name().as_deref(),
            Some("Intel Corporation")
        );
    }

    #[test]
    fn intel_validity() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        // 2022-06-13T21:46:34Z through 2029-06-13T21:46:34Z
        let not_before = Duration::from_secs(1_655_156_794);
        let not_after = Duration::from_secs(1_876_081_594);
        assert_eq!(leaf.not_before(), not_before);
        assert_eq!(leaf.not_after(), not_after);
        assert!(leaf.is_valid_at(not_before));
        assert!(leaf.is_valid_at(not_after));
        assert!(!leaf.is_valid_at(not_before - Duration::from_secs(1)));
        assert!(!leaf.is_valid_at(not_after + Duration::from_secs(1)));
    }

    #[test]
    fn equality_is_by_encoding() {
        let leaf_1 = test_support::intel_certificate(INTEL_LEAF);
        let leaf_2 = test_support::intel_certificate(INTEL_LEAF);
        let root = test_support::intel_certificate(INTEL_ROOT_CA);

        assert!(!Arc::ptr_eq(&leaf_1.0, &leaf_2.0));
        assert_eq!(leaf_1, leaf_2);
        assert_ne!(leaf_1, root);
        assert_eq!(leaf_1.sha1_digest(), leaf_2.sha1_digest());
        assert_ne!(leaf_1.sha1_digest(), root.sha1_digest());
    }

    #[test]
    fn generated_certificate_accessors() {
        let root = test_support::root("Accessor Root");
        let leaf = test_support::leaf_with_dns("www.example.com", &root);

        assert_eq!(leaf.dns_names(), ["www.example.com".to_string()]);
        assert_eq!(leaf.common_name().as_deref(), Some("www.example.com"));
        assert!(leaf.could_be_issued_by(&root.certificate));
        assert_eq!(root.certificate.basic_constraints_ca(), Some(true));
    }

    #[test]
    fn unknown_critical_extension_is_reported() {
        let root = test_support::root("Critical Root");
        let leaf = test_support::leaf_with_critical_extension("leaf", &root);
        assert_eq!(
            leaf.unknown_critical_extensions(),
            [ObjectIdentifier::new_unwrap("1.2.3.4")]
        );
    }

    #[test]
    fn ca_issuer_urls_from_authority_information_access() {
        let root = test_support::root("AIA Root");
        let leaf = test_support::leaf_with_ca_issuer("leaf", &root, "http://ca.example.com/root.der");
        assert_eq!(
            leaf.ca_issuer_urls(),
            ["http://ca.example.com/root.der".to_string()]
        );
    }
}
