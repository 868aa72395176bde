// Copyright (c) 2023 The MobileCoin Foundation

//! The default policy rules

use super::{
    has_fatal_failure, CertificateDetail, Policy, PolicyCheck, PolicyEvaluator, PolicyKind,
    PolicyOutcome,
};
use crate::path::CertificatePath;
use crate::result::TrustInfo;
use crate::x509::{is_weak_signature_algorithm, Certificate, PublicKey};
use const_oid::ObjectIdentifier;
use core::time::Duration;

const OID_KP_SERVER_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1");
const OID_KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");
const OID_ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// RSA keys smaller than this are weak
const MIN_RSA_KEY_BITS: usize = 2048;

/// A compact rule set covering linkage, validity, CA constraints, SSL names
/// and blocked keys.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StandardPolicyEvaluator;

fn fail(detail: &mut CertificateDetail, check: PolicyCheck) {
    detail.insert(check, false);
}

fn is_weak_key(certificate: &Certificate) -> bool {
    matches!(certificate.public_key(None), Ok(key @ PublicKey::Rsa(_)) if key.bits() < MIN_RSA_KEY_BITS)
}

/// Can `certificate` act as a CA with `index - 1` CAs below it
fn is_valid_ca(certificate: &Certificate, index: usize) -> bool {
    match certificate.basic_constraints_ca() {
        Some(true) => certificate
            .path_length_constraint()
            .map_or(true, |max| index <= usize::from(max) + 1),
        Some(false) => false,
        // Version 1 CAs predate basic constraints
        None => !certificate.is_v3(),
    }
}

/// Match `hostname` against a `dNSName` which may start with a wildcard
/// for the left most label.
fn hostname_matches(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    if hostname.is_empty() {
        return false;
    }
    if pattern == hostname {
        return true;
    }
    let Some(suffix) = pattern.strip_prefix("*.") else {
        return false;
    };
    match hostname.split_once('.') {
        Some((label, rest)) => !label.is_empty() && rest == suffix && suffix.contains('.'),
        None => false,
    }
}

impl StandardPolicyEvaluator {
    fn certificate_checks(
        detail: &mut CertificateDetail,
        certificate: &Certificate,
        verify_time: Duration,
        is_anchor: bool,
    ) {
        if !is_anchor && !certificate.is_valid_at(verify_time) {
            fail(detail, PolicyCheck::TemporalValidity);
        }
        if !certificate.unknown_critical_extensions().is_empty() {
            fail(detail, PolicyCheck::CriticalExtensions);
        }
        if is_weak_key(certificate) {
            fail(detail, PolicyCheck::WeakKeySize);
        }
    }

    fn ca_checks(detail: &mut CertificateDetail, certificate: &Certificate, index: usize) {
        if !is_valid_ca(certificate, index) {
            fail(detail, PolicyCheck::BasicConstraints);
        }
        if certificate.key_usage_allows_cert_sign() == Some(false) {
            fail(detail, PolicyCheck::KeyUsage);
        }
    }

    fn ssl_checks(detail: &mut CertificateDetail, leaf: &Certificate, policies: &[Policy]) {
        for policy in policies {
            let PolicyKind::Ssl { server, hostname } = &policy.kind else {
                continue;
            };
            if let Some(hostname) = hostname {
                if !leaf
                    .dns_names()
                    .iter()
                    .any(|name| hostname_matches(name, hostname))
                {
                    fail(detail, PolicyCheck::SslHostname);
                }
            }
            if let Some(usages) = leaf.extended_key_usage() {
                let required = if *server {
                    OID_KP_SERVER_AUTH
                } else {
                    OID_KP_CLIENT_AUTH
                };
                if !usages.contains(&required) && !usages.contains(&OID_ANY_EXTENDED_KEY_USAGE) {
                    fail(detail, PolicyCheck::ExtendedKeyUsage);
                }
            }
        }
    }

    fn blocked_key_checks(
        detail: &mut CertificateDetail,
        certificate: &Certificate,
        index: usize,
        policies: &[Policy],
    ) {
        if policies.iter().any(|policy| policy.blocks(certificate)) {
            let check = if index == 0 {
                PolicyCheck::BlackListedLeaf
            } else {
                PolicyCheck::BlackListedKey
            };
            fail(detail, check);
        }
    }
}

impl PolicyEvaluator for StandardPolicyEvaluator {
    fn evaluate(
        &self,
        path: &CertificatePath,
        policies: &[Policy],
        verify_time: Duration,
    ) -> PolicyOutcome {
        let certificates = path.certificates();
        let root_index = certificates.len() - 1;
        let mut details = vec![CertificateDetail::new(); certificates.len()];

        if !path.is_anchored() {
            let check = if path.is_root_self_signed() {
                PolicyCheck::AnchorTrusted
            } else {
                PolicyCheck::MissingIntermediate
            };
            fail(&mut details[root_index], check);
        }

        for (index, pair) in certificates.windows(2).enumerate() {
            let unverified = index >= path.last_verified_signer();
            if unverified || !pair[0].could_be_issued_by(&pair[1]) {
                fail(&mut details[index], PolicyCheck::IdLinkage);
            }
        }

        for (index, certificate) in certificates.iter().enumerate() {
            let detail = &mut details[index];
            let is_anchor = path.is_anchored() && index == root_index;
            Self::certificate_checks(detail, certificate, verify_time, is_anchor);
            if !is_anchor && is_weak_signature_algorithm(certificate.signature_algorithm()) {
                fail(detail, PolicyCheck::WeakSignature);
            }
            if index > 0 && !is_anchor {
                Self::ca_checks(detail, certificate, index);
            }
            Self::blocked_key_checks(detail, certificate, index, policies);
        }

        Self::ssl_checks(&mut details[0], &certificates[0], policies);

        let accepted = details.iter().all(CertificateDetail::is_empty);
        let fatal = has_fatal_failure(&details);
        let optionally_ev = policies.iter().any(|policy| policy.extended_validation);
        let is_ev = optionally_ev && accepted && path.is_anchored();
        let info = TrustInfo {
            extended_validation: is_ev,
            organization_name: if is_ev {
                certificates[0].organization_name()
            } else {
                None
            },
            ..TrustInfo::default()
        };

        PolicyOutcome {
            accepted,
            details,
            info,
            is_ev,
            optionally_ev,
            fatal,
        }
    }

    fn leaf_checks(
        &self,
        leaf: &Certificate,
        policies: &[Policy],
        verify_time: Duration,
    ) -> CertificateDetail {
        let mut detail = self.structural_leaf_checks(leaf, policies, verify_time);
        Self::ssl_checks(&mut detail, leaf, policies);
        detail
    }

    fn structural_leaf_checks(
        &self,
        leaf: &Certificate,
        policies: &[Policy],
        verify_time: Duration,
    ) -> CertificateDetail {
        let mut detail = CertificateDetail::new();
        Self::certificate_checks(&mut detail, leaf, verify_time, false);
        Self::blocked_key_checks(&mut detail, leaf, 0, policies);
        detail
    }

    fn parent_checks(&self, path: &CertificatePath, verify_time: Duration) -> bool {
        let index = path.count() - 1;
        if index == 0 {
            return true;
        }
        let issuer = path.root();
        if !issuer.is_valid_at(verify_time) || is_weak_key(issuer) {
            return false;
        }
        if path.is_anchored() {
            return true;
        }
        let mut detail = CertificateDetail::new();
        Self::ca_checks(&mut detail, issuer, index);
        detail.is_empty()
    }
}
