// Copyright (c) 2023 The MobileCoin Foundation

//! Human readable summaries of evaluation failures

use crate::policy::{CertificateDetail, PolicyCheck};
use crate::x509::Certificate;
use serde::{Deserialize, Serialize};

/// A broad class of evaluation failure.
///
/// The display string completes a sentence about a certificate.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Serialize,
    displaydoc::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum FailureCategory {
    /// has an invalid issuer
    BadLinkage,
    /// has an unknown critical extension
    UnknownCriticalExtension,
    /// is not trusted
    UntrustedAnchor,
    /// is missing an intermediate certificate
    MissingIntermediate,
    /// does not match the hostname
    HostnameMismatch,
    /// does not meet the policy
    PolicyFailure,
    /// is expired or not yet valid
    InvalidTemporal,
    /// uses a weak key
    WeakKey,
    /// uses a weak hash
    WeakHash,
    /// has been revoked
    Revoked,
}

impl FailureCategory {
    fn of(check: PolicyCheck) -> Self {
        match check {
            PolicyCheck::IdLinkage => FailureCategory::BadLinkage,
            PolicyCheck::CriticalExtensions => FailureCategory::UnknownCriticalExtension,
            PolicyCheck::AnchorTrusted => FailureCategory::UntrustedAnchor,
            PolicyCheck::MissingIntermediate => FailureCategory::MissingIntermediate,
            PolicyCheck::SslHostname => FailureCategory::HostnameMismatch,
            PolicyCheck::BasicConstraints
            | PolicyCheck::KeyUsage
            | PolicyCheck::ExtendedKeyUsage
            | PolicyCheck::BlackListedLeaf
            | PolicyCheck::BlackListedKey => FailureCategory::PolicyFailure,
            PolicyCheck::TemporalValidity => FailureCategory::InvalidTemporal,
            PolicyCheck::WeakKeySize => FailureCategory::WeakKey,
            PolicyCheck::WeakSignature => FailureCategory::WeakHash,
            PolicyCheck::Revocation => FailureCategory::Revoked,
        }
    }

    /// The failure can not be fixed by trusting more certificates
    fn is_exclusive(self) -> bool {
        matches!(
            self,
            FailureCategory::BadLinkage | FailureCategory::UnknownCriticalExtension
        )
    }
}

/// The categories of the failed checks in `details`, in reporting order.
///
/// A bad linkage or an unknown critical extension is reported alone.
pub fn categorize(details: &[CertificateDetail]) -> Vec<FailureCategory> {
    let mut categories = details
        .iter()
        .flat_map(|detail| detail.keys())
        .map(|check| FailureCategory::of(*check))
        .collect::<Vec<_>>();
    categories.sort();
    categories.dedup();
    match categories.first() {
        Some(first) if first.is_exclusive() => vec![*first],
        _ => categories,
    }
}

/// A summary of one certificate of an evaluated chain
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateProperties {
    /// The common name of the certificate, or its full subject
    pub subject: String,
    /// What is wrong with the certificate
    pub categories: Vec<FailureCategory>,
}

fn display_name(certificate: &Certificate) -> String {
    certificate
        .common_name()
        .unwrap_or_else(|| certificate.subject().to_string())
}

/// Summarize each certificate of `chain` with its entry in `details`.
pub fn copy_properties(
    chain: &[Certificate],
    details: &[CertificateDetail],
) -> Vec<CertificateProperties> {
    chain
        .iter()
        .enumerate()
        .map(|(index, certificate)| CertificateProperties {
            subject: display_name(certificate),
            categories: details
                .get(index)
                .map(|detail| categorize(core::slice::from_ref(detail)))
                .unwrap_or_default(),
        })
        .collect()
}

/// A sentence describing why the chain of `leaf` failed, `None` if nothing
/// failed.
pub fn failure_description(leaf: &Certificate, details: &[CertificateDetail]) -> Option<String> {
    let categories = categorize(details)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let reasons = match categories.as_slice() {
        [] => return None,
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    };
    Some(format!("\u{201c}{}\u{201d} certificate {reasons}", display_name(leaf)))
}
