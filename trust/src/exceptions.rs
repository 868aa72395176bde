// Copyright (c) 2023 The MobileCoin Foundation

//! Exceptions waive the failed checks of a specific certificate chain.
//!
//! Exceptions are captured from the details of an evaluation and later
//! handed back to accept the same failures. The first entry names the leaf
//! by its SHA-1 digest and carries the exceptions epoch at capture time, so
//! exceptions taken before an epoch reset no longer apply.

use crate::policy::{CertificateDetail, PolicyCheck};
use crate::x509::Certificate;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

/// The waived checks of one certificate in a chain
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// Hex SHA-1 digest of the leaf, only in the first entry
    #[serde(rename = "SHA1", default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    /// The exceptions epoch the exceptions were captured at, only in the
    /// first entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    /// The checks whose failure is accepted
    #[serde(flatten)]
    pub waived: BTreeMap<PolicyCheck, bool>,
}

impl ExceptionEntry {
    fn waives(&self, check: PolicyCheck) -> bool {
        self.waived.get(&check).copied().unwrap_or(false)
    }
}

/// The exceptions for a chain, one entry per certificate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Exceptions(Vec<ExceptionEntry>);

impl Exceptions {
    /// Waive every failed check in `details`, the details of the chain for
    /// `leaf`, at the exceptions `epoch`.
    pub fn from_details(leaf: &Certificate, details: &[CertificateDetail], epoch: u64) -> Self {
        let mut entries = details
            .iter()
            .map(|detail| ExceptionEntry {
                waived: detail.keys().map(|check| (*check, true)).collect(),
                ..ExceptionEntry::default()
            })
            .collect::<Vec<_>>();
        while entries.len() > 1 && entries.last().map_or(false, |entry| entry.waived.is_empty()) {
            entries.pop();
        }
        if entries.is_empty() {
            entries.push(ExceptionEntry::default());
        }
        entries[0].sha1 = Some(hex::encode(leaf.sha1_digest()));
        entries[0].epoch = Some(epoch);
        Self(entries)
    }

    /// Decode exceptions from their JSON form.
    ///
    /// # Errors
    /// - [`Error::Serde`] if `bytes` is not JSON
    /// - [`Error::MalformedExceptions`] if it is not a non empty list of
    ///   entries whose first entry names a leaf
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let entries: Vec<ExceptionEntry> =
            serde_json::from_value(value).map_err(|_| Error::MalformedExceptions)?;
        let digest = entries
            .first()
            .and_then(|entry| entry.sha1.as_deref())
            .ok_or(Error::MalformedExceptions)?;
        let mut decoded = [0u8; 20];
        hex::decode_to_slice(digest, &mut decoded).map_err(|_| Error::MalformedExceptions)?;
        Ok(Self(entries))
    }

    /// Encode the exceptions as JSON
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    /// The entries, leaf first
    pub fn entries(&self) -> &[ExceptionEntry] {
        &self.0
    }

    /// The epoch the exceptions were captured at, 0 if not recorded
    pub fn epoch(&self) -> u64 {
        self.0.first().and_then(|entry| entry.epoch).unwrap_or(0)
    }

    /// Were the exceptions captured for `leaf`
    pub fn matches_leaf(&self, leaf: &Certificate) -> bool {
        let Some(digest) = self.0.first().and_then(|entry| entry.sha1.as_deref()) else {
            return false;
        };
        let mut decoded = [0u8; 20];
        if hex::decode_to_slice(digest, &mut decoded).is_err() {
            return false;
        }
        decoded[..].ct_eq(&leaf.sha1_digest()[..]).into()
    }

    /// Is every failed check in `details` waived.
    ///
    /// Fatal checks are never waived.
    pub fn waives_all(&self, details: &[CertificateDetail]) -> bool {
        details.iter().enumerate().all(|(index, detail)| {
            detail.keys().all(|check| {
                !check.is_fatal()
                    && self
                        .0
                        .get(index)
                        .map_or(false, |entry| entry.waives(*check))
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{self, INTEL_LEAF, INTEL_ROOT_CA};
    use assert_matches::assert_matches;

    fn detail(checks: &[PolicyCheck]) -> CertificateDetail {
        checks.iter().map(|check| (*check, false)).collect()
    }

    #[test]
    fn captured_from_details() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let details = [
            detail(&[PolicyCheck::TemporalValidity]),
            detail(&[]),
            detail(&[PolicyCheck::AnchorTrusted]),
        ];
        let exceptions = Exceptions::from_details(&leaf, &details, 3);

        let entries = exceptions.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sha1, Some(hex::encode(leaf.sha1_digest())));
        assert_eq!(entries[0].epoch, Some(3));
        assert_eq!(entries[0].waived.get(&PolicyCheck::TemporalValidity), Some(&true));
        assert!(entries[1].waived.is_empty());
        assert_eq!(entries[1].sha1, None);
        assert!(exceptions.matches_leaf(&leaf));
        assert_eq!(exceptions.epoch(), 3);
        assert!(exceptions.waives_all(&details));
    }

    #[test]
    fn trailing_empty_entries_are_truncated() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let details = [detail(&[PolicyCheck::SslHostname]), detail(&[]), detail(&[])];
        let exceptions = Exceptions::from_details(&leaf, &details, 0);
        assert_eq!(exceptions.entries().len(), 1);

        let clean = Exceptions::from_details(&leaf, &[detail(&[]), detail(&[])], 0);
        assert_eq!(clean.entries().len(), 1);
        assert!(clean.entries()[0].waived.is_empty());
    }

    #[test]
    fn json_form() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let details = [detail(&[PolicyCheck::SslHostname])];
        let exceptions = Exceptions::from_details(&leaf, &details, 1);
        let json: serde_json::Value =
            serde_json::from_slice(&exceptions.encode().expect("Failed to encode"))
                .expect("Not JSON");
        assert_eq!(
            json,
            serde_json::json!([{
                "SHA1": hex::encode(leaf.sha1_digest()),
                "epoch": 1,
                "SSLHostname": true,
            }])
        );

        let decoded = Exceptions::decode(json.to_string().as_bytes()).expect("Failed to decode");
        assert_eq!(decoded, exceptions);
    }

    #[test]
    fn other_leaf_does_not_match() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let exceptions = Exceptions::from_details(&leaf, &[detail(&[])], 0);
        assert!(!exceptions.matches_leaf(&root));
    }

    #[test]
    fn unwaived_and_fatal_checks() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let captured = [detail(&[PolicyCheck::TemporalValidity])];
        let exceptions = Exceptions::from_details(&leaf, &captured, 0);

        assert!(!exceptions.waives_all(&[detail(&[PolicyCheck::SslHostname])]));
        assert!(!exceptions.waives_all(&[detail(&[]), detail(&[PolicyCheck::IdLinkage])]));

        let fatal = [detail(&[PolicyCheck::BlackListedLeaf])];
        let exceptions = Exceptions::from_details(&leaf, &fatal, 0);
        assert!(!exceptions.waives_all(&fatal));
    }

    #[test]
    fn missing_epoch_is_zero() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let json = format!(r#"[{{"SHA1": "{}"}}]"#, hex::encode(leaf.sha1_digest()));
        let exceptions = Exceptions::decode(json.as_bytes()).expect("Failed to decode");
        assert_eq!(exceptions.epoch(), 0);
        assert!(exceptions.matches_leaf(&leaf));
    }

    #[test]
    fn malformed_exceptions() {
        assert_matches!(Exceptions::decode(b"not json"), Err(Error::Serde(_)));
        assert_matches!(Exceptions::decode(b"{}"), Err(Error::MalformedExceptions));
        assert_matches!(Exceptions::decode(b"[]"), Err(Error::MalformedExceptions));
        assert_matches!(
            Exceptions::decode(br#"[{"epoch": 1}]"#),
            Err(Error::MalformedExceptions)
        );
        assert_matches!(
            Exceptions::decode(br#"[{"SHA1": "abcd"}]"#),
            Err(Error::MalformedExceptions)
        );
        assert_matches!(
            Exceptions::decode(br#"[{"SHA1": "00", "NotACheck": true}]"#),
            Err(Error::MalformedExceptions)
        );
    }
}
