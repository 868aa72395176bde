// Copyright (c) 2023 The MobileCoin Foundation

//! Policies a certification path is evaluated against.
//!
//! A [`Policy`] selects the rules, a [`PolicyEvaluator`] applies them. The
//! path builder asks the evaluator three questions:
//! - [`PolicyEvaluator::structural_leaf_checks`], once for the leaf before
//!   searching.
//! - [`PolicyEvaluator::parent_checks`], for every newly found issuer.
//! - [`PolicyEvaluator::evaluate`], for complete paths.

mod check;
mod standard;

pub use check::PolicyCheck;
pub use standard::StandardPolicyEvaluator;

use crate::path::CertificatePath;
use crate::result::TrustInfo;
use crate::x509::Certificate;
use crate::Error;
use core::fmt::Debug;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The failed checks of one certificate, each mapped to `false`.
///
/// An empty detail means the certificate passed every check.
pub type CertificateDetail = BTreeMap<PolicyCheck, bool>;

/// A SHA-256 digest of a DER encoded subject public key info
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct BlockedKey(#[serde(with = "hex::serde")] pub [u8; 32]);

/// The rule set of a policy
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PolicyKind {
    /// Path construction and the generic certificate checks
    Basic,
    /// TLS peer validation
    #[serde(rename_all = "camelCase")]
    Ssl {
        /// Validating a server, otherwise a client
        server: bool,
        /// The name the leaf must be valid for
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hostname: Option<String>,
    },
}

/// A policy to evaluate trust against
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// The rules of this policy
    pub kind: PolicyKind,
    /// Keys which must not appear anywhere in the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_keys: Vec<BlockedKey>,
    /// Ask for extended validation
    #[serde(default)]
    pub extended_validation: bool,
}

impl Policy {
    /// The basic X509 policy
    pub fn basic() -> Self {
        Self {
            kind: PolicyKind::Basic,
            blocked_keys: Vec::new(),
            extended_validation: false,
        }
    }

    /// The SSL policy, `server` for validating servers and optionally the
    /// `hostname` the leaf must be valid for.
    pub fn ssl(server: bool, hostname: Option<&str>) -> Self {
        Self {
            kind: PolicyKind::Ssl {
                server,
                hostname: hostname.map(str::to_owned),
            },
            blocked_keys: Vec::new(),
            extended_validation: false,
        }
    }

    /// Block the key with the SHA-256 subject public key info `digest`
    pub fn with_blocked_key(mut self, digest: [u8; 32]) -> Self {
        self.blocked_keys.push(BlockedKey(digest));
        self
    }

    /// Request extended validation
    pub fn with_extended_validation(mut self) -> Self {
        self.extended_validation = true;
        self
    }

    pub(crate) fn blocks(&self, certificate: &Certificate) -> bool {
        let digest = certificate.sha256_spki_digest();
        self.blocked_keys.iter().any(|key| &key.0 == digest)
    }
}

impl TryFrom<&str> for Policy {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let policy = serde_json::from_str(value)?;
        Ok(policy)
    }
}

/// The result of evaluating a path against a set of policies
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Every check passed
    pub accepted: bool,
    /// The failed checks, one entry per certificate in the path
    pub details: Vec<CertificateDetail>,
    /// Information about the path
    pub info: TrustInfo,
    /// The path qualifies for extended validation
    pub is_ev: bool,
    /// Extended validation was requested but is not required
    pub optionally_ev: bool,
    /// A failed check can not be overridden
    pub fatal: bool,
}

/// Applies policies to certification paths.
pub trait PolicyEvaluator: Debug + Send + Sync {
    /// Evaluate the complete `path` against `policies` at `verify_time`.
    fn evaluate(
        &self,
        path: &CertificatePath,
        policies: &[Policy],
        verify_time: Duration,
    ) -> PolicyOutcome;

    /// The checks which only depend on the leaf.
    fn leaf_checks(
        &self,
        leaf: &Certificate,
        policies: &[Policy],
        verify_time: Duration,
    ) -> CertificateDetail;

    /// The subset of [`Self::leaf_checks`] which does not depend on the
    /// hostname or the extended key usage. A failure here makes the path
    /// builder consider rejected paths from the start.
    ///
    /// Defaults to every leaf check.
    fn structural_leaf_checks(
        &self,
        leaf: &Certificate,
        policies: &[Policy],
        verify_time: Duration,
    ) -> CertificateDetail {
        self.leaf_checks(leaf, policies, verify_time)
    }

    /// Static checks of the root of `path` as the issuer of the certificate
    /// before it, `false` if it should not be used as an issuer.
    fn parent_checks(&self, path: &CertificatePath, verify_time: Duration) -> bool;
}

/// Do any of the `details` have a fatal failure
pub fn has_fatal_failure(details: &[CertificateDetail]) -> bool {
    details
        .iter()
        .flat_map(|detail| detail.keys())
        .any(|check| check.is_fatal())
}
