// Copyright (c) 2023 The MobileCoin Foundation

//! The outcome of a trust evaluation

use crate::policy::CertificateDetail;
use crate::x509::Certificate;
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// The trust verdict
#[derive(Clone, Copy, Debug, Deserialize, Serialize, displaydoc::Display, PartialEq, Eq, Hash)]
pub enum TrustResultType {
    /// The evaluation has not produced a verdict
    Invalid,
    /// The user chose to trust the chain despite its failures
    Proceed,
    /// The chain is trusted
    Unspecified,
    /// The chain is not trusted, the failures may be overridden
    RecoverableTrustFailure,
    /// The chain is not trusted, the failures can not be overridden
    FatalTrustFailure,
    /// The evaluation failed for reasons other than trust
    OtherError,
}

impl TrustResultType {
    /// Does the verdict allow the chain to be used
    pub fn is_trusted(self) -> bool {
        matches!(self, TrustResultType::Proceed | TrustResultType::Unspecified)
    }
}

/// Information about the evaluated chain
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrustInfo {
    /// The chain qualified for extended validation
    pub extended_validation: bool,
    /// The organization of the leaf, reported for extended validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Revocation status was checked
    pub revocation_checked: bool,
    /// Until when the revocation status is known, seconds since the unix
    /// epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_valid_until: Option<Duration>,
}

/// The result of evaluating a chain.
///
/// Shared through an `Arc`, an evaluation that is not invalidated hands out
/// the same result again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustResult {
    pub(crate) verdict: TrustResultType,
    pub(crate) chain: Vec<Certificate>,
    pub(crate) details: Vec<CertificateDetail>,
    pub(crate) info: TrustInfo,
    pub(crate) anchored: bool,
    pub(crate) score: i64,
    pub(crate) evaluated_at: Duration,
    pub(crate) valid_until: Duration,
}

impl TrustResult {
    /// The verdict
    pub fn verdict(&self) -> TrustResultType {
        self.verdict
    }

    /// The chosen chain, leaf first
    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    /// The failed checks of each certificate in [`Self::chain`]
    pub fn details(&self) -> &[CertificateDetail] {
        &self.details
    }

    /// Information about the chain
    pub fn info(&self) -> &TrustInfo {
        &self.info
    }

    /// Did the chain fail a check which can never be overridden
    pub fn is_fatal(&self) -> bool {
        self.verdict == TrustResultType::FatalTrustFailure
    }

    /// Does the chain end in a trust anchor
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// The score of the chain, see [`crate::score`]
    pub fn score(&self) -> i64 {
        self.score
    }

    /// The time the chain was evaluated at, seconds since the unix epoch
    pub fn evaluated_at(&self) -> Duration {
        self.evaluated_at
    }

    /// The time the verdict stops being current, seconds since the unix
    /// epoch
    pub fn valid_until(&self) -> Duration {
        self.valid_until
    }
}
