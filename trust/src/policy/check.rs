// Copyright (c) 2023 The MobileCoin Foundation

//! The individual checks a policy evaluation reports on

use serde::{Deserialize, Serialize};

/// A check that failed for a certificate in a path.
///
/// The serialized names are the keys of exception entries.
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
pub enum PolicyCheck {
    /// The root is not a trusted anchor
    AnchorTrusted,
    /// The issuer of the root could not be found
    MissingIntermediate,
    /// The certificate is not linked to its issuer
    IdLinkage,
    /// The certificate is not valid at the verification time
    TemporalValidity,
    /// The certificate has a critical extension that is not understood
    CriticalExtensions,
    /// The certificate key is too small
    WeakKeySize,
    /// The certificate is signed with a weak hash algorithm
    WeakSignature,
    /// The certificate is not allowed to be a certificate authority
    BasicConstraints,
    /// The certificate key is not allowed to sign certificates
    KeyUsage,
    /// The certificate does not match the hostname
    #[serde(rename = "SSLHostname")]
    SslHostname,
    /// The certificate is not allowed for this purpose
    ExtendedKeyUsage,
    /// The leaf key is blocked
    BlackListedLeaf,
    /// An issuer key is blocked
    BlackListedKey,
    /// The certificate has been revoked
    Revocation,
}

impl PolicyCheck {
    /// Failures of this check can never be overridden by exceptions
    pub fn is_fatal(self) -> bool {
        matches!(self, PolicyCheck::BlackListedLeaf | PolicyCheck::BlackListedKey)
    }
}
