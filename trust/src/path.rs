// Copyright (c) 2023 The MobileCoin Foundation

//! Certification paths from a leaf certificate towards a trust anchor.
//!
//! A [`CertificatePath`] is ordered leaf first. Extending a path with an
//! issuer produces a new path which shares every certificate link of the
//! path it came from, so the many partial paths of a search branching off
//! a common prefix cost one link per extension.

use crate::crypto::SignatureVerifier;
use crate::score;
use crate::x509::{self, Certificate, PublicKey};
use core::fmt;
use core::time::Duration;
use std::sync::Arc;

/// Outcome of verifying the signatures along a path
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerifyStatus {
    /// Every certificate is signed by the next one in the path
    Success,
    /// A signature does not verify, the path can never be valid
    Failed,
    /// A key or signature could not be used, the path may still be valid
    Unknown,
}

#[derive(Debug)]
struct Link {
    certificate: Certificate,
    // The link for the certificate this one issued, towards the leaf
    issued: Option<Arc<Link>>,
    count: usize,
}

/// An ordered sequence of certificates, index 0 is the leaf.
#[derive(Clone)]
pub struct CertificatePath {
    root: Arc<Link>,
    last_verified_signer: usize,
    self_issued: Option<usize>,
    is_self_signed: bool,
    is_anchored: bool,
    next_source: usize,
}

impl CertificatePath {
    /// A path with only `leaf`
    pub fn new(leaf: Certificate) -> Self {
        Self {
            root: Arc::new(Link {
                certificate: leaf,
                issued: None,
                count: 1,
            }),
            last_verified_signer: 0,
            self_issued: None,
            is_self_signed: false,
            is_anchored: false,
            next_source: 0,
        }
    }

    /// Create a new path, `parent_path` followed by `certificate`, or only
    /// `certificate` when there is no `parent_path`.
    pub fn create(parent_path: Option<&CertificatePath>, certificate: Certificate) -> Self {
        match parent_path {
            Some(path) => path.extend(certificate),
            None => Self::new(certificate),
        }
    }

    /// A new path with `issuer` appended as the root.
    ///
    /// The verification progress and self issued state carry over, the
    /// anchored state and the source cursor do not.
    pub fn extend(&self, issuer: Certificate) -> Self {
        Self {
            root: Arc::new(Link {
                certificate: issuer,
                issued: Some(self.root.clone()),
                count: self.root.count + 1,
            }),
            last_verified_signer: self.last_verified_signer,
            self_issued: self.self_issued,
            is_self_signed: self.is_self_signed,
            is_anchored: false,
            next_source: 0,
        }
    }

    /// The number of certificates in the path
    pub fn count(&self) -> usize {
        self.root.count
    }

    /// The certificate at `index`, the leaf is at 0.
    pub fn certificate_at(&self, index: usize) -> Option<&Certificate> {
        let steps = self.count().checked_sub(index + 1)?;
        let mut link = &self.root;
        for _ in 0..steps {
            link = link.issued.as_ref()?;
        }
        Some(&link.certificate)
    }

    /// The last certificate in the path
    pub fn root(&self) -> &Certificate {
        &self.root.certificate
    }

    /// The first certificate in the path
    pub fn leaf(&self) -> &Certificate {
        let mut link = &self.root;
        while let Some(issued) = &link.issued {
            link = issued;
        }
        &link.certificate
    }

    /// The certificates ordered from the leaf to the root
    pub fn certificates(&self) -> Vec<Certificate> {
        let mut certificates = Vec::with_capacity(self.count());
        let mut link = Some(&self.root);
        while let Some(current) = link {
            certificates.push(current.certificate.clone());
            link = current.issued.as_ref();
        }
        certificates.reverse();
        certificates
    }

    /// The index of `certificate` in the path.
    ///
    /// Certificates are compared by their encoding, so separately obtained
    /// copies of one certificate are found.
    pub fn index_of(&self, certificate: &Certificate) -> Option<usize> {
        let mut link = Some(&self.root);
        while let Some(current) = link {
            if &current.certificate == certificate {
                return Some(current.count - 1);
            }
            link = current.issued.as_ref();
        }
        None
    }

    /// Index up to which every certificate's signature has been verified by
    /// its issuer in the path.
    pub fn last_verified_signer(&self) -> usize {
        self.last_verified_signer
    }

    /// Has every link of the path been verified
    pub fn is_fully_verified(&self) -> bool {
        self.last_verified_signer + 1 == self.count()
    }

    /// Index of the first certificate found to be its own issuer
    pub fn self_issued_index(&self) -> Option<usize> {
        self.self_issued
    }

    /// Does the self issued certificate verify its own signature
    pub fn is_self_signed(&self) -> bool {
        self.is_self_signed
    }

    /// Is the root the self issued certificate and self signed
    pub fn is_root_self_signed(&self) -> bool {
        self.is_self_signed && self.self_issued == Some(self.count() - 1)
    }

    /// Does the path end in a trust anchor
    pub fn is_anchored(&self) -> bool {
        self.is_anchored
    }

    /// Record the root as its own issuer.
    ///
    /// Only the first self issued certificate of a path is recorded.
    pub fn mark_self_issued(&mut self) {
        if self.self_issued.is_none() {
            self.self_issued = Some(self.count() - 1);
        }
    }

    /// Record the root as a trust anchor
    pub fn mark_anchored(&mut self) {
        self.is_anchored = true;
    }

    /// Index of the next certificate source to ask for parents of the root
    pub fn next_source_index(&self) -> usize {
        self.next_source
    }

    pub(crate) fn set_next_source_index(&mut self, index: usize) {
        self.next_source = index;
    }

    /// The public key of the certificate at `index`.
    ///
    /// Elliptic curve keys without domain parameters take them from the
    /// closest certificate towards the root which has them.
    pub fn public_key_at(
        &self,
        index: usize,
        verifier: &dyn SignatureVerifier,
    ) -> Option<PublicKey> {
        let certificates = self.certificates();
        let certificate = certificates.get(index)?;
        let inherited = certificates[index..]
            .iter()
            .find_map(Certificate::key_parameters);
        verifier.extract_public_key(certificate, inherited)
    }

    /// Verify the signatures not yet verified.
    ///
    /// Progress is kept, so verifying an extended path only checks the new
    /// link. Also determines if the self issued certificate is self signed.
    pub fn verify(&mut self, verifier: &dyn SignatureVerifier) -> VerifyStatus {
        let certificates = self.certificates();
        while self.last_verified_signer + 1 < certificates.len() {
            let subject = self.last_verified_signer;
            let Some(key) = self.public_key_at(subject + 1, verifier) else {
                return VerifyStatus::Unknown;
            };
            match verifier.verify_signature(&certificates[subject], &key) {
                Ok(()) => self.last_verified_signer += 1,
                Err(x509::Error::UnsupportedAlgorithm) => return VerifyStatus::Unknown,
                Err(_) => return VerifyStatus::Failed,
            }
        }

        if let (Some(index), false) = (self.self_issued, self.is_self_signed) {
            self.is_self_signed = self
                .public_key_at(index, verifier)
                .map(|key| verifier.verify_signature(&certificates[index], &key).is_ok())
                .unwrap_or(false);
        }
        VerifyStatus::Success
    }

    /// Rank this path against other imperfect paths, higher is better.
    pub fn score(&self, verify_time: Duration) -> i64 {
        score::score(self, verify_time)
    }
}

/// Paths are equal when they hold the same certificates in the same order.
impl PartialEq for CertificatePath {
    fn eq(&self, other: &Self) -> bool {
        self.count() == other.count() && self.certificates() == other.certificates()
    }
}

impl Eq for CertificatePath {}

impl fmt::Debug for CertificatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificatePath")
            .field("certificates", &self.certificates())
            .field("last_verified_signer", &self.last_verified_signer)
            .field("self_issued", &self.self_issued)
            .field("is_self_signed", &self.is_self_signed)
            .field("is_anchored", &self.is_anchored)
            .finish()
    }
}
