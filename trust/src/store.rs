// Copyright (c) 2023 The MobileCoin Foundation

//! Lookup of certificates by subject

use crate::x509::{Certificate, NormalizedName};
use core::fmt::Debug;
use std::collections::HashMap;

/// A read only collection of certificates, like the system trust anchors.
pub trait CertificateStore: Debug + Send + Sync {
    /// All certificates whose subject is `subject`
    fn find_by_subject(&self, subject: &NormalizedName) -> Vec<Certificate>;

    /// Is this exact certificate in the store
    fn contains(&self, certificate: &Certificate) -> bool;
}

/// An in memory [`CertificateStore`].
///
/// Certificates are bucketed by the digest of their normalized subject.
#[derive(Clone, Debug, Default)]
pub struct CertificateTable {
    buckets: HashMap<[u8; 32], Vec<Certificate>>,
    len: usize,
}

impl CertificateTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `certificate`, returns `false` if it was already present.
    pub fn insert(&mut self, certificate: Certificate) -> bool {
        let bucket = self
            .buckets
            .entry(certificate.normalized_subject().digest())
            .or_default();
        if bucket.contains(&certificate) {
            return false;
        }
        bucket.push(certificate);
        self.len += 1;
        true
    }

    /// The number of certificates in the table
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the table empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn bucket(&self, subject: &NormalizedName) -> &[Certificate] {
        self.buckets
            .get(&subject.digest())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl FromIterator<Certificate> for CertificateTable {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut table = Self::new();
        for certificate in iter {
            table.insert(certificate);
        }
        table
    }
}

impl CertificateStore for CertificateTable {
    fn find_by_subject(&self, subject: &NormalizedName) -> Vec<Certificate> {
        self.bucket(subject)
            .iter()
            .filter(|certificate| certificate.normalized_subject() == subject)
            .cloned()
            .collect()
    }

    fn contains(&self, certificate: &Certificate) -> bool {
        self.bucket(certificate.normalized_subject())
            .iter()
            .any(|candidate| candidate.der() == certificate.der())
    }
}
