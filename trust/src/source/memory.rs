// Copyright (c) 2023 The MobileCoin Foundation

//! Certificates supplied with the evaluation request

use super::{issuers_of, CertificateSource, ParentQuery};
use crate::x509::{Certificate, NormalizedName};
use std::collections::{HashMap, HashSet};

/// A fixed list of certificates indexed by subject.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    by_subject: HashMap<NormalizedName, Vec<Certificate>>,
    members: HashSet<Certificate>,
}

impl MemorySource {
    /// Index `certificates`, keeping the order they were given in for
    /// certificates with the same subject.
    pub fn new(certificates: impl IntoIterator<Item = Certificate>) -> Self {
        let mut source = Self::default();
        for certificate in certificates {
            if !source.members.insert(certificate.clone()) {
                continue;
            }
            source
                .by_subject
                .entry(certificate.normalized_subject().clone())
                .or_default()
                .push(certificate);
        }
        source
    }

    /// The number of distinct certificates
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Does the source have no certificates
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl CertificateSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn copy_parents(&self, certificate: &Certificate) -> ParentQuery {
        let candidates = self
            .by_subject
            .get(certificate.normalized_issuer())
            .cloned()
            .unwrap_or_default();
        ParentQuery::Ready(issuers_of(certificate, candidates))
    }

    fn contains(&self, certificate: &Certificate) -> bool {
        self.members.contains(certificate)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{self, INTEL_INTERMEDIATE_CA, INTEL_LEAF, INTEL_ROOT_CA};
    use assert_matches::assert_matches;

    fn ready(query: ParentQuery) -> Vec<Certificate> {
        assert_matches!(query, ParentQuery::Ready(parents) => parents)
    }

    #[test]
    fn parents_by_issuer_name() {
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let intermediate = test_support::intel_certificate(INTEL_INTERMEDIATE_CA);
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let source = MemorySource::new([leaf.clone(), intermediate.clone(), root.clone()]);

        assert_eq!(ready(source.copy_parents(&leaf)), vec![intermediate.clone()]);
        assert_eq!(ready(source.copy_parents(&intermediate)), vec![root.clone()]);
        // The root is its own parent
        assert_eq!(ready(source.copy_parents(&root)), vec![root]);
    }

    #[test]
    fn no_parents() {
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let source = MemorySource::new([leaf.clone()]);
        assert!(ready(source.copy_parents(&leaf)).is_empty());
    }

    #[test]
    fn contains_and_duplicates() {
        let root = test_support::intel_certificate(INTEL_ROOT_CA);
        let leaf = test_support::intel_certificate(INTEL_LEAF);
        let source = MemorySource::new([
            root.clone(),
            test_support::intel_certificate(INTEL_ROOT_CA),
        ]);

        assert_eq!(source.len(), 1);
        assert!(!source.is_empty());
        assert!(source.contains(&root));
        assert!(!source.contains(&leaf));
        assert!(MemorySource::default().is_empty());
    }
}
