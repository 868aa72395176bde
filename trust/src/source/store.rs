// Copyright (c) 2023 The MobileCoin Foundation

//! Sources backed by a [`CertificateStore`]

use super::{issuers_of, CertificateSource, ParentQuery};
use crate::store::CertificateStore;
use crate::x509::Certificate;
use std::sync::Arc;

/// Certificates the user or system keeps around, not trusted by themselves.
///
/// Membership is by subject and serial number.
#[derive(Clone, Debug)]
pub struct ItemSource {
    store: Arc<dyn CertificateStore>,
}

impl ItemSource {
    /// Look up parents in `store`
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }
}

impl CertificateSource for ItemSource {
    fn name(&self) -> &'static str {
        "item"
    }

    fn copy_parents(&self, certificate: &Certificate) -> ParentQuery {
        let candidates = self.store.find_by_subject(certificate.normalized_issuer());
        ParentQuery::Ready(issuers_of(certificate, candidates))
    }

    fn contains(&self, certificate: &Certificate) -> bool {
        self.store
            .find_by_subject(certificate.normalized_subject())
            .iter()
            .any(|candidate| candidate.serial_number() == certificate.serial_number())
    }
}

/// Which anchor store a [`AnchorStoreSource`] is backed by
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnchorKind {
    /// Anchors shipped with the system
    System,
    /// Anchors the user added
    User,
}

/// Trust anchors from an anchor store
#[derive(Clone, Debug)]
pub struct AnchorStoreSource {
    kind: AnchorKind,
    store: Arc<dyn CertificateStore>,
}

impl AnchorStoreSource {
    /// Anchors of `kind` held in `store`
    pub fn new(kind: AnchorKind, store: Arc<dyn CertificateStore>) -> Self {
        Self { kind, store }
    }

    /// The kind of anchors in this source
    pub fn kind(&self) -> AnchorKind {
        self.kind
    }
}

impl CertificateSource for AnchorStoreSource {
    fn name(&self) -> &'static str {
        match self.kind {
            AnchorKind::System => "system anchors",
            AnchorKind::User => "user anchors",
        }
    }

    fn copy_parents(&self, certificate: &Certificate) -> ParentQuery {
        let candidates = self.store.find_by_subject(certificate.normalized_issuer());
        ParentQuery::Ready(issuers_of(certificate, candidates))
    }

    fn contains(&self, certificate: &Certificate) -> bool {
        self.store.contains(certificate)
    }
}
