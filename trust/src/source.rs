// Copyright (c) 2023 The MobileCoin Foundation

//! Places the path builder looks for the issuers of a certificate.
//!
//! Local sources answer right away. Sources that need to go to the network
//! answer with a future, the builder suspends until it completes. A source
//! failing to produce parents is never an error, it produces no parents.

mod ca_issuer;
mod memory;
mod store;

pub use ca_issuer::{CaIssuerSource, FetchError, IssuerFetcher};
pub use memory::MemorySource;
pub use store::{AnchorKind, AnchorStoreSource, ItemSource};

use crate::x509::Certificate;
use core::fmt::{self, Debug};
use core::future::Future;
use core::pin::Pin;

/// A future which can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The possible issuers of a certificate
pub enum ParentQuery {
    /// The parents are available now
    Ready(Vec<Certificate>),
    /// The parents will be available when the future completes
    Pending(BoxFuture<'static, Vec<Certificate>>),
}

impl Debug for ParentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentQuery::Ready(parents) => f.debug_tuple("Ready").field(parents).finish(),
            ParentQuery::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// A collection of certificates which may issue other certificates
pub trait CertificateSource: Debug + Send + Sync {
    /// Short name used when logging
    fn name(&self) -> &'static str;

    /// The certificates which may have issued `certificate`.
    fn copy_parents(&self, certificate: &Certificate) -> ParentQuery;

    /// Is this exact certificate in the source.
    fn contains(&self, certificate: &Certificate) -> bool;
}

/// Keep the `candidates` that could have issued `certificate`.
///
/// Candidates whose subject key identifier matches the authority key
/// identifier of `certificate` come first, candidates contradicting it are
/// dropped.
pub(crate) fn issuers_of(certificate: &Certificate, candidates: Vec<Certificate>) -> Vec<Certificate> {
    let (mut matched, unknown): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .filter(|candidate| certificate.could_be_issued_by(candidate))
        .partition(|candidate| certificate.key_identifier_matches(candidate) == Some(true));
    matched.extend(unknown);
    matched
}
