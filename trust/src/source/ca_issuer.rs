// Copyright (c) 2023 The MobileCoin Foundation

//! Issuers fetched from the authority information access of a certificate

use super::{issuers_of, BoxFuture, CertificateSource, ParentQuery};
use crate::x509::Certificate;
use core::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error fetching an issuer certificate
#[derive(Clone, Debug, displaydoc::Display, PartialEq, Eq)]
pub enum FetchError {
    /// Failed to fetch {0}: {1}
    Transport(String, String),
    /// Timed out fetching {0}
    Timeout(String),
}

/// Retrieves the contents of a CA issuers URL.
///
/// The transport is up to the implementation, the returned bytes are
/// expected to be a DER or PEM encoded certificate.
pub trait IssuerFetcher: Debug + Send + Sync {
    /// Fetch the contents of `url`
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>>;
}

/// Fetches issuers named by the id-ad-caIssuers access descriptions.
///
/// Never a source of anchors.
#[derive(Clone, Debug)]
pub struct CaIssuerSource {
    fetcher: Arc<dyn IssuerFetcher>,
}

impl CaIssuerSource {
    /// Fetch issuers with `fetcher`
    pub fn new(fetcher: Arc<dyn IssuerFetcher>) -> Self {
        Self { fetcher }
    }
}

fn is_http(url: &str) -> bool {
    url.get(..7)
        .map(|scheme| scheme.eq_ignore_ascii_case("http://"))
        .unwrap_or(false)
}

fn decode(bytes: &[u8]) -> Option<Certificate> {
    Certificate::try_from(bytes)
        .or_else(|_| Certificate::from_pem(bytes))
        .ok()
}

impl CertificateSource for CaIssuerSource {
    fn name(&self) -> &'static str {
        "ca issuers"
    }

    fn copy_parents(&self, certificate: &Certificate) -> ParentQuery {
        let urls = certificate
            .ca_issuer_urls()
            .iter()
            .filter(|url| is_http(url))
            .cloned()
            .collect::<Vec<_>>();
        if urls.is_empty() {
            return ParentQuery::Ready(Vec::new());
        }

        let fetcher = self.fetcher.clone();
        let certificate = certificate.clone();
        ParentQuery::Pending(Box::pin(async move {
            let mut parents = Vec::new();
            for url in urls {
                debug!(%url, "fetching issuer");
                match fetcher.fetch(&url).await {
                    Ok(bytes) => match decode(&bytes) {
                        Some(parent) => parents.push(parent),
                        None => warn!(%url, "fetched issuer is not a certificate"),
                    },
                    Err(error) => warn!(%url, %error, "failed to fetch issuer"),
                }
            }
            issuers_of(&certificate, parents)
        }))
    }

    fn contains(&self, _certificate: &Certificate) -> bool {
        false
    }
}
