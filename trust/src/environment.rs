// Copyright (c) 2023 The MobileCoin Foundation

//! The stores and collaborators shared by every evaluation

use crate::crypto::{DefaultSignatureVerifier, SignatureVerifier};
use crate::policy::{PolicyEvaluator, StandardPolicyEvaluator};
use crate::source::IssuerFetcher;
use crate::store::{CertificateStore, CertificateTable};
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read only stores and collaborators, plus the exceptions epoch.
///
/// Built once with [`TrustEnvironment::builder`] and shared through an
/// `Arc` by every [`crate::TrustEvaluation`].
#[derive(Debug)]
pub struct TrustEnvironment {
    system_anchors: Arc<dyn CertificateStore>,
    user_anchors: Arc<dyn CertificateStore>,
    items: Arc<dyn CertificateStore>,
    fetcher: Option<Arc<dyn IssuerFetcher>>,
    verifier: Arc<dyn SignatureVerifier>,
    policy_evaluator: Arc<dyn PolicyEvaluator>,
    exceptions_epoch: AtomicU64,
}

impl TrustEnvironment {
    /// Start building an environment, every store starts out empty
    pub fn builder() -> TrustEnvironmentBuilder {
        TrustEnvironmentBuilder::default()
    }

    /// Anchors shipped with the system
    pub fn system_anchors(&self) -> &Arc<dyn CertificateStore> {
        &self.system_anchors
    }

    /// Anchors added by the user
    pub fn user_anchors(&self) -> &Arc<dyn CertificateStore> {
        &self.user_anchors
    }

    /// Certificates available to build paths with
    pub fn items(&self) -> &Arc<dyn CertificateStore> {
        &self.items
    }

    /// Fetches issuers from the network, if any
    pub fn fetcher(&self) -> Option<&Arc<dyn IssuerFetcher>> {
        self.fetcher.as_ref()
    }

    /// Verifies certificate signatures
    pub fn verifier(&self) -> &Arc<dyn SignatureVerifier> {
        &self.verifier
    }

    /// Applies policies to paths
    pub fn policy_evaluator(&self) -> &Arc<dyn PolicyEvaluator> {
        &self.policy_evaluator
    }

    /// The current exceptions epoch
    pub fn exceptions_epoch(&self) -> u64 {
        self.exceptions_epoch.load(Ordering::Acquire)
    }

    /// Invalidate every exception captured so far, returns the new epoch.
    pub fn reset_exceptions_epoch(&self) -> u64 {
        self.exceptions_epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for TrustEnvironment {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for a [`TrustEnvironment`]
#[derive(Debug, Default)]
pub struct TrustEnvironmentBuilder {
    system_anchors: Option<Arc<dyn CertificateStore>>,
    user_anchors: Option<Arc<dyn CertificateStore>>,
    items: Option<Arc<dyn CertificateStore>>,
    fetcher: Option<Arc<dyn IssuerFetcher>>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    policy_evaluator: Option<Arc<dyn PolicyEvaluator>>,
    exceptions_epoch: u64,
}

impl TrustEnvironmentBuilder {
    /// The system anchor store
    pub fn system_anchors(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.system_anchors = Some(store);
        self
    }

    /// The user anchor store
    pub fn user_anchors(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.user_anchors = Some(store);
        self
    }

    /// The item store
    pub fn items(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.items = Some(store);
        self
    }

    /// Fetch issuers with `fetcher` when an evaluation allows network access
    pub fn fetcher(mut self, fetcher: Arc<dyn IssuerFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the [`DefaultSignatureVerifier`]
    pub fn verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Replace the [`StandardPolicyEvaluator`]
    pub fn policy_evaluator(mut self, evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        self.policy_evaluator = Some(evaluator);
        self
    }

    /// The epoch to start at
    pub fn exceptions_epoch(mut self, epoch: u64) -> Self {
        self.exceptions_epoch = epoch;
        self
    }

    /// Finish the environment
    pub fn build(self) -> TrustEnvironment {
        fn empty() -> Arc<dyn CertificateStore> {
            Arc::new(CertificateTable::new())
        }
        TrustEnvironment {
            system_anchors: self.system_anchors.unwrap_or_else(empty),
            user_anchors: self.user_anchors.unwrap_or_else(empty),
            items: self.items.unwrap_or_else(empty),
            fetcher: self.fetcher,
            verifier: self
                .verifier
                .unwrap_or_else(|| Arc::new(DefaultSignatureVerifier)),
            policy_evaluator: self
                .policy_evaluator
                .unwrap_or_else(|| Arc::new(StandardPolicyEvaluator)),
            exceptions_epoch: AtomicU64::new(self.exceptions_epoch),
        }
    }
}
