// Copyright (c) 2023 The MobileCoin Foundation

//! Evaluating trust in a certificate chain.
//!
//! A [`TrustEvaluation`] holds the inputs of an evaluation and the last
//! result. Every setter invalidates the result, [`TrustEvaluation::evaluate`]
//! hands out the cached result until then.

use crate::builder::{BuildReport, BuildRequest, PathBuilder};
use crate::environment::TrustEnvironment;
use crate::exceptions::Exceptions;
use crate::options::EvaluationOptions;
use crate::path::CertificatePath;
use crate::policy::{has_fatal_failure, Policy, PolicyOutcome};
use crate::properties::{self, CertificateProperties};
use crate::result::{TrustResult, TrustResultType};
use crate::x509::Certificate;
use crate::{Error, Result};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

fn now() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

#[derive(Debug)]
struct Inputs {
    certificates: Vec<Certificate>,
    anchors: Vec<Certificate>,
    policies: Vec<Policy>,
    verify_date: Option<Duration>,
    options: EvaluationOptions,
    exceptions: Option<Exceptions>,
    generation: u64,
    result: Option<Cached>,
}

#[derive(Debug)]
struct Cached {
    generation: u64,
    exceptions_epoch: u64,
    result: Arc<TrustResult>,
}

impl Inputs {
    fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn current_result(&self) -> Option<&Arc<TrustResult>> {
        self.result
            .as_ref()
            .filter(|cached| cached.generation == self.generation)
            .map(|cached| &cached.result)
    }

    /// The cached result, unless it expired or the exceptions epoch moved.
    ///
    /// A fixed verify date never expires the result.
    fn cached(&self, now: Duration, exceptions_epoch: u64) -> Option<Arc<TrustResult>> {
        let cached = self
            .result
            .as_ref()
            .filter(|cached| cached.generation == self.generation)?;
        let expired = self.verify_date.is_none() && now >= cached.result.valid_until();
        (cached.exceptions_epoch == exceptions_epoch && !expired).then(|| cached.result.clone())
    }

    fn request(&self, now: Duration) -> BuildRequest {
        BuildRequest {
            certificates: self.certificates.clone(),
            anchors: self.anchors.clone(),
            policies: self.policies.clone(),
            verify_time: self.verify_date.unwrap_or(now),
            options: self.options.clone(),
        }
    }
}

/// The trust evaluation of one certificate chain.
///
/// Safe to share between tasks, the inputs and the cached result are
/// guarded together.
#[derive(Debug)]
pub struct TrustEvaluation {
    environment: Arc<TrustEnvironment>,
    inputs: Mutex<Inputs>,
}

impl TrustEvaluation {
    /// Evaluate `certificates`, leaf first, against `policies`.
    ///
    /// # Errors
    /// - [`Error::EmptyCertificates`] if there are no certificates
    /// - [`Error::EmptyPolicies`] if there are no policies
    pub fn new(
        environment: Arc<TrustEnvironment>,
        certificates: Vec<Certificate>,
        policies: Vec<Policy>,
    ) -> Result<Self> {
        if certificates.is_empty() {
            return Err(Error::EmptyCertificates);
        }
        if policies.is_empty() {
            return Err(Error::EmptyPolicies);
        }
        Ok(Self {
            environment,
            inputs: Mutex::new(Inputs {
                certificates,
                anchors: Vec::new(),
                policies,
                verify_date: None,
                options: EvaluationOptions::default(),
                exceptions: None,
                generation: 0,
                result: None,
            }),
        })
    }

    /// Evaluate DER encoded `certificates`, leaf first, against `policies`.
    ///
    /// # Errors
    /// [`Error::CertificateDecoding`] if a certificate fails to decode, or
    /// any of the errors of [`Self::new`].
    pub fn from_der<B: AsRef<[u8]>>(
        environment: Arc<TrustEnvironment>,
        certificates: &[B],
        policies: Vec<Policy>,
    ) -> Result<Self> {
        let certificates = certificates
            .iter()
            .map(|der| Certificate::try_from(der.as_ref()))
            .collect::<core::result::Result<Vec<_>, _>>()?;
        Self::new(environment, certificates, policies)
    }

    /// The certificate being evaluated
    pub fn leaf(&self) -> Certificate {
        let inputs = self.inputs.lock();
        inputs.certificates[0].clone()
    }

    /// The options of the evaluation
    pub fn options(&self) -> EvaluationOptions {
        self.inputs.lock().options.clone()
    }

    /// Trust only `anchors`
    pub fn set_anchors(&self, anchors: Vec<Certificate>) {
        let mut inputs = self.inputs.lock();
        inputs.anchors = anchors;
        inputs.options.anchors_only = true;
        inputs.invalidate();
    }

    /// Trust the anchor stores in addition to the anchors set with
    /// [`Self::set_anchors`] when `anchors_only` is false.
    pub fn set_anchors_only(&self, anchors_only: bool) {
        let mut inputs = self.inputs.lock();
        inputs.options.anchors_only = anchors_only;
        inputs.invalidate();
    }

    /// Evaluate against `policies` instead.
    ///
    /// # Errors
    /// [`Error::EmptyPolicies`] if there are no policies
    pub fn set_policies(&self, policies: Vec<Policy>) -> Result<()> {
        if policies.is_empty() {
            return Err(Error::EmptyPolicies);
        }
        let mut inputs = self.inputs.lock();
        inputs.policies = policies;
        inputs.invalidate();
        Ok(())
    }

    /// Evaluate at `verify_date`, seconds since the unix epoch, instead of
    /// the current time.
    pub fn set_verify_date(&self, verify_date: Duration) {
        let mut inputs = self.inputs.lock();
        inputs.verify_date = Some(verify_date);
        inputs.invalidate();
    }

    /// Allow fetching missing issuers from the network
    pub fn set_allow_network(&self, allow_network: bool) {
        let mut inputs = self.inputs.lock();
        inputs.options.allow_network = allow_network;
        inputs.invalidate();
    }

    /// Replace every option
    pub fn set_options(&self, options: EvaluationOptions) {
        let mut inputs = self.inputs.lock();
        inputs.options = options;
        inputs.invalidate();
    }

    /// Apply exceptions from [`Self::copy_exceptions`], or clear them with
    /// `None`.
    ///
    /// Returns `true` when the exceptions apply to the leaf. Exceptions for
    /// another leaf, or from before the exceptions epoch was reset, are
    /// dropped.
    ///
    /// # Errors
    /// [`Error::MalformedExceptions`] or [`Error::Serde`] if the exceptions
    /// fail to decode
    pub fn set_exceptions(&self, encoded: Option<&[u8]>) -> Result<bool> {
        let exceptions = encoded.map(Exceptions::decode).transpose()?;
        let current_epoch = self.environment.exceptions_epoch();
        let mut inputs = self.inputs.lock();
        let leaf = &inputs.certificates[0];
        let exceptions = exceptions.filter(|exceptions| {
            let current = exceptions.epoch() == current_epoch;
            if !current {
                debug!(epoch = exceptions.epoch(), current_epoch, "stale exceptions");
            }
            current && exceptions.matches_leaf(leaf)
        });
        let applies = exceptions.is_some();
        inputs.exceptions = exceptions;
        inputs.invalidate();
        Ok(applies)
    }

    /// The last result, if no input changed since.
    pub fn result(&self) -> Option<Arc<TrustResult>> {
        self.inputs.lock().current_result().cloned()
    }

    /// Evaluate the chain, or hand out the cached result.
    ///
    /// # Errors
    /// [`Error::EmptyCertificates`] if there is nothing to evaluate
    pub async fn evaluate(&self) -> Result<Arc<TrustResult>> {
        let now = now();
        let exceptions_epoch = self.environment.exceptions_epoch();
        let (generation, request, exceptions) = {
            let inputs = self.inputs.lock();
            if let Some(result) = inputs.cached(now, exceptions_epoch) {
                return Ok(result);
            }
            (
                inputs.generation,
                inputs.request(now),
                inputs.exceptions.clone(),
            )
        };

        debug!(generation, leaf_only = request.options.leaf_only, "evaluating trust");
        let lifetime = Duration::from_secs(request.options.result_lifetime_secs);
        let report = if request.options.leaf_only {
            self.leaf_only(request)?
        } else {
            PathBuilder::new(&self.environment, request)?.run().await
        };
        let result = Arc::new(self.finish(
            report,
            exceptions.as_ref(),
            exceptions_epoch,
            now,
            lifetime,
        ));

        let mut inputs = self.inputs.lock();
        if inputs.generation == generation {
            inputs.result = Some(Cached {
                generation,
                exceptions_epoch,
                result: result.clone(),
            });
        }
        Ok(result)
    }

    fn leaf_only(&self, request: BuildRequest) -> Result<BuildReport> {
        let leaf = request
            .certificates
            .first()
            .cloned()
            .ok_or(Error::EmptyCertificates)?;
        let detail = self.environment.policy_evaluator().leaf_checks(
            &leaf,
            &request.policies,
            request.verify_time,
        );
        let details = vec![detail];
        let fatal = has_fatal_failure(&details);
        let verdict = if fatal {
            TrustResultType::FatalTrustFailure
        } else if details[0].is_empty() {
            TrustResultType::Unspecified
        } else {
            TrustResultType::RecoverableTrustFailure
        };
        let path = CertificatePath::new(leaf);
        let score = path.score(request.verify_time);
        Ok(BuildReport {
            path,
            outcome: PolicyOutcome {
                accepted: details[0].is_empty(),
                details,
                fatal,
                ..PolicyOutcome::default()
            },
            verdict,
            score,
        })
    }

    fn finish(
        &self,
        report: BuildReport,
        exceptions: Option<&Exceptions>,
        exceptions_epoch: u64,
        now: Duration,
        lifetime: Duration,
    ) -> TrustResult {
        let BuildReport {
            path,
            outcome,
            mut verdict,
            score,
        } = report;

        if verdict == TrustResultType::RecoverableTrustFailure {
            if let Some(exceptions) =
                exceptions.filter(|exceptions| exceptions.epoch() == exceptions_epoch)
            {
                if exceptions.waives_all(&outcome.details) {
                    debug!("every failure is waived by exceptions");
                    verdict = TrustResultType::Proceed;
                }
            }
        }

        // The verdict holds until the next validity boundary in the chain
        let chain = path.certificates();
        let expires = now + lifetime;
        let valid_until = chain
            .iter()
            .flat_map(|certificate| [certificate.not_before(), certificate.not_after()])
            .filter(|boundary| *boundary > now)
            .fold(expires, Ord::min);
        TrustResult {
            verdict,
            chain,
            details: outcome.details,
            info: outcome.info,
            anchored: path.is_anchored(),
            score,
            evaluated_at: now,
            valid_until,
        }
    }

    /// Exceptions waiving every failure of the evaluation, see
    /// [`Self::set_exceptions`].
    pub async fn copy_exceptions(&self) -> Result<Vec<u8>> {
        let result = self.evaluate().await?;
        let leaf = self.leaf();
        Exceptions::from_details(&leaf, result.details(), self.environment.exceptions_epoch())
            .encode()
    }

    /// A summary of every certificate in the evaluated chain
    pub async fn copy_properties(&self) -> Result<Vec<CertificateProperties>> {
        let result = self.evaluate().await?;
        Ok(properties::copy_properties(result.chain(), result.details()))
    }

    /// A sentence describing why the evaluation failed, `None` if the chain
    /// is trusted.
    pub async fn failure_description(&self) -> Result<Option<String>> {
        let result = self.evaluate().await?;
        if result.verdict().is_trusted() {
            return Ok(None);
        }
        Ok(properties::failure_description(
            &self.leaf(),
            result.details(),
        ))
    }
}
