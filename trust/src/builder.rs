// Copyright (c) 2023 The MobileCoin Foundation

//! Building certification paths from a leaf to a trust anchor.
//!
//! The [`PathBuilder`] runs a depth first search over the certificate
//! sources. Every path it builds is kept, so no path is built twice, and
//! each path lives in at most one of the partial, rejected or candidate
//! lists.
//!
//! The search widens in steps. At first a partial path is only extended
//! from the anchor sources and the supplied certificates. Once no partial
//! can be extended further one more parent source is opened and the
//! partials are visited again. With every source open, paths which failed
//! the parent checks are reconsidered and finally the partial paths
//! themselves are scored, so that the best imperfect path can be reported.

use crate::crypto::SignatureVerifier;
use crate::environment::TrustEnvironment;
use crate::options::EvaluationOptions;
use crate::path::{CertificatePath, VerifyStatus};
use crate::policy::{Policy, PolicyEvaluator, PolicyOutcome};
use crate::result::TrustResultType;
use crate::source::{
    AnchorKind, AnchorStoreSource, BoxFuture, CaIssuerSource, CertificateSource, ItemSource,
    MemorySource, ParentQuery,
};
use crate::x509::Certificate;
use crate::{Error, Result};
use core::fmt;
use core::time::Duration;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// The reject score of an accepted best path
const ACCEPTED: i64 = i64::MAX;

/// What to build a path for
#[derive(Clone, Debug)]
pub struct BuildRequest {
    /// The leaf followed by any certificates which may help build the path
    pub certificates: Vec<Certificate>,
    /// Anchors trusted in addition to, or with
    /// [`EvaluationOptions::anchors_only`] instead of, the anchor stores
    pub anchors: Vec<Certificate>,
    /// The policies a path must satisfy
    pub policies: Vec<Policy>,
    /// Seconds since the unix epoch to evaluate at
    pub verify_time: Duration,
    /// Search options
    pub options: EvaluationOptions,
}

/// The best path a search found and how it fared
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// The best path, the bare leaf when nothing better was found
    pub path: CertificatePath,
    /// The policy evaluation of [`Self::path`]
    pub outcome: PolicyOutcome,
    /// The verdict for [`Self::path`]
    pub verdict: TrustResultType,
    /// The score of [`Self::path`]
    pub score: i64,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct PathId(usize);

/// The seed path is always the first one built
const SEED: PathId = PathId(0);

#[derive(Debug)]
enum State {
    GetNext,
    ValidatePath(PathId),
    Accept {
        path: PathId,
        is_ev: bool,
        optionally_ev: bool,
    },
    Reject {
        path: PathId,
        is_ev: bool,
    },
    ComputeDetails,
    ReportResult(Box<BuildReport>),
    Done(Box<BuildReport>),
}

struct PendingFetch {
    partial: PathId,
    parents: BoxFuture<'static, Vec<Certificate>>,
}

enum Step {
    Continue,
    Fetch(PendingFetch),
    Finished(BuildReport),
}

/// The data of a search shared by every state
#[derive(Debug)]
struct Search {
    policies: Vec<Policy>,
    verify_time: Duration,
    max_path_length: usize,
    max_paths: usize,
    verifier: Arc<dyn SignatureVerifier>,
    evaluator: Arc<dyn PolicyEvaluator>,
    anchor_sources: Vec<Arc<dyn CertificateSource>>,
    parent_sources: Vec<Arc<dyn CertificateSource>>,
    next_parent_source: usize,
    paths: Vec<CertificatePath>,
    path_ids: HashMap<Vec<Certificate>, PathId>,
    partial_paths: Vec<PathId>,
    partial_ix: Option<usize>,
    rejected_paths: Vec<PathId>,
    candidate_paths: VecDeque<PathId>,
    best: Option<PathId>,
    best_is_ev: bool,
    reject_score: i64,
    considers_rejected: bool,
    considers_partials: bool,
}

impl Search {
    fn path(&self, id: PathId) -> &CertificatePath {
        &self.paths[id.0]
    }

    fn is_anchor(&self, certificate: &Certificate) -> bool {
        self.anchor_sources
            .iter()
            .any(|source| source.contains(certificate))
    }

    /// The source at `index`, counting anchor sources first and then the
    /// parent sources opened so far.
    fn source_at(&self, index: usize) -> Option<Arc<dyn CertificateSource>> {
        let anchors = self.anchor_sources.len();
        if index < anchors {
            self.anchor_sources.get(index).cloned()
        } else if index < anchors + self.next_parent_source {
            self.parent_sources.get(index - anchors).cloned()
        } else {
            None
        }
    }

    fn add_path(&mut self, path: CertificatePath) -> Option<PathId> {
        let key = path.certificates();
        if self.path_ids.contains_key(&key) {
            return None;
        }
        let id = PathId(self.paths.len());
        self.paths.push(path);
        self.path_ids.insert(key, id);
        Some(id)
    }

    /// Insert `id` right after the current partial, so it is extended
    /// before its siblings.
    fn insert_partial(&mut self, id: PathId) {
        let ix = self.partial_ix.map_or(0, |ix| ix + 1);
        self.partial_paths.insert(ix, id);
        self.partial_ix = Some(ix);
    }

    /// Can the path be extended further.
    ///
    /// Paths failing the parent checks are rejected, verified anchored
    /// paths become candidates and paths with a bad signature are dropped.
    fn is_partial(&mut self, id: PathId) -> bool {
        let path = &mut self.paths[id.0];
        if !self.considers_rejected && !self.evaluator.parent_checks(path, self.verify_time) {
            trace!(?path, "rejected path");
            self.rejected_paths.push(id);
            return false;
        }

        match path.verify(self.verifier.as_ref()) {
            VerifyStatus::Failed => {
                trace!(?path, "signature verification failed");
                false
            }
            VerifyStatus::Unknown => true,
            VerifyStatus::Success if path.is_anchored() => {
                trace!(?path, "adding candidate");
                self.candidate_paths.push_back(id);
                false
            }
            VerifyStatus::Success if path.is_root_self_signed() => {
                if self.considers_rejected {
                    self.candidate_paths.push_back(id);
                } else {
                    self.rejected_paths.push(id);
                }
                false
            }
            VerifyStatus::Success => true,
        }
    }

    /// Extend the `partial` path with each of the `parents`
    fn extend_paths(&mut self, partial: PathId, parents: Vec<Certificate>) {
        let root_ix = self.path(partial).count() - 1;
        trace!(parents = parents.len(), "extending path");
        for parent in parents {
            if let Some(ix) = self.path(partial).index_of(&parent) {
                if ix == root_ix {
                    self.paths[partial.0].mark_self_issued();
                }
                continue;
            }
            if self.path(partial).count() >= self.max_path_length {
                trace!(max = self.max_path_length, "path is too long to extend");
                continue;
            }

            let is_anchor = self.is_anchor(&parent);
            let self_issued = parent.is_self_issued();
            let mut path = self.path(partial).extend(parent);
            if self_issued {
                path.mark_self_issued();
            }
            if is_anchor {
                path.mark_anchored();
            }
            let Some(id) = self.add_path(path) else {
                continue;
            };
            trace!(path = ?self.path(id), "found new path");
            if self.is_partial(id) {
                self.insert_partial(id);
            }
        }
    }

    fn report(&self) -> BuildReport {
        let id = self.best.unwrap_or(SEED);
        let path = self.path(id).clone();
        let outcome = self
            .evaluator
            .evaluate(&path, &self.policies, self.verify_time);
        let verdict = if outcome.fatal {
            TrustResultType::FatalTrustFailure
        } else if self.reject_score == ACCEPTED && outcome.accepted {
            TrustResultType::Unspecified
        } else {
            TrustResultType::RecoverableTrustFailure
        };
        let score = path.score(self.verify_time);
        BuildReport {
            path,
            outcome,
            verdict,
            score,
        }
    }
}

/// Searches for the best certification path for a leaf certificate.
#[derive(Debug)]
pub struct PathBuilder {
    state: State,
    search: Search,
}

impl PathBuilder {
    /// Prepare a search for the first certificate of `request`.
    ///
    /// # Errors
    /// [`Error::EmptyCertificates`] if the request has no certificates
    pub fn new(environment: &TrustEnvironment, request: BuildRequest) -> Result<Self> {
        let BuildRequest {
            certificates,
            anchors,
            policies,
            verify_time,
            options,
        } = request;
        let leaf = certificates.first().cloned().ok_or(Error::EmptyCertificates)?;

        let system_anchors: Arc<dyn CertificateSource> = Arc::new(AnchorStoreSource::new(
            AnchorKind::System,
            environment.system_anchors().clone(),
        ));
        let user_anchors: Arc<dyn CertificateSource> = Arc::new(AnchorStoreSource::new(
            AnchorKind::User,
            environment.user_anchors().clone(),
        ));

        let mut anchor_sources: Vec<Arc<dyn CertificateSource>> =
            vec![Arc::new(MemorySource::new(anchors))];
        let mut parent_sources: Vec<Arc<dyn CertificateSource>> = vec![
            Arc::new(MemorySource::new(certificates)),
            Arc::new(ItemSource::new(environment.items().clone())),
        ];
        if options.anchors_only {
            parent_sources.push(system_anchors);
            parent_sources.push(user_anchors);
        } else {
            anchor_sources.push(system_anchors);
            anchor_sources.push(user_anchors);
        }
        if options.allow_network {
            if let Some(fetcher) = environment.fetcher() {
                parent_sources.push(Arc::new(CaIssuerSource::new(fetcher.clone())));
            }
        }

        let evaluator = environment.policy_evaluator().clone();
        let considers_rejected = !evaluator
            .structural_leaf_checks(&leaf, &policies, verify_time)
            .is_empty();
        if considers_rejected {
            debug!("leaf failed checks, considering rejected paths");
        }

        let mut search = Search {
            policies,
            verify_time,
            max_path_length: options.max_path_length,
            max_paths: options.max_paths,
            verifier: environment.verifier().clone(),
            evaluator,
            anchor_sources,
            parent_sources,
            next_parent_source: 1,
            paths: Vec::new(),
            path_ids: HashMap::new(),
            partial_paths: Vec::new(),
            partial_ix: None,
            rejected_paths: Vec::new(),
            candidate_paths: VecDeque::new(),
            best: None,
            best_is_ev: false,
            reject_score: i64::MIN,
            considers_rejected,
            considers_partials: false,
        };

        let is_anchor = search.is_anchor(&leaf);
        let mut seed = CertificatePath::new(leaf.clone());
        if leaf.is_self_issued() {
            seed.mark_self_issued();
        }
        // A lone certificate always verifies, this only settles self signing
        seed.verify(search.verifier.as_ref());
        if is_anchor {
            seed.mark_anchored();
        }
        search.path_ids.insert(seed.certificates(), SEED);
        search.paths.push(seed);
        if is_anchor {
            search.candidate_paths.push_back(SEED);
        } else {
            search.insert_partial(SEED);
        }

        Ok(Self {
            state: State::GetNext,
            search,
        })
    }

    /// Every path built so far
    pub fn paths(&self) -> &[CertificatePath] {
        &self.search.paths
    }

    /// Run the search to completion.
    ///
    /// Suspends only while a source fetches parents. Running a finished
    /// builder again reports the same result.
    pub async fn run(&mut self) -> BuildReport {
        loop {
            match self.step() {
                Step::Continue => {}
                Step::Fetch(PendingFetch { partial, parents }) => {
                    let parents = parents.await;
                    self.search.extend_paths(partial, parents);
                }
                Step::Finished(report) => return report,
            }
        }
    }

    fn step(&mut self) -> Step {
        trace!(state = ?self.state, "step");
        match core::mem::replace(&mut self.state, State::GetNext) {
            State::GetNext => self.get_next(),
            State::ValidatePath(path) => {
                self.validate_path(path);
                Step::Continue
            }
            State::Accept {
                path,
                is_ev,
                optionally_ev,
            } => {
                self.accept(path, is_ev, optionally_ev);
                Step::Continue
            }
            State::Reject { path, is_ev } => {
                self.reject(path, is_ev);
                Step::Continue
            }
            State::ComputeDetails => {
                self.state = State::ReportResult(Box::new(self.search.report()));
                Step::Continue
            }
            State::ReportResult(report) | State::Done(report) => {
                let finished = (*report).clone();
                self.state = State::Done(report);
                Step::Finished(finished)
            }
        }
    }

    fn get_next(&mut self) -> Step {
        let search = &mut self.search;
        if let Some(path) = search.candidate_paths.pop_front() {
            self.state = State::ValidatePath(path);
            return Step::Continue;
        }

        if search.considers_rejected {
            if let Some(path) = search.rejected_paths.pop() {
                if search.is_partial(path) {
                    search.insert_partial(path);
                }
                return Step::Continue;
            }
        }

        let Some(ix) = search.partial_ix else {
            if search.next_parent_source < search.parent_sources.len() {
                search.next_parent_source += 1;
                debug!(
                    open = search.next_parent_source,
                    total = search.parent_sources.len(),
                    "broadening search"
                );
            } else if !search.considers_rejected {
                search.considers_rejected = true;
                debug!(rejected = search.rejected_paths.len(), "considering rejected paths");
            } else if !search.considers_partials {
                search.considers_partials = true;
                debug!(partials = search.partial_paths.len(), "considering partial paths");
            } else {
                self.state = State::ComputeDetails;
                return Step::Continue;
            }
            search.partial_ix = search.partial_paths.len().checked_sub(1);
            return Step::Continue;
        };

        let partial = search.partial_paths[ix];
        if search.considers_partials {
            search.partial_ix = ix.checked_sub(1);
            self.state = State::ValidatePath(partial);
            return Step::Continue;
        }

        if search.paths.len() > search.max_paths {
            debug!(paths = search.paths.len(), "not building any more paths");
            search.partial_ix = None;
            return Step::Continue;
        }

        let source_ix = search.path(partial).next_source_index();
        let Some(source) = search.source_at(source_ix) else {
            search.partial_ix = ix.checked_sub(1);
            return Step::Continue;
        };
        search.paths[partial.0].set_next_source_index(source_ix + 1);
        trace!(source = source.name(), "copying parents");
        match source.copy_parents(search.path(partial).root()) {
            ParentQuery::Ready(parents) => {
                search.extend_paths(partial, parents);
                Step::Continue
            }
            ParentQuery::Pending(parents) => Step::Fetch(PendingFetch { partial, parents }),
        }
    }

    fn validate_path(&mut self, path: PathId) {
        let search = &self.search;
        self.state = if search.considers_rejected {
            State::Reject { path, is_ev: false }
        } else {
            let outcome =
                search
                    .evaluator
                    .evaluate(search.path(path), &search.policies, search.verify_time);
            trace!(accepted = outcome.accepted, "validated path");
            if outcome.accepted {
                State::Accept {
                    path,
                    is_ev: outcome.is_ev,
                    optionally_ev: outcome.optionally_ev,
                }
            } else {
                State::Reject {
                    path,
                    is_ev: outcome.is_ev,
                }
            }
        };
    }

    fn accept(&mut self, path: PathId, is_ev: bool, optionally_ev: bool) {
        let search = &mut self.search;
        if is_ev || search.best.is_none() || search.reject_score != ACCEPTED {
            search.best = Some(path);
            search.best_is_ev = is_ev;
            search.reject_score = ACCEPTED;
        }
        // Keep looking for an extended validation path only when asked to
        self.state = if is_ev || !optionally_ev {
            State::ComputeDetails
        } else {
            State::GetNext
        };
    }

    fn reject(&mut self, path: PathId, is_ev: bool) {
        let search = &mut self.search;
        if search.best_is_ev && !is_ev {
            return;
        }
        let score = search.path(path).score(search.verify_time);
        if search.best.is_none() || score > search.reject_score {
            search.best = Some(path);
            search.best_is_ev = is_ev;
            search.reject_score = score;
        }
    }
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("partial", &self.partial)
            .finish_non_exhaustive()
    }
}
