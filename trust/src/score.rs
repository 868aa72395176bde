// Copyright (c) 2023 The MobileCoin Foundation

//! Ranking of certification paths which were not accepted.
//!
//! Anchoring and signature integrity dominate the score, path length comes
//! next and temporal validity only breaks ties.

use crate::path::CertificatePath;
use core::time::Duration;

/// Bonus for a path ending in a trust anchor
pub const ANCHORED_WEIGHT: i64 = 10_000;
/// Bonus for every certificate in the path
pub const CERTIFICATE_WEIGHT: i64 = 10;
/// Bonus for a root which is self signed
pub const SELF_SIGNED_ROOT_WEIGHT: i64 = 10;
/// Bonus for a self signed certificate which is not the root
pub const SELF_SIGNED_WEIGHT: i64 = 5;
/// Penalty for a path with a link whose signature was not verified
pub const UNVERIFIED_WEIGHT: i64 = -100_000;
/// Penalty for every non root certificate outside of its validity period
pub const INVALID_TIME_WEIGHT: i64 = -1;

/// Score `path` at `verify_time`, higher is better.
pub fn score(path: &CertificatePath, verify_time: Duration) -> i64 {
    let count = path.count();
    let mut score = 0;
    if path.is_anchored() {
        score += ANCHORED_WEIGHT;
    }
    score += CERTIFICATE_WEIGHT * count as i64;
    if path.is_self_signed() {
        score += if path.self_issued_index() == Some(count - 1) {
            SELF_SIGNED_ROOT_WEIGHT
        } else {
            SELF_SIGNED_WEIGHT
        };
    }
    if !path.is_fully_verified() {
        score += UNVERIFIED_WEIGHT;
    }
    let expired = path.certificates()[..count - 1]
        .iter()
        .filter(|certificate| !certificate.is_valid_at(verify_time))
        .count();
    score += INVALID_TIME_WEIGHT * expired as i64;
    score
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::DefaultSignatureVerifier;
    use crate::path::VerifyStatus;
    use crate::test_support::{self, TestIssuer};
    use crate::x509::Certificate;
    use std::time::SystemTime;

    fn now() -> Duration {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("Time went backwards")
    }

    /// A verified path of `length` certificates, leaf first, ending in a
    /// self signed root
    fn chain(length: usize) -> CertificatePath {
        let root = test_support::root("Score Root");
        let mut issuers: Vec<TestIssuer> = vec![root];
        for i in 1..length - 1 {
            let issuer = test_support::intermediate(&format!("Score CA {i}"), &issuers[i - 1]);
            issuers.push(issuer);
        }
        let leaf = test_support::leaf("Score Leaf", &issuers[issuers.len() - 1]);
        let mut path = CertificatePath::new(leaf);
        for issuer in issuers.iter().rev() {
            path = path.extend(issuer.certificate.clone());
        }
        path.mark_self_issued();
        assert_eq!(path.verify(&DefaultSignatureVerifier), VerifyStatus::Success);
        path
    }

    fn unverified(length: usize) -> CertificatePath {
        let issuers = (0..length - 1)
            .map(|i| test_support::root(&format!("Unrelated {i}")).certificate)
            .collect::<Vec<Certificate>>();
        let mut path = CertificatePath::new(test_support::root("Unverified Leaf").certificate);
        for issuer in issuers {
            path = path.extend(issuer);
        }
        assert_eq!(
            path.verify(&DefaultSignatureVerifier),
            VerifyStatus::Failed
        );
        path
    }

    #[test]
    fn trivial_self_signed_anchor() {
        let root = test_support::root("Lone Root").certificate;
        let mut path = CertificatePath::new(root);
        path.mark_self_issued();
        path.mark_anchored();
        assert_eq!(path.verify(&DefaultSignatureVerifier), VerifyStatus::Success);

        assert_eq!(score(&path, now()), 10_000 + 10 + 10);
    }

    #[test]
    fn exact_weights() {
        let path = chain(3);
        assert_eq!(score(&path, now()), 3 * 10 + 10);

        let mut anchored = path.clone();
        anchored.mark_anchored();
        assert_eq!(score(&anchored, now()), 10_000 + 3 * 10 + 10);

        let broken = unverified(3);
        assert_eq!(score(&broken, now()), 3 * 10 - 100_000);
    }

    #[test]
    fn self_signed_mid_chain() {
        let root = test_support::root("Mid Root").certificate;
        let mut path = CertificatePath::new(root);
        path.mark_self_issued();
        assert_eq!(path.verify(&DefaultSignatureVerifier), VerifyStatus::Success);
        let extended = path.extend(test_support::root("Other Root").certificate);

        // The extension link was never verified
        assert_eq!(score(&extended, now()), 2 * 10 + 5 - 100_000);
    }

    #[test]
    fn expired_non_root_certificates_cost_one_each() {
        let path = chain(4);
        // Past the end of validity of every certificate in the path
        let far_future = Duration::from_secs(4_200_000_000 * 30);
        assert_eq!(score(&path, far_future), 4 * 10 + 10 - 3);
    }

    #[test]
    fn verification_dominates_length() {
        for length in 2..=14 {
            let verified = chain(2);
            let broken = unverified(length);
            assert!(score(&verified, now()) > score(&broken, now()));
        }
    }

    #[test]
    fn anchoring_dominates_length() {
        let mut short = chain(2);
        short.mark_anchored();
        let long = chain(14);
        assert!(score(&short, now()) > score(&long, now()));
    }

    #[test]
    fn fewer_expired_scores_higher() {
        let root = test_support::root("Expiry Root");
        let ca = test_support::intermediate("Expiry CA", &root);
        let expired_ca = test_support::expired_reissue("Expiry CA", &ca, &root);
        let leaf = test_support::leaf("Expiry Leaf", &ca);

        let paths = [ca.certificate.clone(), expired_ca].map(|intermediate| {
            let mut path = CertificatePath::new(leaf.clone())
                .extend(intermediate)
                .extend(root.certificate.clone());
            path.mark_self_issued();
            assert_eq!(path.verify(&DefaultSignatureVerifier), VerifyStatus::Success);
            path
        });
        let [current, expired] = paths;

        assert_eq!(score(&current, now()), score(&expired, now()) + 1);
        assert!(score(&current, now()) > score(&expired, now()));
    }
}
