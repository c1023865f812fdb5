/// Crawl phase definitions for the pagination loop
///
/// This module defines the phases a crawl moves through and the reasons it can stop.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Crawl created, nothing has happened yet
    Init,

    /// Checking robots.txt for the seed origin
    PolicyCheck,

    /// Fetching the current page
    Fetching,

    /// Scanning fetched markup for anti-automation challenges
    ChallengeCheck,

    /// Extracting records from the current page
    Extracting,

    /// Looking for the next page link
    PaginationCheck,

    /// Politeness pause before the next fetch
    Delaying,

    /// Crawl finished (successfully or via early stop)
    Done,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this phase
    ///
    /// ```text
    /// Init -> PolicyCheck -> Fetching -> ChallengeCheck -> Extracting
    ///      -> PaginationCheck -> Delaying -> Fetching ...
    /// ```
    ///
    /// Every non-terminal phase after `Init` may also move to `Done`.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::Init, Self::PolicyCheck) => true,
            (Self::PolicyCheck, Self::Fetching) => true,
            (Self::Fetching, Self::ChallengeCheck) => true,
            (Self::ChallengeCheck, Self::Extracting) => true,
            (Self::Extracting, Self::PaginationCheck) => true,
            (Self::PaginationCheck, Self::Delaying) => true,
            (Self::PaginationCheck, Self::Fetching) => true,
            (Self::Delaying, Self::Fetching) => true,
            (Self::Init, Self::Done) | (Self::Done, _) => false,
            (_, Self::Done) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PolicyCheck => "policy_check",
            Self::Fetching => "fetching",
            Self::ChallengeCheck => "challenge_check",
            Self::Extracting => "extracting",
            Self::PaginationCheck => "pagination_check",
            Self::Delaying => "delaying",
            Self::Done => "done",
        }
    }

    /// Returns all phases in loop order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Init,
            Self::PolicyCheck,
            Self::Fetching,
            Self::ChallengeCheck,
            Self::Extracting,
            Self::PaginationCheck,
            Self::Delaying,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a crawl reached `Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// robots.txt disallowed the crawl; nothing was fetched
    PolicyBlocked,

    /// A CAPTCHA or human-verification page was detected
    ChallengeDetected,

    /// Pagination following is turned off, so only the seed page was processed
    PaginationDisabled,

    /// No next link was found, or it pointed back at the current page
    PaginationExhausted,

    /// The configured page bound was reached
    MaxPagesReached,
}

impl StopReason {
    /// Returns true if the crawl stopped before pagination ran its course
    pub fn is_early_stop(&self) -> bool {
        matches!(self, Self::PolicyBlocked | Self::ChallengeDetected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyBlocked => "policy_blocked",
            Self::ChallengeDetected => "challenge_detected",
            Self::PaginationDisabled => "pagination_disabled",
            Self::PaginationExhausted => "pagination_exhausted",
            Self::MaxPagesReached => "max_pages_reached",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(CrawlPhase::Done.is_terminal());
        for phase in CrawlPhase::all_phases() {
            if phase != CrawlPhase::Done {
                assert!(!phase.is_terminal(), "{} should not be terminal", phase);
            }
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            CrawlPhase::Init,
            CrawlPhase::PolicyCheck,
            CrawlPhase::Fetching,
            CrawlPhase::ChallengeCheck,
            CrawlPhase::Extracting,
            CrawlPhase::PaginationCheck,
            CrawlPhase::Delaying,
            CrawlPhase::Fetching,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_zero_delay_skips_delaying() {
        assert!(CrawlPhase::PaginationCheck.can_transition_to(CrawlPhase::Fetching));
    }

    #[test]
    fn test_any_active_phase_can_finish() {
        for phase in [
            CrawlPhase::PolicyCheck,
            CrawlPhase::Fetching,
            CrawlPhase::ChallengeCheck,
            CrawlPhase::Extracting,
            CrawlPhase::PaginationCheck,
            CrawlPhase::Delaying,
        ] {
            assert!(phase.can_transition_to(CrawlPhase::Done));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!CrawlPhase::Init.can_transition_to(CrawlPhase::Fetching));
        assert!(!CrawlPhase::Init.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Fetching.can_transition_to(CrawlPhase::Extracting));
        assert!(!CrawlPhase::Extracting.can_transition_to(CrawlPhase::Fetching));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Fetching));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Fetching.can_transition_to(CrawlPhase::PolicyCheck));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlPhase::PolicyCheck), "policy_check");
        assert_eq!(format!("{}", CrawlPhase::Done), "done");
        assert_eq!(
            format!("{}", StopReason::PaginationExhausted),
            "pagination_exhausted"
        );
    }

    #[test]
    fn test_early_stop() {
        assert!(StopReason::PolicyBlocked.is_early_stop());
        assert!(StopReason::ChallengeDetected.is_early_stop());
        assert!(!StopReason::MaxPagesReached.is_early_stop());
        assert!(!StopReason::PaginationExhausted.is_early_stop());
        assert!(!StopReason::PaginationDisabled.is_early_stop());
    }

    #[test]
    fn test_all_phases_complete() {
        let all = CrawlPhase::all_phases();
        assert_eq!(all.len(), 8);

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate phase found");
            }
        }
    }
}
