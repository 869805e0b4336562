//! Two-sided stable matching engine.
//!
//! Computes stable matchings between two disjoint agent populations holding
//! ranked preferences over each other: the Gale–Shapley deferred acceptance
//! algorithm, a blocking-pair stability verifier, the randomized
//! Roth–Vande Vate path to stability, tie-breaking for weak (indifferent)
//! preferences with stable-improvement-cycle post-processing, and
//! lottery/stochastic-dominance analysis over repeated trials.

pub mod da;
pub mod error;
pub mod lottery;
pub mod matching;
pub mod profile;
pub mod rand_source;
pub mod rpts;
pub mod sic;
pub mod stability;
pub mod tiebreak;

pub use crate::da::deferred_acceptance;
pub use crate::error::{MatchError, Result, Side};
pub use crate::lottery::{ordinally_dominates, Lottery, LotteryEntry, RandomMatching};
pub use crate::matching::{Matching, MatchingRecord};
pub use crate::profile::{
    ProposerId, RawPref, RawTier, ReceiverId, Roster, StrictProfile, WeakProfile,
};
pub use crate::rand_source::{RandomSource, SeededRng};
pub use crate::sic::stable_improvement_cycle;
pub use crate::stability::{is_stable, BlockingPair, Stability};
pub use crate::tiebreak::{
    break_ties, break_ties_with_priority, receiver_tiebreak_sweep, TiebreakOutcome,
};

/// Options for the randomized trial runners.
#[derive(Debug, Clone)]
pub struct TrialOptions {
    /// Base seed for the pseudo-random source.
    pub seed: u64,
    /// Number of worker threads; above 1 the trials run on the rayon pool,
    /// one independent random stream per trial.
    pub threads: usize,
}

impl Default for TrialOptions {
    fn default() -> Self {
        Self { seed: 0, threads: 1 }
    }
}

/// Validates two ordered `(agent, preference value)` maps into a strict
/// preference profile.
pub fn preferences<I, J, S, T>(proposers: I, receivers: J) -> Result<StrictProfile>
where
    I: IntoIterator<Item = (S, RawPref)>,
    J: IntoIterator<Item = (T, RawPref)>,
    S: Into<String>,
    T: Into<String>,
{
    StrictProfile::new(proposers, receivers)
}

/// Validates two ordered `(agent, preference value)` maps into a weak
/// profile, tiers allowed.
pub fn weak_preferences<I, J, S, T>(proposers: I, receivers: J) -> Result<WeakProfile>
where
    I: IntoIterator<Item = (S, RawPref)>,
    J: IntoIterator<Item = (T, RawPref)>,
    S: Into<String>,
    T: Into<String>,
{
    WeakProfile::new(proposers, receivers)
}

/// Runs `trials` independent random paths to stability and aggregates the
/// stable matchings they reach into a lottery.
pub fn random_path_to_stability(
    profile: &StrictProfile,
    trials: usize,
    opts: &TrialOptions,
) -> Lottery {
    if opts.threads > 1 {
        rpts::random_path_to_stability_parallel(profile, trials, opts.seed)
    } else {
        let mut rng = SeededRng::new(opts.seed);
        rpts::random_path_to_stability_with(profile, trials, &mut rng)
    }
}

/// Tie-broken deferred acceptance over `trials` independent priority draws,
/// optionally post-processed by the stable improvement cycle.
pub fn random_deferred_acceptance(
    weak: &WeakProfile,
    trials: usize,
    apply_sic: bool,
    opts: &TrialOptions,
) -> Lottery {
    if opts.threads > 1 {
        tiebreak::random_deferred_acceptance_parallel(weak, trials, apply_sic, opts.seed)
    } else {
        let mut rng = SeededRng::new(opts.seed);
        tiebreak::random_deferred_acceptance_with(weak, trials, apply_sic, &mut rng)
    }
}

/// Builds the probability table a lottery induces over (proposer, receiver)
/// pairs.
pub fn to_random_matching(lottery: &Lottery, roster: &Roster) -> RandomMatching {
    RandomMatching::from_lottery(lottery, roster)
}
