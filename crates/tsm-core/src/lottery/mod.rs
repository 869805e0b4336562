use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::matching::{Matching, MatchingRecord};
use crate::profile::{ProposerId, Roster, StrictProfile};

/// Tolerance for probability comparisons.
pub const PROB_EPSILON: f64 = 1e-9;

/// A probability distribution over matchings: the distinct matchings
/// observed across a set of trials together with their occurrence counts.
/// Entries are kept sorted so two lotteries over the same trials compare
/// equal regardless of trial order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lottery {
    entries: Vec<(Matching, u32)>,
}

impl Lottery {
    pub fn from_matchings<I>(matchings: I) -> Self
    where
        I: IntoIterator<Item = Matching>,
    {
        let mut tally: BTreeMap<Matching, u32> = BTreeMap::new();
        for matching in matchings {
            *tally.entry(matching).or_insert(0) += 1;
        }
        Self {
            entries: tally.into_iter().collect(),
        }
    }

    /// Distinct matchings with their counts, in sorted order.
    pub fn support(&self) -> impl Iterator<Item = (&Matching, u32)> + '_ {
        self.entries.iter().map(|(matching, count)| (matching, *count))
    }

    pub fn distinct_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of trials aggregated into this lottery.
    pub fn trials(&self) -> u32 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_records(&self, roster: &Roster) -> Vec<LotteryEntry> {
        self.entries
            .iter()
            .map(|(matching, count)| LotteryEntry {
                matching: matching.to_record(roster),
                count: *count,
            })
            .collect()
    }
}

/// Serializable form of one lottery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryEntry {
    pub matching: MatchingRecord,
    pub count: u32,
}

/// The probability table induced by a lottery: rows are proposers, columns
/// are receivers, and cell `(i, j)` is the probability that `i` and `j` are
/// matched. When any agent is ever unmatched, one extra "unmatched" row and
/// column accumulate those probabilities. Every agent row and agent column
/// sums to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RandomMatching {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub probabilities: Vec<Vec<f64>>,
}

impl RandomMatching {
    pub fn from_lottery(lottery: &Lottery, roster: &Roster) -> Self {
        let proposer_count = roster.proposer_count();
        let receiver_count = roster.receiver_count();
        let has_unmatched = lottery.support().any(|(matching, _)| {
            matching.proposers().any(|(_, partner)| partner.is_none())
                || matching.receivers().any(|(_, partner)| partner.is_none())
        });

        let mut rows: Vec<String> = roster.proposer_names().to_vec();
        let mut columns: Vec<String> = roster.receiver_names().to_vec();
        if has_unmatched {
            rows.push("unmatched".to_string());
            columns.push("unmatched".to_string());
        }

        let mut probabilities = vec![vec![0.0; columns.len()]; rows.len()];
        let total = lottery.trials();
        if total > 0 {
            let weight = 1.0 / f64::from(total);
            for (matching, count) in lottery.support() {
                let share = f64::from(count) * weight;
                for (p, partner) in matching.proposers() {
                    match partner {
                        Some(r) => probabilities[p.0][r.0] += share,
                        None => probabilities[p.0][receiver_count] += share,
                    }
                }
                for (r, partner) in matching.receivers() {
                    if partner.is_none() {
                        probabilities[proposer_count][r.0] += share;
                    }
                }
            }
        }

        Self {
            rows,
            columns,
            probabilities,
        }
    }
}

/// First-order stochastic dominance of `pi` over `rho` with respect to the
/// proposers' preference rankings in `profile`.
///
/// For every proposer, the row of match probabilities is reordered by that
/// proposer's own ranking (most preferred first) and cumulated left to
/// right; `pi` dominates iff its cumulative probability is at least `rho`'s
/// at every rank cutoff, for every proposer. Reflexive by construction.
pub fn ordinally_dominates(
    pi: &Lottery,
    rho: &Lottery,
    profile: &StrictProfile,
) -> Result<bool> {
    let roster = profile.roster();
    check_dimensions(pi, roster)?;
    check_dimensions(rho, roster)?;
    let pi_table = RandomMatching::from_lottery(pi, roster);
    let rho_table = RandomMatching::from_lottery(rho, roster);

    for idx in 0..roster.proposer_count() {
        let p = ProposerId(idx);
        let mut pi_cumulative = 0.0;
        let mut rho_cumulative = 0.0;
        for &r in profile.proposer_prefs(p) {
            pi_cumulative += pi_table.probabilities[idx][r.0];
            rho_cumulative += rho_table.probabilities[idx][r.0];
            if pi_cumulative < rho_cumulative - PROB_EPSILON {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn check_dimensions(lottery: &Lottery, roster: &Roster) -> Result<()> {
    for (matching, _) in lottery.support() {
        if matching.proposer_count() != roster.proposer_count()
            || matching.receiver_count() != roster.receiver_count()
        {
            return Err(MatchError::IncompatiblePreferences {
                detail: format!(
                    "lottery contains a matching over {}x{} agents but the profile has {}x{}",
                    matching.proposer_count(),
                    matching.receiver_count(),
                    roster.proposer_count(),
                    roster.receiver_count()
                ),
            });
        }
    }
    Ok(())
}
