use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::profile::{ProposerId, ReceiverId, Roster};

/// A partial bijection between the two sides. Both directions are stored and
/// kept consistent by construction; unmatched agents map to `None`.
///
/// Derives a total order so lotteries can deduplicate and sort matchings
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Matching {
    proposer_to: Vec<Option<ReceiverId>>,
    receiver_to: Vec<Option<ProposerId>>,
}

impl Matching {
    /// The all-unmatched matching, the starting state of the random path to
    /// stability.
    pub fn empty(proposer_count: usize, receiver_count: usize) -> Self {
        Self {
            proposer_to: vec![None; proposer_count],
            receiver_to: vec![None; receiver_count],
        }
    }

    /// Builds a matching from named `(proposer, receiver)` pairs. Names not
    /// on the roster fail with [`MatchError::IncompatiblePreferences`]; an
    /// agent claimed twice fails with [`MatchError::NotAMatching`] naming the
    /// agent and both claimants rather than silently repairing the input.
    pub fn from_pairs<'a, I>(pairs: I, roster: &Roster) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut matching = Self::empty(roster.proposer_count(), roster.receiver_count());
        for (proposer, receiver) in pairs {
            let p = roster
                .proposer(proposer)
                .ok_or_else(|| MatchError::IncompatiblePreferences {
                    detail: format!("{proposer} is not a proposer in this problem"),
                })?;
            let r = roster
                .receiver(receiver)
                .ok_or_else(|| MatchError::IncompatiblePreferences {
                    detail: format!("{receiver} is not a receiver in this problem"),
                })?;
            if let Some(previous) = matching.receiver_to[r.0] {
                return Err(MatchError::NotAMatching {
                    agent: receiver.to_string(),
                    first: roster.proposer_name(previous).to_string(),
                    second: proposer.to_string(),
                });
            }
            if let Some(previous) = matching.proposer_to[p.0] {
                return Err(MatchError::NotAMatching {
                    agent: proposer.to_string(),
                    first: roster.receiver_name(previous).to_string(),
                    second: receiver.to_string(),
                });
            }
            matching.proposer_to[p.0] = Some(r);
            matching.receiver_to[r.0] = Some(p);
        }
        Ok(matching)
    }

    pub(crate) fn from_holds(holds: &[Option<ProposerId>], proposer_count: usize) -> Self {
        let mut matching = Self::empty(proposer_count, holds.len());
        for (r, held) in holds.iter().enumerate() {
            if let Some(p) = held {
                matching.proposer_to[p.0] = Some(ReceiverId(r));
                matching.receiver_to[r] = Some(*p);
            }
        }
        matching
    }

    pub fn proposer_count(&self) -> usize {
        self.proposer_to.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.receiver_to.len()
    }

    pub fn partner_of_proposer(&self, p: ProposerId) -> Option<ReceiverId> {
        self.proposer_to[p.0]
    }

    pub fn partner_of_receiver(&self, r: ReceiverId) -> Option<ProposerId> {
        self.receiver_to[r.0]
    }

    pub fn proposers(&self) -> impl Iterator<Item = (ProposerId, Option<ReceiverId>)> + '_ {
        self.proposer_to
            .iter()
            .enumerate()
            .map(|(idx, partner)| (ProposerId(idx), *partner))
    }

    pub fn receivers(&self) -> impl Iterator<Item = (ReceiverId, Option<ProposerId>)> + '_ {
        self.receiver_to
            .iter()
            .enumerate()
            .map(|(idx, partner)| (ReceiverId(idx), *partner))
    }

    /// Engages `p` with `r`, dissolving whatever engagements either of them
    /// currently holds. This is the single mutation primitive of the random
    /// path to stability.
    pub(crate) fn engage(&mut self, p: ProposerId, r: ReceiverId) {
        if let Some(old) = self.proposer_to[p.0] {
            self.receiver_to[old.0] = None;
        }
        if let Some(old) = self.receiver_to[r.0] {
            self.proposer_to[old.0] = None;
        }
        self.proposer_to[p.0] = Some(r);
        self.receiver_to[r.0] = Some(p);
    }

    /// Reassigns every `(p, r)` pair simultaneously. The pairs must form a
    /// permutation among currently married couples (the improvement-cycle
    /// resolution); both directions stay consistent.
    pub(crate) fn reassign(&mut self, pairs: &[(ProposerId, ReceiverId)]) {
        for &(p, r) in pairs {
            self.proposer_to[p.0] = Some(r);
        }
        for &(p, r) in pairs {
            self.receiver_to[r.0] = Some(p);
        }
    }

    // The two directions must mirror each other; a disagreement means the
    // matching was not produced by this crate's constructors.
    pub(crate) fn mirror_consistent(&self) -> bool {
        let forward = self.proposers().all(|(p, partner)| {
            partner.is_none_or(|r| self.receiver_to[r.0] == Some(p))
        });
        let backward = self.receivers().all(|(r, partner)| {
            partner.is_none_or(|p| self.proposer_to[p.0] == Some(r))
        });
        forward && backward
    }

    /// The serializable form: couples ordered by proposer, then the
    /// unmatched agents of both sides.
    pub fn to_record(&self, roster: &Roster) -> MatchingRecord {
        let mut couples = Vec::new();
        let mut singles = Vec::new();
        for (p, partner) in self.proposers() {
            match partner {
                Some(r) => couples.push((
                    roster.proposer_name(p).to_string(),
                    roster.receiver_name(r).to_string(),
                )),
                None => singles.push(roster.proposer_name(p).to_string()),
            }
        }
        for (r, partner) in self.receivers() {
            if partner.is_none() {
                singles.push(roster.receiver_name(r).to_string());
            }
        }
        couples.sort();
        singles.sort();
        MatchingRecord { couples, singles }
    }
}

/// External representation of a matching: an ordered sequence of
/// `(proposer, receiver)` couples plus the agents left unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRecord {
    pub couples: Vec<(String, String)>,
    pub singles: Vec<String>,
}
