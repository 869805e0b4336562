use std::collections::HashMap;

use crate::error::{MatchError, Result, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub usize);

/// One tier inside a weak preference value: either a single agent or a set
/// of agents the owner is indifferent between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTier {
    Agent(String),
    Tie(Vec<String>),
}

impl RawTier {
    pub fn agent(name: impl Into<String>) -> Self {
        RawTier::Agent(name.into())
    }

    pub fn tie<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawTier::Tie(names.into_iter().map(Into::into).collect())
    }
}

/// A raw preference value as supplied by the caller: a bare agent, a strict
/// list, or a list of indifference tiers. Which variants are admissible is
/// decided by the constructor it is handed to, never by inspection later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPref {
    Agent(String),
    List(Vec<String>),
    Tiers(Vec<RawTier>),
}

impl RawPref {
    pub fn agent(name: impl Into<String>) -> Self {
        RawPref::Agent(name.into())
    }

    pub fn list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawPref::List(names.into_iter().map(Into::into).collect())
    }

    pub fn tiers<I>(tiers: I) -> Self
    where
        I: IntoIterator<Item = RawTier>,
    {
        RawPref::Tiers(tiers.into_iter().collect())
    }
}

impl From<&str> for RawPref {
    fn from(name: &str) -> Self {
        RawPref::Agent(name.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for RawPref {
    fn from(names: [&str; N]) -> Self {
        RawPref::list(names)
    }
}

impl From<Vec<&str>> for RawPref {
    fn from(names: Vec<&str>) -> Self {
        RawPref::list(names)
    }
}

/// The agent populations of both sides, with stable dense ids assigned in
/// insertion order. Shared by the strict and weak profile variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    proposers: Vec<String>,
    receivers: Vec<String>,
    proposer_index: HashMap<String, ProposerId>,
    receiver_index: HashMap<String, ReceiverId>,
}

impl Roster {
    fn new(proposers: Vec<String>, receivers: Vec<String>) -> Result<Self> {
        let mut proposer_index = HashMap::with_capacity(proposers.len());
        for (idx, name) in proposers.iter().enumerate() {
            if proposer_index.insert(name.clone(), ProposerId(idx)).is_some() {
                return Err(MatchError::InvalidPreferenceProfile {
                    reason: format!("proposer {name} appears twice in the profile"),
                });
            }
        }
        let mut receiver_index = HashMap::with_capacity(receivers.len());
        for (idx, name) in receivers.iter().enumerate() {
            if receiver_index.insert(name.clone(), ReceiverId(idx)).is_some() {
                return Err(MatchError::InvalidPreferenceProfile {
                    reason: format!("receiver {name} appears twice in the profile"),
                });
            }
        }
        Ok(Self {
            proposers,
            receivers,
            proposer_index,
            receiver_index,
        })
    }

    pub fn proposer_count(&self) -> usize {
        self.proposers.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    pub fn proposer_names(&self) -> &[String] {
        &self.proposers
    }

    pub fn receiver_names(&self) -> &[String] {
        &self.receivers
    }

    pub fn proposer(&self, name: &str) -> Option<ProposerId> {
        self.proposer_index.get(name).copied()
    }

    pub fn receiver(&self, name: &str) -> Option<ReceiverId> {
        self.receiver_index.get(name).copied()
    }

    pub fn proposer_name(&self, id: ProposerId) -> &str {
        &self.proposers[id.0]
    }

    pub fn receiver_name(&self, id: ReceiverId) -> &str {
        &self.receivers[id.0]
    }
}

/// A validated strict preference profile. Immutable once built; every
/// downstream engine reads it through the rank tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictProfile {
    roster: Roster,
    proposer_prefs: Vec<Vec<ReceiverId>>,
    receiver_prefs: Vec<Vec<ProposerId>>,
    proposer_rank: Vec<Vec<Option<u32>>>,
    receiver_rank: Vec<Vec<Option<u32>>>,
}

impl StrictProfile {
    /// Validates two ordered `(agent, preference value)` maps into a strict
    /// profile. Bare agents are wrapped into one-element lists; any tie
    /// fails with [`MatchError::NotStrict`].
    pub fn new<I, J, S, T>(proposers: I, receivers: J) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RawPref)>,
        J: IntoIterator<Item = (T, RawPref)>,
        S: Into<String>,
        T: Into<String>,
    {
        let (proposer_names, proposer_raw): (Vec<String>, Vec<RawPref>) = proposers
            .into_iter()
            .map(|(name, pref)| (name.into(), pref))
            .unzip();
        let (receiver_names, receiver_raw): (Vec<String>, Vec<RawPref>) = receivers
            .into_iter()
            .map(|(name, pref)| (name.into(), pref))
            .unzip();
        let roster = Roster::new(proposer_names, receiver_names)?;

        let proposer_prefs: Vec<Vec<ReceiverId>> = strict_side(
            Side::Proposers,
            roster.proposer_names(),
            &proposer_raw,
            |name| roster.receiver(name).map(|id| id.0),
        )?
        .into_iter()
        .map(|list| list.into_iter().map(ReceiverId).collect())
        .collect();
        let receiver_prefs: Vec<Vec<ProposerId>> = strict_side(
            Side::Receivers,
            roster.receiver_names(),
            &receiver_raw,
            |name| roster.proposer(name).map(|id| id.0),
        )?
        .into_iter()
        .map(|list| list.into_iter().map(ProposerId).collect())
        .collect();

        Ok(Self::from_parts(roster, proposer_prefs, receiver_prefs))
    }

    /// Assembles a profile from already-resolved id lists. Used by the
    /// tie-breaking layer, which derives its lists from a validated weak
    /// profile and therefore skips name resolution.
    pub(crate) fn from_parts(
        roster: Roster,
        proposer_prefs: Vec<Vec<ReceiverId>>,
        receiver_prefs: Vec<Vec<ProposerId>>,
    ) -> Self {
        let proposer_rank = rank_table(
            roster.receiver_count(),
            proposer_prefs.iter().map(|list| {
                list.iter().enumerate().map(|(rank, r)| (r.0, rank))
            }),
        );
        let receiver_rank = rank_table(
            roster.proposer_count(),
            receiver_prefs.iter().map(|list| {
                list.iter().enumerate().map(|(rank, p)| (p.0, rank))
            }),
        );
        Self {
            roster,
            proposer_prefs,
            receiver_prefs,
            proposer_rank,
            receiver_rank,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn proposer_count(&self) -> usize {
        self.roster.proposer_count()
    }

    pub fn receiver_count(&self) -> usize {
        self.roster.receiver_count()
    }

    pub fn proposer_prefs(&self, p: ProposerId) -> &[ReceiverId] {
        &self.proposer_prefs[p.0]
    }

    pub fn receiver_prefs(&self, r: ReceiverId) -> &[ProposerId] {
        &self.receiver_prefs[r.0]
    }

    /// Rank of receiver `r` on `p`'s list; `None` if `r` is unacceptable to
    /// `p`. Lower is better.
    pub fn proposer_rank(&self, p: ProposerId, r: ReceiverId) -> Option<u32> {
        self.proposer_rank[p.0][r.0]
    }

    pub fn receiver_rank(&self, r: ReceiverId, p: ProposerId) -> Option<u32> {
        self.receiver_rank[r.0][p.0]
    }
}

/// A validated weak preference profile: tiers of mutual indifference,
/// most-preferred tier first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakProfile {
    roster: Roster,
    proposer_tiers: Vec<Vec<Vec<ReceiverId>>>,
    receiver_tiers: Vec<Vec<Vec<ProposerId>>>,
    proposer_tier_rank: Vec<Vec<Option<u32>>>,
    receiver_tier_rank: Vec<Vec<Option<u32>>>,
}

impl WeakProfile {
    pub fn new<I, J, S, T>(proposers: I, receivers: J) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RawPref)>,
        J: IntoIterator<Item = (T, RawPref)>,
        S: Into<String>,
        T: Into<String>,
    {
        let (proposer_names, proposer_raw): (Vec<String>, Vec<RawPref>) = proposers
            .into_iter()
            .map(|(name, pref)| (name.into(), pref))
            .unzip();
        let (receiver_names, receiver_raw): (Vec<String>, Vec<RawPref>) = receivers
            .into_iter()
            .map(|(name, pref)| (name.into(), pref))
            .unzip();
        let roster = Roster::new(proposer_names, receiver_names)?;

        let proposer_tiers: Vec<Vec<Vec<ReceiverId>>> = weak_side(
            Side::Proposers,
            roster.proposer_names(),
            &proposer_raw,
            |name| roster.receiver(name).map(|id| id.0),
        )?
        .into_iter()
        .map(|tiers| {
            tiers
                .into_iter()
                .map(|tier| tier.into_iter().map(ReceiverId).collect())
                .collect()
        })
        .collect();
        let receiver_tiers: Vec<Vec<Vec<ProposerId>>> = weak_side(
            Side::Receivers,
            roster.receiver_names(),
            &receiver_raw,
            |name| roster.proposer(name).map(|id| id.0),
        )?
        .into_iter()
        .map(|tiers| {
            tiers
                .into_iter()
                .map(|tier| tier.into_iter().map(ProposerId).collect())
                .collect()
        })
        .collect();

        let proposer_tier_rank = rank_table(
            roster.receiver_count(),
            proposer_tiers.iter().map(|tiers| {
                tiers
                    .iter()
                    .enumerate()
                    .flat_map(|(depth, tier)| tier.iter().map(move |r| (r.0, depth)))
            }),
        );
        let receiver_tier_rank = rank_table(
            roster.proposer_count(),
            receiver_tiers.iter().map(|tiers| {
                tiers
                    .iter()
                    .enumerate()
                    .flat_map(|(depth, tier)| tier.iter().map(move |p| (p.0, depth)))
            }),
        );

        Ok(Self {
            roster,
            proposer_tiers,
            receiver_tiers,
            proposer_tier_rank,
            receiver_tier_rank,
        })
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn proposer_count(&self) -> usize {
        self.roster.proposer_count()
    }

    pub fn receiver_count(&self) -> usize {
        self.roster.receiver_count()
    }

    pub fn proposer_tiers(&self, p: ProposerId) -> &[Vec<ReceiverId>] {
        &self.proposer_tiers[p.0]
    }

    pub fn receiver_tiers(&self, r: ReceiverId) -> &[Vec<ProposerId>] {
        &self.receiver_tiers[r.0]
    }

    /// Tier depth of receiver `r` on `p`'s weak list; `None` if unlisted.
    /// Strict preference between two receivers means strictly lower depth.
    pub fn proposer_tier_rank(&self, p: ProposerId, r: ReceiverId) -> Option<u32> {
        self.proposer_tier_rank[p.0][r.0]
    }

    pub fn receiver_tier_rank(&self, r: ReceiverId, p: ProposerId) -> Option<u32> {
        self.receiver_tier_rank[r.0][p.0]
    }
}

// Rank tables are dense Option matrices: row per owner, column per agent of
// the opposite side. Built once at construction so every comparison in the
// engines is a pair of lookups.
fn rank_table<I, J>(width: usize, rows: I) -> Vec<Vec<Option<u32>>>
where
    I: Iterator<Item = J>,
    J: IntoIterator<Item = (usize, usize)>,
{
    rows.map(|row| {
        let mut ranks = vec![None; width];
        for (column, rank) in row {
            ranks[column] = Some(rank as u32);
        }
        ranks
    })
    .collect()
}

fn strict_side<F>(
    side: Side,
    owners: &[String],
    raw: &[RawPref],
    resolve: F,
) -> Result<Vec<Vec<usize>>>
where
    F: Fn(&str) -> Option<usize>,
{
    owners
        .iter()
        .zip(raw.iter())
        .map(|(owner, pref)| {
            let names: Vec<&str> = match pref {
                RawPref::Agent(name) => vec![name.as_str()],
                RawPref::List(names) => names.iter().map(String::as_str).collect(),
                RawPref::Tiers(tiers) => {
                    let mut flat = Vec::with_capacity(tiers.len());
                    for tier in tiers {
                        match tier {
                            RawTier::Agent(name) => flat.push(name.as_str()),
                            RawTier::Tie(tie) => {
                                return Err(MatchError::NotStrict {
                                    agent: owner.clone(),
                                    tier: tie.clone(),
                                })
                            }
                        }
                    }
                    flat
                }
            };
            let mut seen = ResolvedNames::new(side, owner);
            for name in names {
                seen.push(name, &resolve)?;
            }
            Ok(seen.ids)
        })
        .collect()
}

fn weak_side<F>(
    side: Side,
    owners: &[String],
    raw: &[RawPref],
    resolve: F,
) -> Result<Vec<Vec<Vec<usize>>>>
where
    F: Fn(&str) -> Option<usize>,
{
    owners
        .iter()
        .zip(raw.iter())
        .map(|(owner, pref)| {
            let tiers: Vec<Vec<&str>> = match pref {
                RawPref::Agent(name) => vec![vec![name.as_str()]],
                RawPref::List(names) => {
                    names.iter().map(|name| vec![name.as_str()]).collect()
                }
                RawPref::Tiers(tiers) => tiers
                    .iter()
                    .map(|tier| match tier {
                        RawTier::Agent(name) => Ok(vec![name.as_str()]),
                        RawTier::Tie(tie) if tie.is_empty() => {
                            Err(MatchError::InvalidPreferenceList {
                                side,
                                agent: owner.clone(),
                                reason: "an indifference tier is empty".to_string(),
                            })
                        }
                        RawTier::Tie(tie) => Ok(tie.iter().map(String::as_str).collect()),
                    })
                    .collect::<Result<_>>()?,
            };
            // agents may not repeat anywhere across the whole value, tier
            // boundaries included
            let mut seen = ResolvedNames::new(side, owner);
            let mut resolved = Vec::with_capacity(tiers.len());
            for tier in tiers {
                let start = seen.ids.len();
                for name in tier {
                    seen.push(name, &resolve)?;
                }
                resolved.push(seen.ids[start..].to_vec());
            }
            Ok(resolved)
        })
        .collect()
}

// Accumulates resolved ids for one preference value, rejecting unknown names
// and repeats as it goes.
struct ResolvedNames<'a> {
    side: Side,
    owner: &'a str,
    ids: Vec<usize>,
}

impl<'a> ResolvedNames<'a> {
    fn new(side: Side, owner: &'a str) -> Self {
        Self {
            side,
            owner,
            ids: Vec::new(),
        }
    }

    fn push<F>(&mut self, name: &str, resolve: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<usize>,
    {
        let id = resolve(name).ok_or_else(|| MatchError::UnknownAgent {
            side: self.side,
            owner: self.owner.to_string(),
            name: name.to_string(),
        })?;
        if self.ids.contains(&id) {
            return Err(MatchError::InvalidPreferenceList {
                side: self.side,
                agent: self.owner.to_string(),
                reason: format!("{name} appears more than once"),
            });
        }
        self.ids.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_strict() -> StrictProfile {
        StrictProfile::new(
            [
                ("A", RawPref::from(["X", "Y"])),
                ("B", RawPref::from(["X", "Y"])),
            ],
            [
                ("X", RawPref::from(["B", "A"])),
                ("Y", RawPref::from(["A", "B"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn builds_rank_tables() {
        let profile = small_strict();
        let a = profile.roster().proposer("A").unwrap();
        let x = profile.roster().receiver("X").unwrap();
        let y = profile.roster().receiver("Y").unwrap();
        assert_eq!(profile.proposer_rank(a, x), Some(0));
        assert_eq!(profile.proposer_rank(a, y), Some(1));
        assert_eq!(profile.receiver_rank(x, a), Some(1));
    }

    #[test]
    fn wraps_bare_agent_into_singleton_list() {
        let profile = StrictProfile::new(
            [("A", RawPref::from("X"))],
            [("X", RawPref::from("A"))],
        )
        .unwrap();
        let a = profile.roster().proposer("A").unwrap();
        assert_eq!(profile.proposer_prefs(a).len(), 1);
    }

    #[test]
    fn rejects_unknown_agent() {
        let err = StrictProfile::new(
            [("A", RawPref::from(["X", "Z"]))],
            [("X", RawPref::from("A"))],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MatchError::UnknownAgent {
                side: Side::Proposers,
                owner: "A".to_string(),
                name: "Z".to_string(),
            }
        );
    }

    #[test]
    fn rejects_tie_where_strictness_is_required() {
        let err = StrictProfile::new(
            [(
                "A",
                RawPref::tiers([RawTier::agent("X"), RawTier::tie(["Y", "Z"])]),
            )],
            [
                ("X", RawPref::from("A")),
                ("Y", RawPref::from("A")),
                ("Z", RawPref::from("A")),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::NotStrict { ref agent, .. } if agent == "A"));
    }

    #[test]
    fn rejects_duplicate_entry_in_list() {
        let err = StrictProfile::new(
            [("A", RawPref::from(["X", "X"]))],
            [("X", RawPref::from("A"))],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidPreferenceList { .. }));
    }

    #[test]
    fn rejects_duplicate_profile_keys() {
        let err = StrictProfile::new(
            [("A", RawPref::from("X")), ("A", RawPref::from("X"))],
            [("X", RawPref::from("A"))],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidPreferenceProfile { .. }));
    }

    #[test]
    fn weak_profile_records_tier_depths() {
        let weak = WeakProfile::new(
            [(
                "A",
                RawPref::tiers([RawTier::tie(["X", "Y"]), RawTier::agent("Z")]),
            )],
            [
                ("X", RawPref::from("A")),
                ("Y", RawPref::from("A")),
                ("Z", RawPref::from("A")),
            ],
        )
        .unwrap();
        let a = weak.roster().proposer("A").unwrap();
        let x = weak.roster().receiver("X").unwrap();
        let y = weak.roster().receiver("Y").unwrap();
        let z = weak.roster().receiver("Z").unwrap();
        assert_eq!(weak.proposer_tier_rank(a, x), Some(0));
        assert_eq!(weak.proposer_tier_rank(a, y), Some(0));
        assert_eq!(weak.proposer_tier_rank(a, z), Some(1));
    }

    #[test]
    fn weak_profile_rejects_agent_repeated_across_tiers() {
        let err = WeakProfile::new(
            [(
                "A",
                RawPref::tiers([RawTier::tie(["X", "Y"]), RawTier::agent("X")]),
            )],
            [("X", RawPref::from("A")), ("Y", RawPref::from("A"))],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidPreferenceList { .. }));
    }
}
