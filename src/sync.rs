//! Credit and bookkeeping reconciliation between two sysfiles.
//!
//! Works on already decoded [`BackupRecord`]s and mutates both sides in
//! place; re-encoding and writing is left to the caller.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::sysfile::{BackupRecord, Bookkeeping, CHUTE_COUNT};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Differential policy requires a reference sysfile")]
    MissingReference,
    #[error("Unknown sync policy '{0}'")]
    UnknownPolicy(String),
}

// ── Policies ──────────────────────────────────────────────────────────────────

/// How the player credit and remain counters are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreditPolicy {
    #[default]
    NoChange,
    File1,
    File2,
    Higher,
    Lower,
}

impl CreditPolicy {
    const NAMES: [(&'static str, CreditPolicy); 5] = [
        ("no-change", CreditPolicy::NoChange),
        ("file1",     CreditPolicy::File1),
        ("file2",     CreditPolicy::File2),
        ("higher",    CreditPolicy::Higher),
        ("lower",     CreditPolicy::Lower),
    ];

    fn resolve<T: Ord + Copy>(self, a: T, b: T) -> (T, T) {
        match self {
            CreditPolicy::NoChange => (a, b),
            CreditPolicy::File1    => (a, a),
            CreditPolicy::File2    => (b, b),
            CreditPolicy::Higher   => (a.max(b), a.max(b)),
            CreditPolicy::Lower    => (a.min(b), a.min(b)),
        }
    }
}

/// How each bookkeeping counter is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookkeepingPolicy {
    #[default]
    NoChange,
    File1,
    File2,
    Higher,
    Lower,
    /// Saturating sum of both sides.
    Combine,
    /// Apply file 1's change since the reference to both sides.
    DifferentialToFile1,
    /// Apply file 2's change since the reference to both sides.
    DifferentialToFile2,
}

impl BookkeepingPolicy {
    const NAMES: [(&'static str, BookkeepingPolicy); 8] = [
        ("no-change",     BookkeepingPolicy::NoChange),
        ("file1",         BookkeepingPolicy::File1),
        ("file2",         BookkeepingPolicy::File2),
        ("higher",        BookkeepingPolicy::Higher),
        ("lower",         BookkeepingPolicy::Lower),
        ("combine",       BookkeepingPolicy::Combine),
        ("diff-to-file1", BookkeepingPolicy::DifferentialToFile1),
        ("diff-to-file2", BookkeepingPolicy::DifferentialToFile2),
    ];

    pub fn needs_reference(self) -> bool {
        matches!(self, BookkeepingPolicy::DifferentialToFile1 | BookkeepingPolicy::DifferentialToFile2)
    }

    fn resolve(self, a: u32, b: u32, reference: Option<u32>) -> Result<(u32, u32), SyncError> {
        let simple = |p: CreditPolicy| Ok(p.resolve(a, b));
        match self {
            BookkeepingPolicy::NoChange => simple(CreditPolicy::NoChange),
            BookkeepingPolicy::File1    => simple(CreditPolicy::File1),
            BookkeepingPolicy::File2    => simple(CreditPolicy::File2),
            BookkeepingPolicy::Higher   => simple(CreditPolicy::Higher),
            BookkeepingPolicy::Lower    => simple(CreditPolicy::Lower),
            BookkeepingPolicy::Combine  => {
                let sum = a.saturating_add(b);
                Ok((sum, sum))
            }
            BookkeepingPolicy::DifferentialToFile1 | BookkeepingPolicy::DifferentialToFile2 => {
                let base = reference.ok_or(SyncError::MissingReference)?;
                let selected = if self == BookkeepingPolicy::DifferentialToFile1 { a } else { b };
                let delta = i64::from(selected) - i64::from(base);
                Ok((apply_delta(a, delta), apply_delta(b, delta)))
            }
        }
    }
}

fn apply_delta(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

fn lookup<P: Copy>(names: &[(&'static str, P)], s: &str) -> Result<P, SyncError> {
    names
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
        .map(|(_, p)| *p)
        .ok_or_else(|| SyncError::UnknownPolicy(s.to_owned()))
}

fn name_of<P: Copy + PartialEq>(names: &[(&'static str, P)], p: P) -> &'static str {
    names.iter().find(|(_, q)| *q == p).map_or("?", |(name, _)| name)
}

impl FromStr for CreditPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::NAMES, s)
    }
}

impl FromStr for BookkeepingPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::NAMES, s)
    }
}

impl fmt::Display for CreditPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(name_of(&Self::NAMES, *self))
    }
}

impl fmt::Display for BookkeepingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(name_of(&Self::NAMES, *self))
    }
}

/// Policy per counter group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncPolicy {
    pub credit:      CreditPolicy,
    pub bookkeeping: BookkeepingPolicy,
}

// ── Engine ────────────────────────────────────────────────────────────────────

const COUNTER_NAMES: [&str; CHUTE_COUNT + 6] = [
    "coin chute 0",
    "coin chute 1",
    "coin chute 2",
    "coin chute 3",
    "coin chute 4",
    "coin chute 5",
    "coin chute 6",
    "coin chute 7",
    "coin credit",
    "e-money coin",
    "e-money credit",
    "service credit",
    "total coin",
    "total credit",
];

fn counters_mut(bk: &mut Bookkeeping) -> Vec<&mut u32> {
    let mut out: Vec<&mut u32> = bk.coin_chute.iter_mut().collect();
    out.extend([
        &mut bk.coin_credit,
        &mut bk.emoney_coin,
        &mut bk.emoney_credit,
        &mut bk.service_credit,
        &mut bk.total_coin,
        &mut bk.total_credit,
    ]);
    out
}

fn counters(bk: &Bookkeeping) -> Vec<u32> {
    let mut out = bk.coin_chute.to_vec();
    out.extend([
        bk.coin_credit,
        bk.emoney_coin,
        bk.emoney_credit,
        bk.service_credit,
        bk.total_coin,
        bk.total_credit,
    ]);
    out
}

/// Merge `file1` and `file2` in place.
///
/// Credits cover player slot 0 only.  `reference` is the common ancestor
/// required by the differential bookkeeping policies; nothing is modified
/// when it is missing.
pub fn reconcile(
    file1:     &mut BackupRecord,
    file2:     &mut BackupRecord,
    reference: Option<&BackupRecord>,
    policy:    SyncPolicy,
) -> Result<(), SyncError> {
    if policy.bookkeeping.needs_reference() && reference.is_none() {
        tracing::error!(policy = %policy.bookkeeping, "no reference sysfile for differential sync");
        return Err(SyncError::MissingReference);
    }

    sync_credits(file1, file2, policy.credit);
    sync_bookkeeping(file1, file2, reference, policy.bookkeeping)
}

fn sync_credits(file1: &mut BackupRecord, file2: &mut BackupRecord, policy: CreditPolicy) {
    if policy == CreditPolicy::NoChange {
        return;
    }
    let (p1, p2) = (&mut file1.players[0], &mut file2.players[0]);

    (p1.credit, p2.credit) = policy.resolve(p1.credit, p2.credit);
    tracing::info!(file1 = p1.credit, file2 = p2.credit, %policy, "credits synchronized");

    (p1.remain, p2.remain) = policy.resolve(p1.remain, p2.remain);
    tracing::info!(file1 = p1.remain, file2 = p2.remain, %policy, "remain synchronized");
}

fn sync_bookkeeping(
    file1:     &mut BackupRecord,
    file2:     &mut BackupRecord,
    reference: Option<&BackupRecord>,
    policy:    BookkeepingPolicy,
) -> Result<(), SyncError> {
    if policy == BookkeepingPolicy::NoChange {
        return Ok(());
    }
    let base = reference.map(|r| counters(&r.bookkeeping));

    let sides = counters_mut(&mut file1.bookkeeping)
        .into_iter()
        .zip(counters_mut(&mut file2.bookkeeping));
    for (i, (a, b)) in sides.enumerate() {
        let reference = base.as_ref().map(|r| r[i]);
        (*a, *b) = policy.resolve(*a, *b, reference)?;
        tracing::info!(counter = COUNTER_NAMES[i], file1 = *a, file2 = *b, %policy, "bookkeeping synchronized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names() {
        assert_eq!("Higher".parse::<CreditPolicy>().unwrap(), CreditPolicy::Higher);
        assert_eq!("diff-to-file2".parse::<BookkeepingPolicy>().unwrap(), BookkeepingPolicy::DifferentialToFile2);
        assert!(matches!("combine".parse::<CreditPolicy>(), Err(SyncError::UnknownPolicy(_))));
        for (name, p) in BookkeepingPolicy::NAMES {
            assert_eq!(p.to_string(), name);
        }
    }

    #[test]
    fn delta_is_clamped() {
        assert_eq!(apply_delta(3, -10), 0);
        assert_eq!(apply_delta(u32::MAX - 1, 5), u32::MAX);
        assert_eq!(apply_delta(5, 4), 9);
    }

    #[test]
    fn counter_views_line_up() {
        let mut bk = Bookkeeping { total_credit: 42, ..Bookkeeping::default() };
        bk.coin_chute[7] = 7;
        let values = counters(&bk);
        assert_eq!(values.len(), COUNTER_NAMES.len());
        assert_eq!(values[7], 7);
        assert_eq!(values[13], 42);
        assert_eq!(*counters_mut(&mut bk)[13], 42);
    }
}
