//! Movement kinds and sets of movement kinds.
//!
//! [`ModeType`] doubles as a durable serialization id: the numeric value of
//! every variant is part of the on-disk contract of any path cache and must
//! never be reassigned.  New kinds are appended with the next free id.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{NavError, NavResult};

// ── ModeType ──────────────────────────────────────────────────────────────────

/// The kind of movement used to reach a cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ModeType {
    /// No movement (origin of a path, stationary bookends).
    #[default]
    None   = 0,
    Walk   = 1,
    Jump   = 2,
    Swim   = 3,
    Fly    = 4,
    Boat   = 5,
    Door   = 6,
    Climb  = 7,
    Dig    = 8,
    Tunnel = 9,
}

impl ModeType {
    /// Every variant in id order.
    pub const ALL: [ModeType; 10] = [
        ModeType::None,
        ModeType::Walk,
        ModeType::Jump,
        ModeType::Swim,
        ModeType::Fly,
        ModeType::Boat,
        ModeType::Door,
        ModeType::Climb,
        ModeType::Dig,
        ModeType::Tunnel,
    ];

    /// The durable serialization id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Reverse lookup of [`id`][Self::id].
    pub fn from_id(id: u8) -> NavResult<ModeType> {
        match id {
            0 => Ok(ModeType::None),
            1 => Ok(ModeType::Walk),
            2 => Ok(ModeType::Jump),
            3 => Ok(ModeType::Swim),
            4 => Ok(ModeType::Fly),
            5 => Ok(ModeType::Boat),
            6 => Ok(ModeType::Door),
            7 => Ok(ModeType::Climb),
            8 => Ok(ModeType::Dig),
            9 => Ok(ModeType::Tunnel),
            other => Err(NavError::UnknownModeId(other)),
        }
    }

    /// Human-readable label, also accepted by [`FromStr`][std::str::FromStr].
    pub fn as_str(self) -> &'static str {
        match self {
            ModeType::None   => "none",
            ModeType::Walk   => "walk",
            ModeType::Jump   => "jump",
            ModeType::Swim   => "swim",
            ModeType::Fly    => "fly",
            ModeType::Boat   => "boat",
            ModeType::Door   => "door",
            ModeType::Climb  => "climb",
            ModeType::Dig    => "dig",
            ModeType::Tunnel => "tunnel",
        }
    }

    /// `true` for any kind that actually moves the agent.
    #[inline]
    pub fn is_moving(self) -> bool {
        !matches!(self, ModeType::None)
    }

    /// Distinct power-of-two weight of this kind inside a [`ModeTypeGroup`].
    #[inline]
    fn weight(self) -> u16 {
        1 << self.id()
    }
}

impl fmt::Display for ModeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModeType {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModeType::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NavError::Parse(format!("unknown mode type {s:?}")))
    }
}

// ── ModeTypeGroup ─────────────────────────────────────────────────────────────

/// An unordered set of [`ModeType`]s.
///
/// The set is represented by its *accumulation*: the sum of the distinct
/// power-of-two weights of its members.  Because every weight is a different
/// bit, two different sets can never produce the same accumulation, so the
/// accumulation alone drives equality, hashing and cache keys.
#[derive(Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeTypeGroup {
    accumulation: u16,
}

impl ModeTypeGroup {
    pub const EMPTY: ModeTypeGroup = ModeTypeGroup { accumulation: 0 };

    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Rebuild a group from a stored accumulation value.
    pub fn from_accumulation(accumulation: u16) -> NavResult<Self> {
        let valid_bits: u16 = ModeType::ALL.iter().map(|m| m.weight()).sum();
        if accumulation & !valid_bits != 0 {
            return Err(NavError::Parse(format!(
                "accumulation {accumulation:#x} contains unknown mode bits"
            )));
        }
        Ok(Self { accumulation })
    }

    #[inline]
    pub fn accumulation(&self) -> u16 {
        self.accumulation
    }

    /// Add `mode`; returns `true` if it was not already present.
    pub fn insert(&mut self, mode: ModeType) -> bool {
        let had = self.contains(mode);
        self.accumulation |= mode.weight();
        !had
    }

    #[inline]
    pub fn contains(&self, mode: ModeType) -> bool {
        self.accumulation & mode.weight() != 0
    }

    pub fn union(self, other: ModeTypeGroup) -> ModeTypeGroup {
        ModeTypeGroup { accumulation: self.accumulation | other.accumulation }
    }

    pub fn len(&self) -> usize {
        self.accumulation.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.accumulation == 0
    }

    /// Members in id order.
    pub fn iter(&self) -> impl Iterator<Item = ModeType> + '_ {
        ModeType::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl PartialEq for ModeTypeGroup {
    fn eq(&self, other: &Self) -> bool {
        self.accumulation == other.accumulation
    }
}

impl Eq for ModeTypeGroup {}

impl Hash for ModeTypeGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.accumulation.hash(state);
    }
}

impl FromIterator<ModeType> for ModeTypeGroup {
    fn from_iter<I: IntoIterator<Item = ModeType>>(iter: I) -> Self {
        let mut group = ModeTypeGroup::new();
        for mode in iter {
            group.insert(mode);
        }
        group
    }
}

impl fmt::Debug for ModeTypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ModeTypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(ModeType::as_str).collect();
        write!(f, "[{}]", names.join(","))
    }
}
