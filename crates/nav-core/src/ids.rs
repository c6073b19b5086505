//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Graph IDs index directly into the
//! node/edge `Vec`s of a `WeightedGraph`; scheduler and session IDs are opaque
//! counters handed out by their owning component.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// The ID following this one; used by counters handing out IDs.
            #[inline(always)]
            pub fn next(self) -> $name {
                $name(self.0 + 1)
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// The entity (agent, player, client) a unit of work is billed against
    /// for scheduling fairness.
    pub struct OwnerId(u64);
}

typed_id! {
    /// Handle for a `WorkItem` submitted to the work manager.
    pub struct ItemId(u64);
}

typed_id! {
    /// Handle for a task registered with a scheduling manager.
    pub struct TaskId(u64);
}

typed_id! {
    /// Identifier of one search session.
    pub struct SessionId(u64);
}

typed_id! {
    /// Index of a node in a weighted graph.
    pub struct GraphNodeId(u32);
}

typed_id! {
    /// Index of a directed edge in a weighted graph.
    pub struct GraphEdgeId(u32);
}
