//! Seat and fork identities.

use serde::{Deserialize, Serialize};

/// Identifier of a philosopher, `0..N`.
///
/// Philosopher `i` sits between fork `i` and fork `(i + 1) % N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhilosopherId(pub usize);

impl PhilosopherId {
    /// Returns the seat index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Returns the fork on this philosopher's own side (fork `i`).
    pub fn own_fork(&self) -> ForkId {
        ForkId(self.0)
    }

    /// Returns the fork shared with the next philosopher around a table of `n`.
    pub fn next_fork(&self, n: usize) -> ForkId {
        ForkId((self.0 + 1) % n)
    }
}

impl std::fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a fork, `0..N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkId(pub usize);

impl ForkId {
    /// Returns the slot index in the registry.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ForkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
