//! Aggregate traits and optimistic version expectations.

use crate::error::{DomainError, DomainResult};

/// Aggregate root: identity plus a version that advances with every applied event.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far. A freshly created row is at version 1.
    fn version(&self) -> u64;
}

/// Version a writer expects the persisted row to be at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// The row must not exist yet.
    NoRow,
    /// The row must be at exactly this version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when no row is stored.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Any, _) => true,
            (ExpectedVersion::NoRow, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "version check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

/// Decide/evolve split for aggregates.
///
/// `handle` is a pure decision that returns events and never mutates.
/// `apply` evolves state from one event and must stay deterministic so a
/// replay of the same events always lands on the same state.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
