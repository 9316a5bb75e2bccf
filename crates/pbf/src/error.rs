use std::fmt;

/// Failures surfaced by the simulation core.
///
/// Both variants are programmer or configuration errors; the frame loop has
/// no way to recover a partially solved step.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A particle collected more neighbours than its list can hold.
    NeighborOverflow { particle: usize, capacity: usize },
    /// Parameters rejected by [`SimParams::validate`](crate::SimParams::validate).
    InvalidParams(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::NeighborOverflow { particle, capacity } => write!(
                f,
                "particle {} exceeded neighbour capacity of {}",
                particle, capacity
            ),
            SimError::InvalidParams(reason) => write!(f, "invalid simulation parameters: {}", reason),
        }
    }
}

impl std::error::Error for SimError {}
