//! Error types for the rules layer.

/// Errors raised by the pure rule engines.
///
/// The rule engines never touch rooms or sockets, so only two things can
/// go wrong: the caller asked for something illegal, or the state handed
/// in is one the validators should have made impossible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// Malformed or illegal input. Nothing was mutated; the client may
    /// retry with corrected input.
    #[error("{0}")]
    Validation(String),

    /// The state violates a rule the validators are supposed to enforce.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl RulesError {
    /// Returns `true` for [`RulesError::Invariant`].
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}
