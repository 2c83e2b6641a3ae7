//! Errors surfaced by the command line.

use thiserror::Error;

use tactics_core::error::TacticsError;

use crate::data_loader::LoadError;

/// Anything that makes a command exit with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Content or snapshot could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The core rejected an operation.
    #[error(transparent)]
    Core(#[from] TacticsError),

    /// Writing JSON output failed.
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// Writing a results file failed.
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),

    /// Opponent id not in the catalog.
    #[error("Unknown opponent '{0}'")]
    UnknownOpponent(String),

    /// Alignment name did not match an element.
    #[error("Unknown element '{0}' (expected fire, water, earth, wind, light or dark)")]
    UnknownElement(String),

    /// Repeated runs of one seed disagreed.
    #[error("Determinism check failed for seed {seed}: {detail}")]
    Nondeterministic {
        /// Seed that diverged.
        seed: u64,
        /// What differed.
        detail: String,
    },

    /// A recorded replay no longer reproduces.
    #[error("Replay mismatch: recorded hash {recorded:#x}, resolved {resolved:#x}")]
    ReplayMismatch {
        /// Hash stored in the replay.
        recorded: u64,
        /// Hash of the re-resolved battle.
        resolved: u64,
    },
}

/// Parse an element by its lowercase key.
pub fn parse_element(name: &str) -> Result<tactics_core::affinity::Element, CliError> {
    tactics_core::affinity::Element::ALL
        .into_iter()
        .find(|e| e.key().eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::UnknownElement(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::affinity::Element;

    #[test]
    fn test_parse_element() {
        assert_eq!(parse_element("fire").unwrap(), Element::Fire);
        assert_eq!(parse_element("Dark").unwrap(), Element::Dark);
        assert!(matches!(
            parse_element("plasma"),
            Err(CliError::UnknownElement(_))
        ));
    }
}
