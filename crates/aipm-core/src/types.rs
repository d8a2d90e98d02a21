use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How a generation step obtains its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Interactive,
    NonInteractive,
    Ai,
}

impl Mode {
    /// Resolve the CLI flag pair. `--ai` wins over `--non-interactive`.
    pub fn from_flags(ai: bool, non_interactive: bool) -> Self {
        if ai {
            Mode::Ai
        } else if non_interactive {
            Mode::NonInteractive
        } else {
            Mode::Interactive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Interactive => "interactive",
            Mode::NonInteractive => "non-interactive",
            Mode::Ai => "ai",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Mode::Interactive),
            "non-interactive" => Ok(Mode::NonInteractive),
            "ai" => Ok(Mode::Ai),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Status values
// ---------------------------------------------------------------------------

/// Status strings written by the workflow. Each step only checks the values
/// it owns; documents may carry any other status.
pub mod status {
    pub const BACKLOG: &str = "backlog";
    pub const PLANNING: &str = "planning";
    pub const COMPLETED: &str = "completed";
    pub const TODO: &str = "todo";
    pub const CLOSED: &str = "closed";
}

/// Placeholder for tracker references that have not been synced yet.
pub const UNSYNCED: &str = "TBD";
