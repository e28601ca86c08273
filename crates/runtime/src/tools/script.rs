//! Tool-provider script classification.

use std::path::Path;

use serde::Deserialize;

/// The kinds of provider script that can be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Python,
    Node,
}

impl ScriptKind {
    /// Classify a script by its extension. `None` for anything other than
    /// `.py` or `.js`.
    pub fn detect(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" => Some(Self::Python),
            "js" => Some(Self::Node),
            _ => None,
        }
    }
}

/// Launcher commands, one per script kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Launchers {
    pub python: String,
    pub node: String,
}

impl Default for Launchers {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
        }
    }
}

impl Launchers {
    pub fn command_for(&self, kind: ScriptKind) -> &str {
        match kind {
            ScriptKind::Python => &self.python,
            ScriptKind::Node => &self.node,
        }
    }
}
