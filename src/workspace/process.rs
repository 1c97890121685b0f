use serde::{Deserialize, Serialize};

/// A named per-channel yield template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Process name.
    pub name: String,
    /// `true` for a signal (POI-scaled) process, `false` for background.
    pub signal: bool,
    /// Index into the parameter-of-interest block this signal scales with.
    /// `None` for background processes; `Some(_)` is required for signals.
    pub poi_index: Option<usize>,
}

impl Process {
    /// Constructs a background process.
    pub fn background(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signal: false,
            poi_index: None,
        }
    }

    /// Constructs a signal process scaled by the given POI index.
    pub fn signal(name: impl Into<String>, poi_index: usize) -> Self {
        Self {
            name: name.into(),
            signal: true,
            poi_index: Some(poi_index),
        }
    }
}
