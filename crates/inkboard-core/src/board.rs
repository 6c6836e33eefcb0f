//! Board metadata.

use crate::shapes::Shape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A shared board: who owns it and how others join it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner: String,
    /// Code other users enter to join the board.
    #[serde(default, alias = "room_code")]
    pub join_code: String,
}

impl Board {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_join_code(mut self, join_code: impl Into<String>) -> Self {
        self.join_code = join_code.into();
        self
    }

    /// Download name for a raster export taken at `timestamp_ms`.
    pub fn export_file_name(&self, timestamp_ms: u64) -> String {
        let title = self.title.trim();
        let title = if title.is_empty() { "whiteboard" } else { title };
        format!("{title}-{timestamp_ms}.png")
    }

    pub(crate) fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Full state returned by the collaborator when a board is opened.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardSnapshot {
    pub board: Board,
    pub shapes: Vec<Shape>,
}
