//! Derived connections between adjacent shots.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::group::GroupStatus;
use crate::ids::{GroupId, ShotId};

/// Effective state of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Proposed,
    Approved,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Proposed => "proposed",
            ConnectionStatus::Approved => "approved",
        }
    }
}

impl TryFrom<GroupStatus> for ConnectionStatus {
    type Error = GroupStatus;

    /// Declined groups have no live connection.
    fn try_from(status: GroupStatus) -> Result<Self, Self::Error> {
        match status {
            GroupStatus::Proposed => Ok(ConnectionStatus::Proposed),
            GroupStatus::Approved => Ok(ConnectionStatus::Approved),
            GroupStatus::Declined => Err(status),
        }
    }
}

/// A link between a shot and the shot right after it. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub shot_a: ShotId,

    pub shot_b: ShotId,

    pub status: ConnectionStatus,

    /// Group that contributed this connection
    pub group_id: GroupId,
}
