//! Wire protocol between clients and the authoritative server.
//!
//! Packets are serde structs shipped over UDP with bincode. The issuing
//! player of a command is never carried in the packet; the server resolves
//! it from the sending address, so a client cannot command on behalf of
//! another player.

use crate::math::Vec3;
use crate::unit::{Cursor, Unit};
use crate::{PlayerId, UnitId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
    },
    /// Per-tick pointer sample. Lossy by design; the server uses whatever
    /// latest sample it has per tick and skips players that sent none.
    CursorInput {
        tick: u32,
        position: Vec3,
    },
    /// Move a group of owned units to a shared destination, formation
    /// preserved. Unresolved or foreign ids are dropped silently server-side.
    MoveUnits {
        tick: u32,
        target: Vec3,
        unit_ids: Vec<UnitId>,
    },
    /// Destroy and recreate the issuer's unit batch at its remembered spawn
    /// anchor. The tick is diagnostic only; respawn is not staleness-gated.
    RequestRespawn {
        tick: u32,
    },
    Disconnect,

    // Server -> client
    Connected {
        client_id: PlayerId,
    },
    /// Full replicated state, broadcast every tick and sent once directly
    /// to a freshly joined client as the post-join sync.
    Snapshot {
        tick: u32,
        timestamp: u64,
        units: Vec<Unit>,
        cursors: Vec<Cursor>,
    },
    Disconnected {
        reason: String,
    },
}
