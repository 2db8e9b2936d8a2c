//! Types and logic shared between the authoritative server and clients.
//!
//! The simulation rules in [`unit`] and [`formation`] are used verbatim on
//! both sides of the wire: the server runs them as the source of truth,
//! clients may run the same code locally to mask latency while waiting for
//! the next authoritative snapshot. Keeping one implementation here is what
//! makes that prediction converge instead of drift.

pub mod formation;
pub mod math;
pub mod protocol;
pub mod unit;

pub use formation::plan_group_move;
pub use math::Vec3;
pub use protocol::Packet;
pub use unit::{Cursor, Unit};

/// Stable identifier of a commandable unit.
pub type UnitId = u32;
/// Identifier of a connected participant.
pub type PlayerId = u32;

pub const PROTOCOL_VERSION: u32 = 1;

/// Default ground speed of a moving unit, world units per second.
pub const UNIT_SPEED: f32 = 5.0;
/// Planar distance below which a moving unit is considered arrived.
pub const ARRIVAL_RADIUS: f32 = 1.0;
/// Largest formation offset preserved by a group move.
pub const MAX_FORMATION_OFFSET: f32 = 6.0;
/// Units spawned per player on join and on respawn.
pub const UNITS_PER_PLAYER: usize = 5;
/// Distance of the four fixed quadrant spawn anchors from the origin.
pub const SPAWN_ANCHOR_EXTENT: f32 = 20.0;
/// Radius of the disc used for randomized anchors past the fourth player.
pub const SPAWN_JITTER_RADIUS: f32 = 25.0;
/// Radius of the ring a player's unit batch is placed on around its anchor.
pub const SPAWN_RING_RADIUS: f32 = 2.0;
/// Number of cosmetic color slots cycled through by join order.
pub const COLOR_COUNT: u8 = 8;

/// Simulation tuning knobs.
///
/// Every distance/speed threshold the movement rules depend on lives here so
/// server binaries can override them from the command line and clients can
/// predict with the exact same values they were configured with.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub unit_speed: f32,
    pub arrival_radius: f32,
    pub max_formation_offset: f32,
    pub units_per_player: usize,
    pub spawn_anchor_extent: f32,
    pub spawn_jitter_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            unit_speed: UNIT_SPEED,
            arrival_radius: ARRIVAL_RADIUS,
            max_formation_offset: MAX_FORMATION_OFFSET,
            units_per_player: UNITS_PER_PLAYER,
            spawn_anchor_extent: SPAWN_ANCHOR_EXTENT,
            spawn_jitter_radius: SPAWN_JITTER_RADIUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = SimConfig::default();
        assert_eq!(config.unit_speed, UNIT_SPEED);
        assert_eq!(config.arrival_radius, ARRIVAL_RADIUS);
        assert_eq!(config.max_formation_offset, MAX_FORMATION_OFFSET);
        assert_eq!(config.units_per_player, UNITS_PER_PLAYER);
    }

    #[test]
    fn test_config_is_copy() {
        let config = SimConfig::default();
        let copy = config;
        assert_eq!(copy.arrival_radius, config.arrival_radius);
    }
}
