//! Per-unit movement state machine and the cursor entity.
//!
//! A unit is either idle (`target == None`) or moving toward a target.
//! Targets are only accepted through [`Unit::try_set_target`], which gates
//! every command behind a strictly increasing command tick. That single rule
//! is what keeps unit state convergent when commands are duplicated or
//! delivered out of order by the transport.

use crate::math::Vec3;
use crate::{PlayerId, SimConfig, UnitId};
use serde::{Deserialize, Serialize};

/// A commandable mobile entity.
///
/// `position`, `target` and `last_command_tick` are authoritative state:
/// only the server mutates them, clients hold read-only replicas (plus an
/// optional prediction copy that is thrown away on every snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Controlling player. Set at spawn, never changed by commands.
    pub owner: PlayerId,
    pub position: Vec3,
    /// Destination while moving. `None` means idle; the invariant that a
    /// moving unit always has a real destination holds by construction.
    pub target: Option<Vec3>,
    /// Tick of the most recently accepted command for this unit.
    pub last_command_tick: u32,
    /// Cosmetic grouping index, assigned at spawn and replicated.
    pub color_index: u8,
}

impl Unit {
    pub fn new(id: UnitId, owner: PlayerId, position: Vec3, color_index: u8) -> Self {
        Self {
            id,
            owner,
            position,
            target: None,
            last_command_tick: 0,
            color_index,
        }
    }

    /// True while the unit has a live destination.
    pub fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Applies the command admission rule: the new target is accepted only
    /// if `tick` is strictly greater than the last accepted command tick.
    /// Ties are duplicates and are rejected. Returns whether it took effect.
    pub fn try_set_target(&mut self, target: Vec3, tick: u32) -> bool {
        if tick <= self.last_command_tick {
            return false;
        }
        self.last_command_tick = tick;
        self.target = Some(target);
        true
    }

    /// Advances the unit by one simulation step.
    ///
    /// Moving units translate straight toward the target on the ground
    /// plane. A unit closer to its target than the arrival radius clears the
    /// target and goes idle instead of moving. Idle units do not move at all.
    pub fn step(&mut self, dt: f32, config: &SimConfig) {
        let target = match self.target {
            Some(target) => target,
            None => return,
        };

        let remaining = self.position.ground_distance_to(&target);
        if remaining < config.arrival_radius {
            self.target = None;
            return;
        }

        // Never step past the destination: a large dt or high speed would
        // otherwise overshoot by more than the arrival radius and leave the
        // unit bouncing across the target forever.
        let direction = (target - self.position).ground_normalized();
        let step = (config.unit_speed * dt).min(remaining);
        self.position = self.position + direction * step;

        // The step may land inside the arrival radius; clear immediately so
        // the unit never oscillates around its destination.
        if self.position.ground_distance_to(&target) < config.arrival_radius {
            self.target = None;
        }
    }
}

/// Per-player pointer entity.
///
/// The position is written once per tick by the server from that player's
/// latest input sample and replicated to everyone for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub owner: PlayerId,
    pub position: Vec3,
    pub color_index: u8,
}

impl Cursor {
    pub fn new(owner: PlayerId, color_index: u8) -> Self {
        Self {
            owner,
            position: Vec3::default(),
            color_index,
        }
    }
}
