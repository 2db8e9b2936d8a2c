//! Authoritative game state and command application.
//!
//! This is the only place replicated unit/cursor state is ever written.
//! Commands arrive already associated with their issuing player (resolved
//! from the network address by the server loop) and are applied here with
//! existence, ownership and staleness filtering; everything that fails a
//! filter is dropped silently because the channel is fire-and-forget and
//! the issuer has no reliable way to be told anyway.

use crate::registry::{CursorRegistry, UnitRegistry};
use log::{debug, info};
use rand::Rng;
use shared::{
    plan_group_move, Cursor, PlayerId, SimConfig, Unit, UnitId, Vec3, COLOR_COUNT,
    SPAWN_RING_RADIUS,
};
use std::collections::HashMap;

/// A validated-on-application command queued by the network layer.
#[derive(Debug, Clone)]
pub enum Command {
    MoveUnits {
        tick: u32,
        target: Vec3,
        unit_ids: Vec<UnitId>,
    },
    RequestRespawn {
        tick: u32,
    },
}

pub struct GameState {
    pub tick: u32,
    config: SimConfig,
    units: UnitRegistry,
    cursors: CursorRegistry,
    /// Remembered spawn anchor per connected player, used for respawn.
    spawn_anchors: HashMap<PlayerId, Vec3>,
    /// Total players ever joined; drives anchor and color assignment.
    join_count: u32,
    next_unit_id: UnitId,
}

impl GameState {
    pub fn new(config: SimConfig) -> Self {
        Self {
            tick: 0,
            config,
            units: UnitRegistry::new(),
            cursors: CursorRegistry::new(),
            spawn_anchors: HashMap::new(),
            join_count: 0,
            next_unit_id: 1,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn cursors(&self) -> &CursorRegistry {
        &self.cursors
    }

    /// Spawns a player's unit batch and cursor.
    ///
    /// The first four players get the four fixed quadrant anchors in join
    /// order; later players get a random point inside the configured spawn
    /// disc. The anchor is remembered for respawn as long as the player
    /// stays connected.
    pub fn add_player(&mut self, player_id: PlayerId) {
        let anchor = self.assign_anchor();
        let color_index = (self.join_count % COLOR_COUNT as u32) as u8;
        self.join_count += 1;

        self.spawn_anchors.insert(player_id, anchor);
        self.cursors.register(Cursor::new(player_id, color_index));
        self.spawn_batch(player_id, anchor, color_index);

        info!(
            "Added player {} at anchor ({:.1}, {:.1}) with color {}",
            player_id, anchor.x, anchor.z, color_index
        );
    }

    /// Despawns everything a leaving player owns. Pending commands that
    /// still reference these units will simply fail resolution later.
    pub fn remove_player(&mut self, player_id: &PlayerId) {
        for id in self.units.ids_owned_by(*player_id) {
            self.units.unregister(id);
        }
        self.cursors.unregister(*player_id);
        self.spawn_anchors.remove(player_id);
        info!("Removed player {}", player_id);
    }

    /// Applies a queued command on behalf of `issuer`.
    pub fn apply_command(&mut self, issuer: PlayerId, command: Command) {
        match command {
            Command::MoveUnits {
                tick,
                target,
                unit_ids,
            } => self.move_units(issuer, tick, target, &unit_ids),
            Command::RequestRespawn { tick } => self.respawn(issuer, tick),
        }
    }

    /// Group movement: resolves ids, filters to units the issuer owns,
    /// plans formation-preserving per-unit targets and feeds each through
    /// the per-unit admission rule.
    fn move_units(&mut self, issuer: PlayerId, tick: u32, target: Vec3, unit_ids: &[UnitId]) {
        let mut admitted: Vec<UnitId> = Vec::with_capacity(unit_ids.len());
        let mut positions: Vec<Vec3> = Vec::with_capacity(unit_ids.len());

        for &id in unit_ids {
            match self.units.try_get(id) {
                // A stale client selection may legitimately address units
                // that died or changed hands; skip them without complaint.
                None => {}
                Some(unit) if unit.owner != issuer => {
                    debug!(
                        "Player {} tried to command unit {} owned by {}",
                        issuer, id, unit.owner
                    );
                }
                Some(unit) => {
                    admitted.push(id);
                    positions.push(unit.position);
                }
            }
        }

        if admitted.is_empty() {
            return;
        }

        let plan = plan_group_move(&positions, target, self.config.max_formation_offset);

        let mut accepted = 0;
        for (&id, &unit_target) in admitted.iter().zip(&plan) {
            if let Some(unit) = self.units.try_get_mut(id) {
                if unit.try_set_target(unit_target, tick) {
                    accepted += 1;
                }
            }
        }

        debug!(
            "MoveUnits from player {} tick {}: {}/{} units accepted",
            issuer,
            tick,
            accepted,
            unit_ids.len()
        );
    }

    /// Destroys the issuer's current units and recreates a full batch at
    /// the remembered anchor: fresh ids, same owner and color. Repeated
    /// requests just repeat the cycle; respawn carries no staleness gate.
    fn respawn(&mut self, issuer: PlayerId, tick: u32) {
        let anchor = match self.spawn_anchors.get(&issuer) {
            Some(anchor) => *anchor,
            None => {
                debug!("Respawn from unknown player {} dropped", issuer);
                return;
            }
        };
        let color_index = match self.cursors.try_get(issuer) {
            Some(cursor) => cursor.color_index,
            None => 0,
        };

        let old = self.units.ids_owned_by(issuer);
        let destroyed = old.len();
        for id in old {
            self.units.unregister(id);
        }
        self.spawn_batch(issuer, anchor, color_index);

        info!(
            "Respawned player {} (tick {}): {} units destroyed, {} spawned",
            issuer, tick, destroyed, self.config.units_per_player
        );
    }

    /// Writes a player's sampled pointer position into its cursor. This is
    /// the authoritative cursor echo performed once per tick per sample.
    pub fn set_cursor(&mut self, owner: PlayerId, position: Vec3) {
        if let Some(cursor) = self.cursors.try_get_mut(owner) {
            cursor.position = position;
        }
    }

    /// Advances every unit by one fixed step.
    pub fn step(&mut self, dt: f32) {
        let config = self.config;
        for unit in self.units.all_mut() {
            unit.step(dt, &config);
        }
        self.tick += 1;
    }

    /// Replicated state for a snapshot packet.
    pub fn snapshot(&self) -> (Vec<Unit>, Vec<Cursor>) {
        (
            self.units.all().cloned().collect(),
            self.cursors.all().cloned().collect(),
        )
    }

    fn assign_anchor(&mut self) -> Vec3 {
        let extent = self.config.spawn_anchor_extent;
        match self.join_count {
            0 => Vec3::new(extent, 0.0, extent),
            1 => Vec3::new(-extent, 0.0, extent),
            2 => Vec3::new(-extent, 0.0, -extent),
            3 => Vec3::new(extent, 0.0, -extent),
            _ => {
                let mut rng = rand::thread_rng();
                let angle = rng.gen::<f32>() * std::f32::consts::TAU;
                // sqrt for a uniform distribution over the disc
                let radius = self.config.spawn_jitter_radius * rng.gen::<f32>().sqrt();
                Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
            }
        }
    }

    fn spawn_batch(&mut self, owner: PlayerId, anchor: Vec3, color_index: u8) {
        let count = self.config.units_per_player;
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            let position = anchor
                + Vec3::new(
                    SPAWN_RING_RADIUS * angle.cos(),
                    0.0,
                    SPAWN_RING_RADIUS * angle.sin(),
                );

            let id = self.next_unit_id;
            self.next_unit_id += 1;
            self.units.register(Unit::new(id, owner, position, color_index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::UNITS_PER_PLAYER;

    fn game() -> GameState {
        GameState::new(SimConfig::default())
    }

    fn owned_ids(game: &GameState, owner: PlayerId) -> Vec<UnitId> {
        let mut ids = game.units().ids_owned_by(owner);
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_add_player_spawns_batch_and_cursor() {
        let mut game = game();
        game.add_player(1);

        assert_eq!(game.units().len(), UNITS_PER_PLAYER);
        assert_eq!(game.cursors().len(), 1);
        assert!(game.units().all().all(|u| u.owner == 1 && !u.is_moving()));
    }

    #[test]
    fn test_first_four_anchors_are_deterministic_quadrants() {
        let mut game = game();
        for player in 1..=4 {
            game.add_player(player);
        }

        let extent = SimConfig::default().spawn_anchor_extent;
        let expected = [
            Vec3::new(extent, 0.0, extent),
            Vec3::new(-extent, 0.0, extent),
            Vec3::new(-extent, 0.0, -extent),
            Vec3::new(extent, 0.0, -extent),
        ];

        for (player, anchor) in (1..=4).zip(expected) {
            let batch = game.units().ids_owned_by(player);
            let positions: Vec<Vec3> = batch
                .iter()
                .map(|&id| game.units().try_get(id).unwrap().position)
                .collect();
            let center = shared::formation::centroid(&positions).unwrap();
            assert_approx_eq!(center.x, anchor.x, 1e-3);
            assert_approx_eq!(center.z, anchor.z, 1e-3);
        }
    }

    #[test]
    fn test_late_joiner_anchor_within_jitter_radius() {
        let mut game = game();
        for player in 1..=6 {
            game.add_player(player);
        }

        let positions: Vec<Vec3> = game
            .units()
            .ids_owned_by(6)
            .iter()
            .map(|&id| game.units().try_get(id).unwrap().position)
            .collect();
        let center = shared::formation::centroid(&positions).unwrap();
        let limit = SimConfig::default().spawn_jitter_radius + SPAWN_RING_RADIUS;
        assert!(center.ground_magnitude() <= limit + 1e-3);
    }

    #[test]
    fn test_colors_assigned_by_join_order() {
        let mut game = game();
        game.add_player(5);
        game.add_player(9);

        assert_eq!(game.cursors().try_get(5).unwrap().color_index, 0);
        assert_eq!(game.cursors().try_get(9).unwrap().color_index, 1);
        assert!(game
            .units()
            .ids_owned_by(9)
            .iter()
            .all(|&id| game.units().try_get(id).unwrap().color_index == 1));
    }

    #[test]
    fn test_remove_player_despawns_everything() {
        let mut game = game();
        game.add_player(1);
        game.add_player(2);

        game.remove_player(&1);

        assert_eq!(game.units().len(), UNITS_PER_PLAYER);
        assert!(game.units().ids_owned_by(1).is_empty());
        assert!(game.cursors().try_get(1).is_none());
        assert!(game.cursors().try_get(2).is_some());
    }

    #[test]
    fn test_move_units_sets_targets_on_owned_units() {
        let mut game = game();
        game.add_player(1);
        let ids = owned_ids(&game, 1);

        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target: Vec3::new(50.0, 0.0, 50.0),
                unit_ids: ids.clone(),
            },
        );

        for id in ids {
            assert!(game.units().try_get(id).unwrap().is_moving());
        }
    }

    #[test]
    fn test_ownership_mix_only_moves_owned_units() {
        let mut game = game();
        game.add_player(1);
        game.add_player(2);

        let mine = owned_ids(&game, 1);
        let theirs = owned_ids(&game, 2);

        // A stale selection addressing two of each: only player 1's units
        // may move, the others are untouched.
        let mixed = vec![mine[0], mine[1], theirs[0], theirs[1]];
        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target: Vec3::new(0.0, 0.0, 0.0),
                unit_ids: mixed,
            },
        );

        assert!(game.units().try_get(mine[0]).unwrap().is_moving());
        assert!(game.units().try_get(mine[1]).unwrap().is_moving());
        assert!(!game.units().try_get(theirs[0]).unwrap().is_moving());
        assert!(!game.units().try_get(theirs[1]).unwrap().is_moving());
        assert_eq!(game.units().try_get(theirs[0]).unwrap().last_command_tick, 0);
    }

    #[test]
    fn test_move_units_with_unknown_ids_is_partial() {
        let mut game = game();
        game.add_player(1);
        let ids = owned_ids(&game, 1);

        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target: Vec3::new(10.0, 0.0, 0.0),
                unit_ids: vec![ids[0], 9999],
            },
        );

        assert!(game.units().try_get(ids[0]).unwrap().is_moving());
    }

    #[test]
    fn test_move_units_empty_admitted_set_is_noop() {
        let mut game = game();
        game.add_player(1);
        game.add_player(2);
        let theirs = owned_ids(&game, 2);

        // Player 1 addresses only foreign and unknown ids.
        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target: Vec3::new(10.0, 0.0, 0.0),
                unit_ids: vec![theirs[0], 12345],
            },
        );

        assert!(game.units().all().all(|u| !u.is_moving()));
    }

    #[test]
    fn test_group_arrives_as_cluster_around_target() {
        let mut game = game();
        game.add_player(1);
        let ids = owned_ids(&game, 1);
        let target = Vec3::new(30.0, 0.0, -15.0);

        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target,
                unit_ids: ids.clone(),
            },
        );

        // Run the simulation until every unit has arrived.
        for _ in 0..600 {
            game.step(1.0 / 30.0);
        }

        let config = SimConfig::default();
        for id in ids {
            let unit = game.units().try_get(id).unwrap();
            assert!(!unit.is_moving());
            let distance = unit.position.ground_distance_to(&target);
            assert!(distance <= config.max_formation_offset + config.arrival_radius);
        }
    }

    #[test]
    fn test_stale_group_command_ignored_per_unit() {
        let mut game = game();
        game.add_player(1);
        let ids = owned_ids(&game, 1);

        let newest = Vec3::new(40.0, 0.0, 0.0);
        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 5,
                target: newest,
                unit_ids: ids.clone(),
            },
        );
        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 3,
                target: Vec3::new(-40.0, 0.0, 0.0),
                unit_ids: ids.clone(),
            },
        );

        for id in ids {
            let unit = game.units().try_get(id).unwrap();
            assert_eq!(unit.last_command_tick, 5);
            // All planned targets derive from the tick-5 command.
            assert!(unit.target.unwrap().x > 0.0);
        }
    }

    #[test]
    fn test_respawn_recreates_batch_with_fresh_ids() {
        let mut game = game();
        game.add_player(1);
        let old_ids = owned_ids(&game, 1);
        let old_positions: Vec<Vec3> = old_ids
            .iter()
            .map(|&id| game.units().try_get(id).unwrap().position)
            .collect();
        let old_center = shared::formation::centroid(&old_positions).unwrap();

        // Scatter the batch first so the respawn visibly resets it.
        game.apply_command(
            1,
            Command::MoveUnits {
                tick: 1,
                target: Vec3::new(60.0, 0.0, 60.0),
                unit_ids: old_ids.clone(),
            },
        );
        for _ in 0..60 {
            game.step(1.0 / 30.0);
        }

        game.apply_command(1, Command::RequestRespawn { tick: 2 });

        let new_ids = owned_ids(&game, 1);
        assert_eq!(new_ids.len(), old_ids.len());
        for id in &old_ids {
            assert!(!new_ids.contains(id), "respawn must assign fresh ids");
        }

        // Same remembered anchor, same owner and color.
        let new_positions: Vec<Vec3> = new_ids
            .iter()
            .map(|&id| game.units().try_get(id).unwrap().position)
            .collect();
        let new_center = shared::formation::centroid(&new_positions).unwrap();
        assert_approx_eq!(new_center.x, old_center.x, 1e-3);
        assert_approx_eq!(new_center.z, old_center.z, 1e-3);
        for &id in &new_ids {
            let unit = game.units().try_get(id).unwrap();
            assert_eq!(unit.owner, 1);
            assert_eq!(unit.color_index, 0);
            assert!(!unit.is_moving());
        }
    }

    #[test]
    fn test_repeated_respawn_is_idempotent_cycle() {
        let mut game = game();
        game.add_player(1);

        game.apply_command(1, Command::RequestRespawn { tick: 1 });
        let first = owned_ids(&game, 1);
        game.apply_command(1, Command::RequestRespawn { tick: 1 });
        let second = owned_ids(&game, 1);

        assert_eq!(first.len(), UNITS_PER_PLAYER);
        assert_eq!(second.len(), UNITS_PER_PLAYER);
        assert_ne!(first, second);
    }

    #[test]
    fn test_respawn_from_unknown_player_dropped() {
        let mut game = game();
        game.add_player(1);
        let before = game.units().len();

        game.apply_command(42, Command::RequestRespawn { tick: 1 });

        assert_eq!(game.units().len(), before);
    }

    #[test]
    fn test_cursor_echo_writes_position() {
        let mut game = game();
        game.add_player(1);

        game.set_cursor(1, Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(
            game.cursors().try_get(1).unwrap().position,
            Vec3::new(4.0, 0.0, -2.0)
        );

        // Unknown players are skipped without error.
        game.set_cursor(77, Vec3::new(1.0, 0.0, 1.0));
        assert!(game.cursors().try_get(77).is_none());
    }

    #[test]
    fn test_step_advances_tick_counter() {
        let mut game = game();
        assert_eq!(game.tick, 0);
        game.step(1.0 / 30.0);
        game.step(1.0 / 30.0);
        assert_eq!(game.tick, 2);
    }

    #[test]
    fn test_snapshot_contains_live_state() {
        let mut game = game();
        game.add_player(1);
        game.add_player(2);
        game.remove_player(&1);

        let (units, cursors) = game.snapshot();
        assert_eq!(units.len(), UNITS_PER_PLAYER);
        assert!(units.iter().all(|u| u.owner == 2));
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].owner, 2);
    }
}
