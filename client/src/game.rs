//! Client-side replicated state, selection and latency-masking prediction.
//!
//! The client never owns the truth. It holds the last confirmed snapshot,
//! plus a prediction copy of its own units that runs the exact same movement
//! rules as the server, seeded by locally issued commands. The prediction is
//! replaced wholesale every time a newer snapshot arrives and is never
//! consulted for command admission or ownership decisions.

use log::debug;
use shared::{plan_group_move, Cursor, PlayerId, SimConfig, Unit, UnitId, Vec3};
use std::collections::{HashMap, HashSet};

/// State change surfaced to the external renderer.
///
/// The authoritative write and the visual side effect are decoupled: the
/// snapshot apply records what changed, the renderer drains events whenever
/// it likes.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    Spawned { id: UnitId, color_index: u8 },
    Despawned { id: UnitId },
    ColorChanged { id: UnitId, color_index: u8 },
}

pub struct ClientGameState {
    config: SimConfig,

    confirmed_units: HashMap<UnitId, Unit>,
    confirmed_cursors: HashMap<PlayerId, Cursor>,
    last_confirmed_tick: u32,

    /// Prediction shadow of the local player's own units.
    predicted_units: HashMap<UnitId, Unit>,

    /// Locally selected unit ids. UI-only, never replicated.
    selected: HashSet<UnitId>,
    /// Cosmetic marker at the destination of the last local move command.
    move_marker: Option<Vec3>,

    events: Vec<UnitEvent>,
}

impl ClientGameState {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            confirmed_units: HashMap::new(),
            confirmed_cursors: HashMap::new(),
            last_confirmed_tick: 0,
            predicted_units: HashMap::new(),
            selected: HashSet::new(),
            move_marker: None,
            events: Vec::new(),
        }
    }

    pub fn last_confirmed_tick(&self) -> u32 {
        self.last_confirmed_tick
    }

    pub fn confirmed_units(&self) -> impl Iterator<Item = &Unit> {
        self.confirmed_units.values()
    }

    pub fn cursors(&self) -> impl Iterator<Item = &Cursor> {
        self.confirmed_cursors.values()
    }

    pub fn move_marker(&self) -> Option<Vec3> {
        self.move_marker
    }

    pub fn selected(&self) -> &HashSet<UnitId> {
        &self.selected
    }

    /// Applies an authoritative snapshot. Snapshots older than the newest
    /// one already applied are dropped (UDP may reorder them); a fresh
    /// snapshot replaces the confirmed state and the entire prediction copy.
    pub fn apply_snapshot(
        &mut self,
        tick: u32,
        units: Vec<Unit>,
        cursors: Vec<Cursor>,
        local_player: Option<PlayerId>,
    ) {
        if tick < self.last_confirmed_tick {
            debug!(
                "Dropping stale snapshot tick {} (have {})",
                tick, self.last_confirmed_tick
            );
            return;
        }

        self.diff_into_events(&units);

        self.confirmed_units = units.into_iter().map(|u| (u.id, u)).collect();
        self.confirmed_cursors = cursors.into_iter().map(|c| (c.owner, c)).collect();
        self.last_confirmed_tick = tick;

        // Replicated truth arrived: throw the old prediction away and reseed
        // it from the confirmed state of our own units.
        self.predicted_units.clear();
        if let Some(local_player) = local_player {
            for unit in self.confirmed_units.values() {
                if unit.owner == local_player {
                    self.predicted_units.insert(unit.id, unit.clone());
                }
            }
        }

        // Selection may reference units that no longer exist.
        let live: HashSet<UnitId> = self.confirmed_units.keys().copied().collect();
        self.selected.retain(|id| live.contains(id));
    }

    fn diff_into_events(&mut self, incoming: &[Unit]) {
        for unit in incoming {
            match self.confirmed_units.get(&unit.id) {
                None => self.events.push(UnitEvent::Spawned {
                    id: unit.id,
                    color_index: unit.color_index,
                }),
                Some(old) if old.color_index != unit.color_index => {
                    self.events.push(UnitEvent::ColorChanged {
                        id: unit.id,
                        color_index: unit.color_index,
                    })
                }
                Some(_) => {}
            }
        }

        let incoming_ids: HashSet<UnitId> = incoming.iter().map(|u| u.id).collect();
        for id in self.confirmed_units.keys() {
            if !incoming_ids.contains(id) {
                self.events.push(UnitEvent::Despawned { id: *id });
            }
        }
    }

    /// Hands accumulated state-change events to the renderer.
    pub fn drain_events(&mut self) -> Vec<UnitEvent> {
        std::mem::take(&mut self.events)
    }

    /// Marks an owned unit as selected. Selecting units the local player
    /// does not own is refused here, but a stale selection surviving an
    /// ownership change is harmless: the server re-checks every command.
    pub fn select(&mut self, id: UnitId, local_player: PlayerId) -> bool {
        match self.confirmed_units.get(&id) {
            Some(unit) if unit.owner == local_player => {
                self.selected.insert(id);
                true
            }
            _ => false,
        }
    }

    pub fn deselect(&mut self, id: UnitId) {
        self.selected.remove(&id);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Seeds the prediction shadow with a local move command and drops the
    /// cosmetic destination marker, mirroring what the server will do once
    /// the command arrives. Returns the addressed unit ids for the packet.
    pub fn plan_local_move(&mut self, tick: u32, target: Vec3) -> Vec<UnitId> {
        // Only ids with a live prediction entry take part, and they keep
        // their pairing with the planned targets.
        let admitted: Vec<(UnitId, Vec3)> = self
            .selected
            .iter()
            .filter_map(|id| self.predicted_units.get(id).map(|u| (*id, u.position)))
            .collect();
        if admitted.is_empty() {
            return Vec::new();
        }

        let positions: Vec<Vec3> = admitted.iter().map(|(_, p)| *p).collect();
        let plan = plan_group_move(&positions, target, self.config.max_formation_offset);

        for ((id, _), unit_target) in admitted.iter().zip(plan) {
            if let Some(unit) = self.predicted_units.get_mut(id) {
                unit.try_set_target(unit_target, tick);
            }
        }

        self.move_marker = Some(target);
        admitted.into_iter().map(|(id, _)| id).collect()
    }

    /// Advances the prediction shadow between snapshots with the same
    /// movement rules the server runs.
    pub fn update_prediction(&mut self, dt: f32) {
        for unit in self.predicted_units.values_mut() {
            unit.step(dt, &self.config);
        }
    }

    /// Units for display: the local player's units come from the prediction
    /// shadow, everyone else's from the confirmed snapshot.
    pub fn display_units(&self, local_player: Option<PlayerId>) -> Vec<Unit> {
        let mut units = Vec::with_capacity(self.confirmed_units.len());
        for unit in self.confirmed_units.values() {
            if Some(unit.owner) == local_player {
                if let Some(predicted) = self.predicted_units.get(&unit.id) {
                    units.push(predicted.clone());
                    continue;
                }
            }
            units.push(unit.clone());
        }
        units
    }
}
