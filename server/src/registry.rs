//! Authority-owned lookup registries for units and cursors.
//!
//! The registries are the arena for all replicated entity state: they own
//! the structs, and everything else (command resolution, group math, the
//! tick step) borrows through them. All access happens on the single tick
//! task, so no interior locking is needed. Registration and removal are
//! driven synchronously by the spawn/despawn points in the game state so a
//! registered id can never dangle.

use shared::{Cursor, PlayerId, Unit, UnitId};
use std::collections::HashMap;

/// O(1) mapping from unit id to the unit itself.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: HashMap<UnitId, Unit>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the unit, replacing any previous unit under the same id.
    pub fn register(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Removes the unit if present; a miss is a no-op.
    pub fn unregister(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// The single lookup path used by command resolution.
    pub fn try_get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn try_get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Iterates the live set. No ordering guarantee.
    pub fn all(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    /// Ids of every unit owned by `owner`, for despawn and respawn sweeps.
    pub fn ids_owned_by(&self, owner: PlayerId) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|unit| unit.owner == owner)
            .map(|unit| unit.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Same pattern for the lightweight per-player cursor entities, keyed by
/// the owning player since each player has exactly one.
#[derive(Debug, Default)]
pub struct CursorRegistry {
    cursors: HashMap<PlayerId, Cursor>,
}

impl CursorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cursor: Cursor) {
        self.cursors.insert(cursor.owner, cursor);
    }

    pub fn unregister(&mut self, owner: PlayerId) -> Option<Cursor> {
        self.cursors.remove(&owner)
    }

    pub fn try_get(&self, owner: PlayerId) -> Option<&Cursor> {
        self.cursors.get(&owner)
    }

    pub fn try_get_mut(&mut self, owner: PlayerId) -> Option<&mut Cursor> {
        self.cursors.get_mut(&owner)
    }

    pub fn all(&self) -> impl Iterator<Item = &Cursor> {
        self.cursors.values()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
