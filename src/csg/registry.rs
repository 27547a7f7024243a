use slotmap::SlotMap;

use crate::error::CsgError;

use super::axis_box::AxisBox;

slotmap::new_key_type! {
    /// Unique identifier for a box registered for decomposition.
    pub struct BoxId;
}

/// Whether a box contributes volume or marks a boundary piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxRole {
    Bulk,
    Facet,
}

/// Data associated with a registered box.
#[derive(Debug, Clone)]
pub struct BoxData {
    /// The box itself.
    pub shape: AxisBox,
    /// Role under which the box was first registered.
    pub role: BoxRole,
}

/// Arena that owns every box taking part in a decomposition.
///
/// Boxes are deduplicated by (tolerant) value, so registering an equal box
/// twice yields the same [`BoxId`]. Ids stay stable for the life of the store
/// and key the per-box results of a [`super::Decomposition`].
#[derive(Debug, Clone, Default)]
pub struct BoxStore {
    boxes: SlotMap<BoxId, BoxData>,
    order: Vec<BoxId>,
}

impl BoxStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a box and returns its ID, reusing the ID of an equal box.
    pub fn register(&mut self, shape: &AxisBox, role: BoxRole) -> BoxId {
        if let Some(id) = self.find(shape) {
            return id;
        }
        let id = self.boxes.insert(BoxData {
            shape: shape.clone(),
            role,
        });
        self.order.push(id);
        id
    }

    /// Looks up the ID of a box equal to `shape`.
    #[must_use]
    pub fn find(&self, shape: &AxisBox) -> Option<BoxId> {
        self.order
            .iter()
            .copied()
            .find(|&id| self.boxes.get(id).is_some_and(|data| &data.shape == shape))
    }

    /// Returns the box data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID does not belong to this store.
    pub fn get(&self, id: BoxId) -> Result<&BoxData, CsgError> {
        self.boxes
            .get(id)
            .ok_or_else(|| CsgError::UnregisteredBox(format!("{id:?}")))
    }

    /// IDs in registration order.
    #[must_use]
    pub fn ids(&self) -> &[BoxId] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn equal_boxes_share_an_id() {
        let mut store = BoxStore::new();
        let a = AxisBox::interval(0.0, 1.0);
        let id1 = store.register(&a, BoxRole::Bulk);
        let id2 = store.register(&AxisBox::interval(0.0, 1.0 + 1e-12), BoxRole::Facet);
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id1).unwrap().role, BoxRole::Bulk);
    }

    #[test]
    fn registration_order_is_kept() {
        let mut store = BoxStore::new();
        let ids: Vec<BoxId> = (0..4)
            .map(|i| store.register(&AxisBox::interval(f64::from(i), f64::from(i) + 1.0), BoxRole::Bulk))
            .collect();
        assert_eq!(store.ids(), ids.as_slice());
        assert!(store.find(&AxisBox::interval(7.0, 8.0)).is_none());
    }

    #[test]
    fn foreign_id_is_rejected() {
        let mut other = BoxStore::new();
        let id = other.register(&AxisBox::interval(0.0, 1.0), BoxRole::Bulk);
        let store = BoxStore::new();
        assert!(store.get(id).is_err());
    }
}
