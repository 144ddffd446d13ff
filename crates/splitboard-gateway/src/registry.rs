//! Session registry: which side of the board each connection owns.

use std::collections::HashMap;

use serde::Serialize;
use splitboard_core::protocol::Side;

/// Side handed to the next connection when the registry holds `size` entries.
///
/// Even sizes get `left`, odd sizes get `right`. A side freed by a disconnect
/// is reused whenever the parity comes back around.
pub fn side_for_size(size: usize) -> Side {
    if size % 2 == 0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Number of live connections per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    pub left: usize,
    pub right: usize,
}

/// Maps connection ids to their assigned side.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sides: HashMap<String, Side>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a side to `conn_id` and record it.
    ///
    /// A connection holds at most one side: calling this again for a
    /// registered id returns the side it already has.
    pub fn on_connect(&mut self, conn_id: &str) -> Side {
        if let Some(side) = self.sides.get(conn_id) {
            return *side;
        }
        let side = side_for_size(self.sides.len());
        self.sides.insert(conn_id.to_string(), side);
        side
    }

    /// Forget `conn_id`. Absent ids are a no-op.
    pub fn on_disconnect(&mut self, conn_id: &str) -> Option<Side> {
        self.sides.remove(conn_id)
    }

    /// `None` means the connection is unassigned.
    pub fn side_of(&self, conn_id: &str) -> Option<Side> {
        self.sides.get(conn_id).copied()
    }

    pub fn len(&self) -> usize {
        self.sides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    pub fn counts(&self) -> SideCounts {
        self.sides
            .values()
            .fold(SideCounts::default(), |mut counts, side| {
                match side {
                    Side::Left => counts.left += 1,
                    Side::Right => counts.right += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_for_size_parity() {
        assert_eq!(side_for_size(0), Side::Left);
        assert_eq!(side_for_size(1), Side::Right);
        assert_eq!(side_for_size(2), Side::Left);
        assert_eq!(side_for_size(7), Side::Right);
    }

    #[test]
    fn test_connects_alternate_from_left() {
        let mut registry = SessionRegistry::new();
        let sides: Vec<Side> = (0..6)
            .map(|i| registry.on_connect(&format!("conn-{i}")))
            .collect();
        assert_eq!(
            sides,
            vec![
                Side::Left,
                Side::Right,
                Side::Left,
                Side::Right,
                Side::Left,
                Side::Right
            ]
        );
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.counts(), SideCounts { left: 3, right: 3 });
    }

    #[test]
    fn test_disconnect_frees_side_by_parity() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.on_connect("c1"), Side::Left);
        assert_eq!(registry.on_connect("c2"), Side::Right);

        assert_eq!(registry.on_disconnect("c2"), Some(Side::Right));
        // One entry left, so the next connection lands on the right.
        assert_eq!(registry.on_connect("c3"), Side::Right);

        assert_eq!(registry.on_disconnect("c1"), Some(Side::Left));
        // Size is back to one: the parity rule ignores which side was freed.
        assert_eq!(registry.on_connect("c4"), Side::Right);
        assert_eq!(registry.counts(), SideCounts { left: 0, right: 2 });
    }

    #[test]
    fn test_disconnected_connection_is_unassigned() {
        let mut registry = SessionRegistry::new();
        registry.on_connect("c1");
        assert_eq!(registry.side_of("c1"), Some(Side::Left));

        registry.on_disconnect("c1");
        assert_eq!(registry.side_of("c1"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_disconnect_unknown_is_noop() {
        let mut registry = SessionRegistry::new();
        registry.on_connect("c1");
        assert_eq!(registry.on_disconnect("ghost"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reconnect_same_id_keeps_side() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.on_connect("c1"), Side::Left);
        assert_eq!(registry.on_connect("c1"), Side::Left);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.on_connect("c2"), Side::Right);
    }
}
