//! Snapshot-buffered interpolation for remote entities.
//!
//! Remote players only update ~20 times a second and arrive a delay-queue
//! late, while rendering runs at 60 fps. Each remote entity keeps a small
//! chronological buffer of position snapshots and is rendered a fixed
//! `render_delay` behind the newest data, so there is almost always a pair of
//! snapshots bracketing the render time to interpolate between. When the feed
//! stalls the entity holds its last position; it is never extrapolated.

use shared::protocol::PlayerColor;
use shared::{INTERPOLATION_DELAY, POSITION_BUFFER_SIZE};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
}

/// One remote entity's snapshot buffer plus the ancillary data the renderer
/// wants alongside the position.
#[derive(Debug)]
pub struct InterpolatedEntity {
    buffer: Vec<PositionSnapshot>,
    render_delay: f64,
    max_buffer_size: usize,
    current_x: f32,
    current_y: f32,
    pub score: u32,
    pub color: PlayerColor,
}

impl InterpolatedEntity {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            render_delay: INTERPOLATION_DELAY,
            max_buffer_size: POSITION_BUFFER_SIZE,
            current_x: 0.0,
            current_y: 0.0,
            score: 0,
            color: PlayerColor::Gray,
        }
    }

    pub fn snapshot_count(&self) -> usize {
        self.buffer.len()
    }

    /// Inserts a snapshot, keeping the buffer chronological even when packets
    /// arrive out of order, and evicting the oldest entries past capacity.
    pub fn add_snapshot(&mut self, timestamp: f64, x: f32, y: f32) {
        let snapshot = PositionSnapshot { timestamp, x, y };

        match self.buffer.last() {
            Some(last) if timestamp < last.timestamp => {
                let index = self
                    .buffer
                    .iter()
                    .position(|s| timestamp < s.timestamp)
                    .unwrap_or(self.buffer.len());
                self.buffer.insert(index, snapshot);
            }
            _ => self.buffer.push(snapshot),
        }

        while self.buffer.len() > self.max_buffer_size {
            self.buffer.remove(0);
        }
    }

    /// Position to render at `now`, interpolated `render_delay` in the past.
    pub fn interpolated_position(&mut self, now: f64) -> (f32, f32) {
        if self.buffer.is_empty() {
            return (self.current_x, self.current_y);
        }

        let render_time = now - self.render_delay;

        let mut before: Option<&PositionSnapshot> = None;
        let mut after: Option<&PositionSnapshot> = None;
        for snapshot in &self.buffer {
            if snapshot.timestamp <= render_time {
                before = Some(snapshot);
            } else {
                after = Some(snapshot);
                break;
            }
        }

        match (before, after) {
            // Render time is older than everything we have: snap to earliest.
            (None, Some(_)) => {
                self.current_x = self.buffer[0].x;
                self.current_y = self.buffer[0].y;
            }
            // The feed has stalled: hold the newest position, no extrapolation.
            (Some(last), None) => {
                self.current_x = last.x;
                self.current_y = last.y;
            }
            (Some(a), Some(b)) => {
                let span = b.timestamp - a.timestamp;
                if span <= 0.0 {
                    self.current_x = b.x;
                    self.current_y = b.y;
                } else {
                    let t = (((render_time - a.timestamp) / span).clamp(0.0, 1.0)) as f32;
                    self.current_x = a.x + (b.x - a.x) * t;
                    self.current_y = a.y + (b.y - a.y) * t;
                }
            }
            (None, None) => {}
        }

        (self.current_x, self.current_y)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for InterpolatedEntity {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer-facing view of one remote entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteView {
    pub x: f32,
    pub y: f32,
    pub score: u32,
    pub color: PlayerColor,
}

/// All remote entities, keyed by player id.
#[derive(Debug, Default)]
pub struct EntityManager {
    entities: HashMap<u32, InterpolatedEntity>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Feeds a server snapshot for one entity, creating it on first sight.
    pub fn update_entity(
        &mut self,
        id: u32,
        timestamp: f64,
        x: f32,
        y: f32,
        score: u32,
        color: PlayerColor,
    ) {
        let entity = self.entities.entry(id).or_default();
        entity.add_snapshot(timestamp, x, y);
        entity.score = score;
        entity.color = color;
    }

    pub fn remove_entity(&mut self, id: u32) {
        self.entities.remove(&id);
    }

    /// Interpolated positions of every remote entity for one frame.
    pub fn interpolated_positions(&mut self, now: f64) -> HashMap<u32, RemoteView> {
        self.entities
            .iter_mut()
            .map(|(id, entity)| {
                let (x, y) = entity.interpolated_position(now);
                (
                    *id,
                    RemoteView {
                        x,
                        y,
                        score: entity.score,
                        color: entity.color,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// Queries with the render delay already compensated, so `at` is the
    /// effective render time.
    fn query(entity: &mut InterpolatedEntity, at: f64) -> (f32, f32) {
        entity.interpolated_position(at + INTERPOLATION_DELAY)
    }

    #[test]
    fn test_no_snapshots_holds_current_position() {
        let mut entity = InterpolatedEntity::new();
        assert_eq!(entity.interpolated_position(100.0), (0.0, 0.0));
    }

    #[test]
    fn test_interior_query_interpolates_linearly() {
        let mut entity = InterpolatedEntity::new();
        entity.add_snapshot(10.0, 100.0, 200.0);
        entity.add_snapshot(11.0, 200.0, 400.0);

        let (x, y) = query(&mut entity, 10.25);
        assert_approx_eq!(x, 125.0, 1e-3);
        assert_approx_eq!(y, 250.0, 1e-3);

        let (x, y) = query(&mut entity, 10.75);
        assert_approx_eq!(x, 175.0, 1e-3);
        assert_approx_eq!(y, 350.0, 1e-3);
    }

    #[test]
    fn test_query_before_all_data_snaps_to_earliest() {
        let mut entity = InterpolatedEntity::new();
        entity.add_snapshot(10.0, 100.0, 200.0);
        entity.add_snapshot(11.0, 200.0, 400.0);

        assert_eq!(query(&mut entity, 9.0), (100.0, 200.0));
        assert_eq!(query(&mut entity, 10.0), (100.0, 200.0));
    }

    #[test]
    fn test_query_after_all_data_holds_latest_without_extrapolating() {
        let mut entity = InterpolatedEntity::new();
        entity.add_snapshot(10.0, 100.0, 200.0);
        entity.add_snapshot(11.0, 200.0, 400.0);

        assert_eq!(query(&mut entity, 11.0), (200.0, 400.0));
        assert_eq!(query(&mut entity, 50.0), (200.0, 400.0));
    }

    #[test]
    fn test_equal_timestamps_use_newer_snapshot() {
        let mut entity = InterpolatedEntity::new();
        entity.add_snapshot(10.0, 100.0, 200.0);
        entity.add_snapshot(10.0, 150.0, 250.0);

        assert_eq!(query(&mut entity, 10.5), (150.0, 250.0));
    }

    #[test]
    fn test_out_of_order_arrival_is_reordered() {
        let mut entity = InterpolatedEntity::new();
        entity.add_snapshot(12.0, 300.0, 300.0);
        entity.add_snapshot(10.0, 100.0, 100.0);
        entity.add_snapshot(11.0, 200.0, 200.0);

        let (x, y) = query(&mut entity, 10.5);
        assert_approx_eq!(x, 150.0, 1e-3);
        assert_approx_eq!(y, 150.0, 1e-3);
    }

    #[test]
    fn test_buffer_evicts_oldest_past_capacity() {
        let mut entity = InterpolatedEntity::new();
        for i in 0..(POSITION_BUFFER_SIZE + 5) {
            entity.add_snapshot(i as f64, i as f32, 0.0);
        }
        assert_eq!(entity.snapshot_count(), POSITION_BUFFER_SIZE);
        // Oldest five are gone: a query at their time snaps to the new floor.
        assert_eq!(query(&mut entity, 0.0).0, 5.0);
    }

    #[test]
    fn test_manager_tracks_and_removes_entities() {
        let mut manager = EntityManager::new();
        manager.update_entity(2, 10.0, 100.0, 100.0, 3, PlayerColor::Red);
        manager.update_entity(2, 10.05, 110.0, 100.0, 4, PlayerColor::Red);
        assert_eq!(manager.len(), 1);

        let views = manager.interpolated_positions(10.05 + INTERPOLATION_DELAY);
        let view = views.get(&2).unwrap();
        assert_eq!(view.score, 4);
        assert_eq!(view.color, PlayerColor::Red);
        assert_approx_eq!(view.x, 110.0, 1e-3);

        manager.remove_entity(2);
        assert!(manager.is_empty());
    }
}
