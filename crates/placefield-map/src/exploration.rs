//! Exploration Tracker.
//!
//! Remembers where the agent has already looked so that exploration is
//! biased away from redundant revisits.
//!
//! ## Model
//!
//! The tracker keeps a sparse list of *examined points*, each with a visit
//! count.  Any query point snaps to the closest examined point within
//! `proximity_threshold` (planar L1, the vertical axis is ignored); a query
//! with nothing in range becomes a new examined point with zero visits.
//!
//! A candidate is **not** worth examining when either
//!
//! 1. its snapped point lies within `min_separation` of the last examined
//!    point, or
//! 2. its snapped point has already been visited `max_visits` times.
//!
//! Non-finite queries are never registered: `can_examine` answers `false`,
//! `update` is ignored and `get_closest` hands the point back unchanged.
//!
//! # Example
//!
//! ```rust
//! use placefield_map::exploration::ExplorationTracker;
//! use placefield_map::ExplorationConfig;
//! use placefield_types::{ExamineTarget, Point3};
//!
//! let mut tracker = ExplorationTracker::new(ExplorationConfig::default());
//! tracker.update(&ExamineTarget::new("1", Point3::new(0.0, 0.0, 0.0)));
//!
//! // Too close to where we just looked.
//! assert!(!tracker.can_examine(&ExamineTarget::new("2", Point3::new(0.5, 0.0, 0.5))));
//! // Far enough away.
//! assert!(tracker.can_examine(&ExamineTarget::new("3", Point3::new(5.0, 0.0, 5.0))));
//! ```

use std::collections::HashSet;

use placefield_types::{ExamineTarget, Point3};
use tracing::{debug, info, warn};

use crate::config::ExplorationConfig;

/// A location the tracker has seen queried or visited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExaminedPoint {
    pub point: Point3,
    pub visit_count: u32,
}

/// Nearest-examined-point bookkeeping and the `can_examine` decision.
#[derive(Debug, Clone, Default)]
pub struct ExplorationTracker {
    config: ExplorationConfig,
    examined: Vec<ExaminedPoint>,
    examined_ids: HashSet<String>,
    /// Index into `examined` of the most recently visited point.
    last: Option<usize>,
}

impl ExplorationTracker {
    pub fn new(config: ExplorationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Index of the closest examined point strictly inside the proximity
    /// threshold, without registering anything.
    fn find_closest(&self, point: Point3) -> Option<usize> {
        let mut best = None;
        let mut dist = self.config.proximity_threshold;
        for (idx, e) in self.examined.iter().enumerate() {
            let d = e.point.planar_l1(&point);
            if d < dist {
                dist = d;
                best = Some(idx);
            }
        }
        best
    }

    fn closest_index(&mut self, point: Point3) -> usize {
        match self.find_closest(point) {
            Some(idx) => idx,
            None => {
                self.examined.push(ExaminedPoint {
                    point,
                    visit_count: 0,
                });
                self.examined.len() - 1
            }
        }
    }

    /// Closest examined point to `point`; registers `point` itself (with no
    /// visits) when nothing is close enough.
    pub fn get_closest(&mut self, point: Point3) -> Point3 {
        if !point.is_finite() {
            return point;
        }
        let idx = self.closest_index(point);
        self.examined[idx].point
    }

    /// Record a visit to `target`.
    pub fn update(&mut self, target: &ExamineTarget) {
        if !target.xyz.is_finite() {
            warn!(id = %target.id, point = ?target.xyz, "ignoring visit at non-finite point");
            return;
        }
        let idx = self.closest_index(target.xyz);
        self.last = Some(idx);
        self.examined_ids.insert(target.id.clone());
        self.examined[idx].visit_count += 1;
        debug!(
            id = %target.id,
            point = ?self.examined[idx].point,
            visits = self.examined[idx].visit_count,
            "examined"
        );
    }

    /// Decide whether `target` is worth examining.
    pub fn can_examine(&mut self, target: &ExamineTarget) -> bool {
        if !target.xyz.is_finite() {
            debug!(id = %target.id, point = ?target.xyz, "non-finite candidate");
            return false;
        }
        let idx = self.closest_index(target.xyz);
        let closest = self.examined[idx];

        let too_close = self.last.is_some_and(|last| {
            self.examined[last].point.planar_l1(&closest.point) < self.config.min_separation
        });
        let exhausted = closest.visit_count >= self.config.max_visits;
        let verdict = !(too_close || exhausted);

        debug!(
            id = %target.id,
            label = target.label.as_deref().unwrap_or(""),
            closest = ?closest.point,
            visits = closest.visit_count,
            too_close,
            verdict,
            "can_examine"
        );
        verdict
    }

    /// Forget every examined point, visited id and the last visit.
    pub fn clear_examined(&mut self) {
        info!(points = self.examined.len(), "clearing exploration state");
        self.examined.clear();
        self.examined_ids.clear();
        self.last = None;
    }

    /// Visits recorded at the examined point `point` snaps to (0 if none).
    pub fn visit_count(&self, point: Point3) -> u32 {
        self.find_closest(point)
            .map_or(0, |idx| self.examined[idx].visit_count)
    }

    pub fn last_examined(&self) -> Option<Point3> {
        self.last.map(|idx| self.examined[idx].point)
    }

    /// Whether an entity id has been reported through [`update`][Self::update].
    pub fn was_examined(&self, id: &str) -> bool {
        self.examined_ids.contains(id)
    }

    pub fn examined_points(&self) -> &[ExaminedPoint] {
        &self.examined
    }

    pub fn len(&self) -> usize {
        self.examined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examined.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ExplorationTracker {
        ExplorationTracker::new(ExplorationConfig::default())
    }

    fn target(id: &str, x: f32, z: f32) -> ExamineTarget {
        ExamineTarget::new(id, Point3::new(x, 0.0, z))
    }

    // ── get_closest ──────────────────────────────────────────────────────────

    #[test]
    fn get_closest_registers_new_point() {
        let mut t = tracker();
        let p = Point3::new(3.0, 1.0, 4.0);
        assert_eq!(t.get_closest(p), p);
        assert_eq!(t.len(), 1);
        assert_eq!(t.examined_points()[0].visit_count, 0);
    }

    #[test]
    fn get_closest_snaps_within_threshold() {
        let mut t = tracker();
        let a = Point3::new(0.0, 0.0, 0.0);
        t.get_closest(a);
        // L1 = 1.4 < 1.5; height ignored.
        assert_eq!(t.get_closest(Point3::new(0.7, 9.0, 0.7)), a);
        assert_eq!(t.len(), 1);
        // L1 = 1.5 is not strictly below the threshold.
        let b = Point3::new(1.0, 0.0, 0.5);
        assert_eq!(t.get_closest(b), b);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn get_closest_prefers_nearest() {
        let mut t = tracker();
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        t.get_closest(a);
        t.get_closest(b);
        assert_eq!(t.get_closest(Point3::new(1.2, 0.0, 0.0)), b);
        assert_eq!(t.get_closest(Point3::new(0.8, 0.0, 0.0)), a);
    }

    // ── update ───────────────────────────────────────────────────────────────

    #[test]
    fn update_counts_visits_and_ids() {
        let mut t = tracker();
        t.update(&target("e1", 0.0, 0.0));
        t.update(&target("e2", 0.3, 0.3));
        assert_eq!(t.len(), 1);
        assert_eq!(t.visit_count(Point3::new(0.0, 0.0, 0.0)), 2);
        assert_eq!(t.last_examined(), Some(Point3::new(0.0, 0.0, 0.0)));
        assert!(t.was_examined("e1"));
        assert!(t.was_examined("e2"));
        assert!(!t.was_examined("e3"));
    }

    // ── can_examine ──────────────────────────────────────────────────────────

    #[test]
    fn fresh_tracker_allows_everything() {
        let mut t = tracker();
        assert!(t.can_examine(&target("e1", 0.0, 0.0)));
        assert!(t.can_examine(&target("e1", 0.0, 0.0)));
    }

    #[test]
    fn too_close_to_last_examined() {
        let mut t = tracker();
        t.update(&target("1", 0.0, 0.0));
        assert!(!t.can_examine(&target("2", 0.5, 0.5)));
    }

    #[test]
    fn distant_points_are_allowed() {
        let mut t = tracker();
        t.update(&target("1", 0.0, 0.0));
        // Far enough to become its own examined point, close to nothing else.
        assert!(t.can_examine(&target("2", 3.0, 0.0)));
        // Snaps to (3, 0), which is 3 units from the last visit.
        assert!(t.can_examine(&target("3", 3.4, 0.0)));
    }

    #[test]
    fn revisited_twice_is_exhausted_even_when_far() {
        let mut t = tracker();
        t.update(&target("a", 0.0, 0.0));
        t.update(&target("a", 0.0, 0.0));
        t.update(&target("b", 10.0, 10.0));
        assert_eq!(t.last_examined(), Some(Point3::new(10.0, 0.0, 10.0)));
        assert!(!t.can_examine(&target("a", 0.0, 0.0)));
    }

    #[test]
    fn visited_once_and_far_from_last_is_allowed() {
        let mut t = tracker();
        t.update(&target("a", 0.0, 0.0));
        t.update(&target("b", 10.0, 10.0));
        assert!(t.can_examine(&target("a", 0.0, 0.0)));
    }

    #[test]
    fn custom_thresholds() {
        let mut t = ExplorationTracker::new(ExplorationConfig {
            proximity_threshold: 0.5,
            min_separation: 0.25,
            max_visits: 1,
        });
        t.update(&target("a", 0.0, 0.0));
        // 0.6 away: not snapped, own point, 0.6 ≥ 0.25 from last.
        assert!(t.can_examine(&target("b", 0.6, 0.0)));
        t.update(&target("c", 5.0, 5.0));
        assert!(!t.can_examine(&target("a", 0.0, 0.0)));
    }

    #[test]
    fn non_finite_queries_are_not_registered() {
        let mut t = tracker();
        let nan = Point3::new(f32::NAN, 0.0, 0.0);
        let inf = Point3::new(0.0, 0.0, f32::INFINITY);

        for _ in 0..5 {
            assert!(!t.can_examine(&ExamineTarget::new("n", nan)));
            assert!(!t.can_examine(&ExamineTarget::new("i", inf)));
        }
        assert!(t.get_closest(nan).x.is_nan());
        assert_eq!(t.get_closest(inf), inf);
        t.update(&ExamineTarget::new("n", nan));

        assert!(t.is_empty());
        assert_eq!(t.last_examined(), None);
        assert!(!t.was_examined("n"));
    }

    // ── clear_examined ───────────────────────────────────────────────────────

    #[test]
    fn clear_resets_everything() {
        let mut t = tracker();
        t.update(&target("1", 0.0, 0.0));
        t.update(&target("1", 0.0, 0.0));
        t.clear_examined();
        assert!(t.is_empty());
        assert_eq!(t.last_examined(), None);
        assert!(!t.was_examined("1"));
        assert!(t.can_examine(&target("1", 0.0, 0.0)));
    }
}
