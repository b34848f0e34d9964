//! Read-only ordered view of a scene's shots.

use std::collections::HashMap;

use shotline_models::{SceneId, Shot, ShotId};

/// Shots of one scene in position order.
///
/// Adjacency is by rank in that order, so gaps in `position` values do not
/// break a chain.
#[derive(Debug, Clone, Default)]
pub struct ShotIndex {
    order: Vec<ShotId>,
    ranks: HashMap<ShotId, usize>,
}

impl ShotIndex {
    /// Build from the shot sequence store's shots.
    ///
    /// Shots from other scenes are ignored; a repeated id keeps its first
    /// (lowest position) occurrence.
    pub fn new(scene_id: &SceneId, shots: impl IntoIterator<Item = Shot>) -> Self {
        let mut shots: Vec<Shot> = shots
            .into_iter()
            .filter(|s| &s.scene_id == scene_id)
            .collect();
        shots.sort_by_key(|s| s.position);

        let mut order = Vec::with_capacity(shots.len());
        let mut ranks = HashMap::with_capacity(shots.len());
        for shot in shots {
            if ranks.contains_key(&shot.id) {
                continue;
            }
            ranks.insert(shot.id.clone(), order.len());
            order.push(shot.id);
        }

        Self { order, ranks }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, shot: &ShotId) -> bool {
        self.ranks.contains_key(shot)
    }

    /// Rank of a shot in scene order.
    pub fn rank_of(&self, shot: &ShotId) -> Option<usize> {
        self.ranks.get(shot).copied()
    }

    pub fn shot_at(&self, rank: usize) -> Option<&ShotId> {
        self.order.get(rank)
    }

    /// Shot right after `shot`, if any.
    pub fn next(&self, shot: &ShotId) -> Option<&ShotId> {
        self.rank_of(shot).and_then(|r| self.shot_at(r + 1))
    }

    /// True if `b` immediately follows `a`.
    pub fn are_adjacent(&self, a: &ShotId, b: &ShotId) -> bool {
        match (self.rank_of(a), self.rank_of(b)) {
            (Some(ra), Some(rb)) => rb == ra + 1,
            _ => false,
        }
    }

    /// True if `shots` has at least two entries and each one immediately
    /// follows the previous.
    pub fn is_contiguous_run(&self, shots: &[ShotId]) -> bool {
        shots.len() >= 2 && shots.windows(2).all(|w| self.are_adjacent(&w[0], &w[1]))
    }

    pub fn shots(&self) -> &[ShotId] {
        &self.order
    }
}
