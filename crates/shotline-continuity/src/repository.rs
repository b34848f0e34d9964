//! Per-scene group storage.
//!
//! Groups live in an arena keyed by id. A per-status list of ids keeps each
//! partition's order. Edits never touch the arena directly: they work on a
//! [`Transaction`] that owns a copy of all three partitions, and
//! [`GroupRepository::commit`] swaps the whole scene in one step.

use std::collections::HashMap;

use shotline_models::{ContinuityGroup, GroupId, GroupStatus, SceneId, ShotId};

/// One value per group status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitions<T> {
    pub approved: T,
    pub proposed: T,
    pub declined: T,
}

impl<T> Partitions<T> {
    pub fn get(&self, status: GroupStatus) -> &T {
        match status {
            GroupStatus::Approved => &self.approved,
            GroupStatus::Proposed => &self.proposed,
            GroupStatus::Declined => &self.declined,
        }
    }

    pub fn get_mut(&mut self, status: GroupStatus) -> &mut T {
        match status {
            GroupStatus::Approved => &mut self.approved,
            GroupStatus::Proposed => &mut self.proposed,
            GroupStatus::Declined => &mut self.declined,
        }
    }
}

/// Arena plus partition index for a single scene.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    scene_id: SceneId,
    arena: HashMap<GroupId, ContinuityGroup>,
    index: Partitions<Vec<GroupId>>,
}

impl GroupRepository {
    pub fn new(scene_id: SceneId) -> Self {
        Self {
            scene_id,
            arena: HashMap::new(),
            index: Partitions::default(),
        }
    }

    pub fn scene_id(&self) -> &SceneId {
        &self.scene_id
    }

    pub fn get(&self, id: &GroupId) -> Option<&ContinuityGroup> {
        self.arena.get(id)
    }

    /// Groups of one partition, in partition order.
    pub fn partition(&self, status: GroupStatus) -> impl Iterator<Item = &ContinuityGroup> + '_ {
        self.index
            .get(status)
            .iter()
            .filter_map(|id| self.arena.get(id))
    }

    pub fn count(&self, status: GroupStatus) -> usize {
        self.index.get(status).len()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Approved, then proposed, then declined.
    pub fn merged(&self) -> Vec<ContinuityGroup> {
        GroupStatus::ALL
            .iter()
            .flat_map(|status| self.partition(*status))
            .cloned()
            .collect()
    }

    /// Start an edit over an owned copy of the three partitions.
    pub fn begin(&self) -> Transaction {
        let partitions = Partitions {
            approved: self.partition(GroupStatus::Approved).cloned().collect(),
            proposed: self.partition(GroupStatus::Proposed).cloned().collect(),
            declined: self.partition(GroupStatus::Declined).cloned().collect(),
        };
        let next_number = self
            .arena
            .values()
            .map(|g| g.group_number)
            .max()
            .unwrap_or(0)
            + 1;

        Transaction {
            scene_id: self.scene_id.clone(),
            partitions,
            next_number,
        }
    }

    /// Replace all three partitions with the transaction's contents.
    pub fn commit(&mut self, tx: Transaction) {
        let mut arena = HashMap::new();
        let mut index: Partitions<Vec<GroupId>> = Partitions::default();

        for status in GroupStatus::ALL {
            for mut group in tx.partitions.get(status).iter().cloned() {
                group.status = status;
                index.get_mut(status).push(group.id.clone());
                arena.insert(group.id.clone(), group);
            }
        }

        self.arena = arena;
        self.index = index;
    }

    /// Replace the scene's groups wholesale, routing each by its status.
    pub fn replace_all(&mut self, groups: impl IntoIterator<Item = ContinuityGroup>) {
        let mut tx = Transaction {
            scene_id: self.scene_id.clone(),
            partitions: Partitions::default(),
            next_number: 1,
        };
        for group in groups {
            tx.push(group);
        }
        self.commit(tx);
    }
}

/// An owned, uncommitted copy of a scene's partitions.
#[derive(Debug, Clone)]
pub struct Transaction {
    scene_id: SceneId,
    partitions: Partitions<Vec<ContinuityGroup>>,
    next_number: u32,
}

impl Transaction {
    pub fn scene_id(&self) -> &SceneId {
        &self.scene_id
    }

    pub fn partition(&self, status: GroupStatus) -> &[ContinuityGroup] {
        self.partitions.get(status)
    }

    pub fn partition_mut(&mut self, status: GroupStatus) -> &mut Vec<ContinuityGroup> {
        self.partitions.get_mut(status)
    }

    /// Allocate the next display ordinal for a new group.
    pub fn next_group_number(&mut self) -> u32 {
        let n = self.next_number;
        self.next_number += 1;
        n
    }

    /// Locate a group by id within the given partitions, scanned in order.
    pub fn find(&self, id: &GroupId, statuses: &[GroupStatus]) -> Option<(GroupStatus, usize)> {
        statuses.iter().find_map(|status| {
            self.partition(*status)
                .iter()
                .position(|g| &g.id == id)
                .map(|i| (*status, i))
        })
    }

    /// Locate the first group whose chain contains `a -> b`.
    pub fn find_edge(
        &self,
        a: &ShotId,
        b: &ShotId,
        statuses: &[GroupStatus],
    ) -> Option<(GroupStatus, usize)> {
        statuses.iter().find_map(|status| {
            self.partition(*status)
                .iter()
                .position(|g| g.contains_edge(a, b))
                .map(|i| (*status, i))
        })
    }

    pub fn remove(&mut self, status: GroupStatus, index: usize) -> ContinuityGroup {
        self.partitions.get_mut(status).remove(index)
    }

    /// Append a group to the partition named by its status.
    pub fn push(&mut self, group: ContinuityGroup) {
        self.partitions.get_mut(group.status).push(group);
    }

    /// Append unless the partition already holds a group with the same run.
    ///
    /// Returns false when the group was skipped.
    pub fn push_unique(&mut self, group: ContinuityGroup) -> bool {
        if self.contains_run(group.status, &group.shot_ids) {
            return false;
        }
        self.push(group);
        true
    }

    pub fn contains_run(&self, status: GroupStatus, shots: &[ShotId]) -> bool {
        self.partition(status).iter().any(|g| g.shot_ids == shots)
    }

    /// Replace one whole partition.
    pub fn replace_partition(&mut self, status: GroupStatus, groups: Vec<ContinuityGroup>) {
        *self.partitions.get_mut(status) = groups;
    }

    pub fn group_count(&self) -> usize {
        GroupStatus::ALL
            .iter()
            .map(|s| self.partition(*s).len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(shots: &[&str], status: GroupStatus) -> ContinuityGroup {
        ContinuityGroup::new("sc", 0, shots.iter().map(|s| ShotId::from(*s)).collect(), status)
    }

    #[test]
    fn test_commit_replaces_all_partitions() {
        let mut repo = GroupRepository::new("sc".into());
        repo.replace_all(vec![
            group(&["a", "b"], GroupStatus::Approved),
            group(&["b", "c"], GroupStatus::Proposed),
        ]);
        assert_eq!(repo.count(GroupStatus::Approved), 1);
        assert_eq!(repo.count(GroupStatus::Proposed), 1);

        let mut tx = repo.begin();
        let moved = tx.remove(GroupStatus::Proposed, 0);
        tx.push(ContinuityGroup {
            status: GroupStatus::Declined,
            ..moved
        });
        repo.commit(tx);

        assert_eq!(repo.count(GroupStatus::Proposed), 0);
        assert_eq!(repo.count(GroupStatus::Declined), 1);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_uncommitted_transaction_leaves_repository_untouched() {
        let mut repo = GroupRepository::new("sc".into());
        repo.replace_all(vec![group(&["a", "b"], GroupStatus::Proposed)]);

        let mut tx = repo.begin();
        tx.remove(GroupStatus::Proposed, 0);
        drop(tx);

        assert_eq!(repo.count(GroupStatus::Proposed), 1);
    }

    #[test]
    fn test_merged_order_is_approved_proposed_declined() {
        let mut repo = GroupRepository::new("sc".into());
        repo.replace_all(vec![
            group(&["c", "d"], GroupStatus::Declined),
            group(&["b", "c"], GroupStatus::Proposed),
            group(&["a", "b"], GroupStatus::Approved),
        ]);
        let statuses: Vec<_> = repo.merged().iter().map(|g| g.status).collect();
        assert_eq!(
            statuses,
            vec![GroupStatus::Approved, GroupStatus::Proposed, GroupStatus::Declined]
        );
    }

    #[test]
    fn test_next_group_number_follows_highest() {
        let mut repo = GroupRepository::new("sc".into());
        let mut g = group(&["a", "b"], GroupStatus::Proposed);
        g.group_number = 4;
        repo.replace_all(vec![g]);

        let mut tx = repo.begin();
        assert_eq!(tx.next_group_number(), 5);
        assert_eq!(tx.next_group_number(), 6);
    }

    #[test]
    fn test_find_edge_scans_in_given_order() {
        let mut repo = GroupRepository::new("sc".into());
        repo.replace_all(vec![
            group(&["a", "b", "c"], GroupStatus::Proposed),
            group(&["a", "b"], GroupStatus::Approved),
        ]);
        let tx = repo.begin();
        let a = ShotId::from("a");
        let b = ShotId::from("b");
        assert_eq!(
            tx.find_edge(&a, &b, &[GroupStatus::Approved, GroupStatus::Proposed]),
            Some((GroupStatus::Approved, 0))
        );
        assert_eq!(
            tx.find_edge(&a, &b, &[GroupStatus::Proposed]),
            Some((GroupStatus::Proposed, 0))
        );
        assert_eq!(tx.find_edge(&b, &a, &GroupStatus::ALL), None);
    }

    #[test]
    fn test_push_unique_skips_identical_run() {
        let repo = GroupRepository::new("sc".into());
        let mut tx = repo.begin();
        assert!(tx.push_unique(group(&["a", "b"], GroupStatus::Proposed)));
        assert!(!tx.push_unique(group(&["a", "b"], GroupStatus::Proposed)));
        assert!(tx.push_unique(group(&["a", "b"], GroupStatus::Approved)));
        assert_eq!(tx.group_count(), 2);
    }
}
