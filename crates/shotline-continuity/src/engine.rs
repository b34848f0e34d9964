//! Edit engine.
//!
//! Every operation here works on a [`Transaction`] and a scene's
//! [`ShotIndex`]. Operations validate first and then edit the transaction;
//! an `Err` means the caller drops the transaction and the scene is
//! unchanged. After any `Ok`, each group in the transaction is a contiguous
//! run of at least two shots, and no edge is approved in two groups.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use shotline_models::{
    ContinuityGroup, ContinuityGroupDraft, GroupId, GroupStatus, LegacyShot, ShotId,
};

use crate::error::{ContinuityError, ContinuityResult};
use crate::repository::Transaction;
use crate::shot_index::ShotIndex;

/// Whether an operation changed the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    Applied,
    Unchanged,
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

/// How legacy `isLinkedToPrevious` flags are migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationMode {
    /// Flags come from already committed data; groups are approved
    Committed,
    /// Flags come from a fresh toggle; groups are proposed
    Regenerated,
}

impl MigrationMode {
    pub fn status(&self) -> GroupStatus {
        match self {
            MigrationMode::Committed => GroupStatus::Approved,
            MigrationMode::Regenerated => GroupStatus::Proposed,
        }
    }
}

/// Replacement fields for [`edit_group`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEdit {
    pub id: GroupId,

    /// Partition the group is expected in; never changed by an edit
    pub status: GroupStatus,

    pub shot_ids: Vec<ShotId>,

    #[serde(default)]
    pub transition_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub edited_by: Option<String>,
}

impl From<&ContinuityGroup> for GroupEdit {
    fn from(group: &ContinuityGroup) -> Self {
        Self {
            id: group.id.clone(),
            status: group.status,
            shot_ids: group.shot_ids.clone(),
            transition_type: group.transition_type.clone(),
            description: group.description.clone(),
            edited_by: group.edited_by.clone(),
        }
    }
}

// =============================================================================
// Whole-group transitions
// =============================================================================

/// Move a proposed or declined group into the approved partition.
///
/// Approved groups that share an edge with it are folded in, so the edge
/// stays approved in exactly one group.
pub fn approve_group(tx: &mut Transaction, group_id: &GroupId) -> ContinuityResult<EditOutcome> {
    let (from, idx) = tx
        .find(group_id, &[GroupStatus::Proposed, GroupStatus::Declined])
        .ok_or_else(|| ContinuityError::group_not_found(tx.scene_id(), group_id.as_str()))?;

    let mut group = tx.remove(from, idx);
    group.status = GroupStatus::Approved;
    group.approved_at = Some(Utc::now());
    fold_overlapping_approved(tx, &mut group);

    debug!(
        scene_id = %tx.scene_id(),
        group_id = %group.id,
        from = from.as_str(),
        "Approved group"
    );
    tx.push(group);
    Ok(EditOutcome::Applied)
}

/// Move a proposed or approved group into the declined partition.
pub fn decline_group(tx: &mut Transaction, group_id: &GroupId) -> ContinuityResult<EditOutcome> {
    let (from, idx) = tx
        .find(group_id, &[GroupStatus::Proposed, GroupStatus::Approved])
        .ok_or_else(|| ContinuityError::group_not_found(tx.scene_id(), group_id.as_str()))?;

    let mut group = tx.remove(from, idx);
    group.status = GroupStatus::Declined;
    group.approved_at = None;

    debug!(
        scene_id = %tx.scene_id(),
        group_id = %group.id,
        from = from.as_str(),
        "Declined group"
    );
    tx.push(group);
    Ok(EditOutcome::Applied)
}

/// Replace a group's shots, transition and description in place.
pub fn edit_group(
    tx: &mut Transaction,
    index: &ShotIndex,
    edit: GroupEdit,
) -> ContinuityResult<EditOutcome> {
    let (status, idx) = tx
        .find(&edit.id, &[edit.status])
        .ok_or_else(|| ContinuityError::group_not_found(tx.scene_id(), edit.id.as_str()))?;

    if !index.is_contiguous_run(&edit.shot_ids) {
        return Err(ContinuityError::invalid_group(format!(
            "group {} must list at least two consecutive shots of scene {}",
            edit.id,
            tx.scene_id()
        )));
    }

    if status == GroupStatus::Approved {
        let probe = ContinuityGroup {
            shot_ids: edit.shot_ids.clone(),
            ..tx.partition(status)[idx].clone()
        };
        let clash = tx
            .partition(GroupStatus::Approved)
            .iter()
            .enumerate()
            .any(|(i, other)| i != idx && probe.shares_edge_with(other));
        if clash {
            return Err(ContinuityError::invalid_group(format!(
                "group {} would approve a connection already approved in another group",
                edit.id
            )));
        }
    }

    let group = &mut tx.partition_mut(status)[idx];
    group.shot_ids = edit.shot_ids;
    group.transition_type = edit.transition_type;
    group.description = edit.description;
    group.edited_by = edit.edited_by;
    group.edited_at = Some(Utc::now());
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Per-connection edits
// =============================================================================

/// Approve the single connection `a -> b`.
///
/// The containing group is split so that every other edge keeps its own
/// state; approved edges are consolidated into one chain where possible.
pub fn approve_connection(
    tx: &mut Transaction,
    index: &ShotIndex,
    a: &ShotId,
    b: &ShotId,
) -> ContinuityResult<EditOutcome> {
    ensure_adjacent(tx, index, a, b)?;

    let (status, g_idx) = tx
        .find_edge(a, b, &[GroupStatus::Approved, GroupStatus::Proposed, GroupStatus::Declined])
        .ok_or_else(|| ContinuityError::group_not_found(tx.scene_id(), format!("{} -> {}", a, b)))?;

    if status == GroupStatus::Approved {
        return Ok(EditOutcome::Unchanged);
    }

    let original = tx.partition(status)[g_idx].clone();
    if original.shot_ids.len() == 2 {
        return approve_group(tx, &original.id);
    }

    let Some(b_pos) = original.position_of(b) else {
        return Err(ContinuityError::group_not_found(tx.scene_id(), format!("{} -> {}", a, b)));
    };
    let now = Utc::now();

    let extend_idx = tx
        .partition(GroupStatus::Approved)
        .iter()
        .position(|g| g.last_shot() == Some(a));

    // `original` is never approved here, so it is never the extended chain.
    tx.remove(status, g_idx);

    match extend_idx {
        Some(ai) => {
            let chain = &mut tx.partition_mut(GroupStatus::Approved)[ai];
            if !chain.shot_ids.contains(b) {
                chain.shot_ids.push(b.clone());
                chain.edited_at = Some(now);
            }
            let chain_first = chain.first_shot().cloned();

            // Edges of the original ahead of the chain's start are not
            // covered by the chain; keep them where they were.
            if let Some(k) = chain_first.and_then(|s| original.position_of(&s)) {
                if k > 0 {
                    let number = original.group_number;
                    tx.push_unique(original.split_off(original.shot_ids[..=k].to_vec(), number));
                }
            }
        }
        None => {
            let number = tx.next_group_number();
            let mut approved = original.split_off(original.shot_ids[..=b_pos].to_vec(), number);
            approved.status = GroupStatus::Approved;
            approved.approved_at = Some(now);
            fold_overlapping_approved(tx, &mut approved);
            tx.push(approved);
        }
    }

    if b_pos + 1 < original.shot_ids.len() {
        let number = tx.next_group_number();
        let mut remainder = original.split_off(original.shot_ids[b_pos..].to_vec(), number);
        remainder.status = GroupStatus::Proposed;
        remainder.approved_at = None;
        tx.push_unique(remainder);
    }

    debug!(
        scene_id = %tx.scene_id(),
        group_id = %original.id,
        shot_a = %a,
        shot_b = %b,
        extended = extend_idx.is_some(),
        "Approved connection"
    );
    Ok(EditOutcome::Applied)
}

/// Decline the single connection `a -> b`.
///
/// The containing group is cut at the edge. The leading part keeps the
/// group's status; the trailing part is re-proposed. Parts shorter than two
/// shots are dropped.
pub fn decline_connection(
    tx: &mut Transaction,
    index: &ShotIndex,
    a: &ShotId,
    b: &ShotId,
) -> ContinuityResult<EditOutcome> {
    ensure_adjacent(tx, index, a, b)?;

    let (status, g_idx) = tx
        .find_edge(a, b, &[GroupStatus::Approved, GroupStatus::Proposed])
        .ok_or_else(|| ContinuityError::group_not_found(tx.scene_id(), format!("{} -> {}", a, b)))?;

    let original = tx.partition(status)[g_idx].clone();
    if original.shot_ids.len() == 2 {
        return decline_group(tx, &original.id);
    }

    let Some(a_pos) = original.position_of(a) else {
        return Err(ContinuityError::group_not_found(tx.scene_id(), format!("{} -> {}", a, b)));
    };

    tx.remove(status, g_idx);

    let before = original.shot_ids[..=a_pos].to_vec();
    let after = original.shot_ids[a_pos + 1..].to_vec();

    if before.len() >= 2 {
        tx.push_unique(original.split_off(before, original.group_number));
    }
    if after.len() >= 2 {
        let number = tx.next_group_number();
        let mut trailing = original.split_off(after, number);
        trailing.status = GroupStatus::Proposed;
        trailing.approved_at = None;
        tx.push_unique(trailing);
    }

    debug!(
        scene_id = %tx.scene_id(),
        group_id = %original.id,
        shot_a = %a,
        shot_b = %b,
        "Declined connection"
    );
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Seeding
// =============================================================================

/// Turn legacy per-shot link flags into one two-shot group per linked pair.
///
/// The partition selected by `mode` is replaced; the others are kept. A pair
/// whose shots are not adjacent in `index` (a repeated id, say) is skipped.
pub fn migrate_legacy_links(
    tx: &mut Transaction,
    index: &ShotIndex,
    shots: &[LegacyShot],
    mode: MigrationMode,
) -> ContinuityResult<EditOutcome> {
    let mut ordered: Vec<&LegacyShot> = shots
        .iter()
        .filter(|s| &s.scene_id == tx.scene_id())
        .collect();
    ordered.sort_by_key(|s| s.position);

    let status = mode.status();
    let mut groups = Vec::new();
    let mut skipped = 0usize;
    for pair in ordered.windows(2) {
        if !pair[1].is_linked_to_previous {
            continue;
        }
        if !index.are_adjacent(&pair[0].id, &pair[1].id) {
            skipped += 1;
            continue;
        }
        let number = tx.next_group_number();
        groups.push(ContinuityGroup::new(
            tx.scene_id().clone(),
            number,
            vec![pair[0].id.clone(), pair[1].id.clone()],
            status,
        ));
    }

    if skipped > 0 {
        warn!(
            scene_id = %tx.scene_id(),
            skipped,
            "Skipped legacy links between non-adjacent shots"
        );
    }
    debug!(
        scene_id = %tx.scene_id(),
        groups = groups.len(),
        status = status.as_str(),
        "Migrated legacy links"
    );
    tx.replace_partition(status, groups);
    Ok(EditOutcome::Applied)
}

/// Replace the proposed partition with AI breakdown drafts.
///
/// Drafts that are not a contiguous run of at least two shots are dropped.
pub fn apply_breakdown(
    tx: &mut Transaction,
    index: &ShotIndex,
    drafts: Vec<ContinuityGroupDraft>,
) -> ContinuityResult<EditOutcome> {
    let mut groups: Vec<ContinuityGroup> = Vec::with_capacity(drafts.len());
    let mut dropped = 0usize;

    for draft in drafts {
        if !index.is_contiguous_run(&draft.shot_ids) {
            dropped += 1;
            continue;
        }
        if groups.iter().any(|g| g.shot_ids == draft.shot_ids) {
            continue;
        }
        let number = match draft.group_number {
            0 => tx.next_group_number(),
            n => n,
        };
        groups.push(draft.into_group(tx.scene_id().clone(), number));
    }

    if dropped > 0 {
        warn!(
            scene_id = %tx.scene_id(),
            dropped,
            "Dropped breakdown drafts that are not contiguous shot runs"
        );
    }

    tx.replace_partition(GroupStatus::Proposed, groups);
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Shot invalidation
// =============================================================================

/// Re-validate every group against a new shot index.
///
/// Shots missing from the index are removed and chains are cut wherever two
/// members are no longer adjacent. The first surviving run keeps the group's
/// id; further runs become new groups with the same status; runs shorter than
/// two shots are dropped. Returns the number of groups that changed.
pub fn revalidate(tx: &mut Transaction, index: &ShotIndex) -> usize {
    let mut changed = 0usize;

    for status in GroupStatus::ALL {
        let groups = std::mem::take(tx.partition_mut(status));
        let mut kept = Vec::with_capacity(groups.len());

        for group in groups {
            let runs = contiguous_runs(index, &group.shot_ids);
            if runs.len() == 1 && runs[0] == group.shot_ids {
                kept.push(group);
                continue;
            }

            changed += 1;
            let mut runs = runs.into_iter();
            if let Some(first) = runs.next() {
                let mut head = group.clone();
                head.shot_ids = first;
                head.edited_at = Some(Utc::now());
                kept.push(head);
            }
            for run in runs {
                let number = tx.next_group_number();
                kept.push(group.split_off(run, number));
            }
        }

        tx.replace_partition(status, kept);
    }

    changed
}

/// Maximal runs of at least two members that are adjacent in `index`.
fn contiguous_runs(index: &ShotIndex, shots: &[ShotId]) -> Vec<Vec<ShotId>> {
    let mut runs = Vec::new();
    let mut current: Vec<ShotId> = Vec::new();

    for shot in shots {
        if !index.contains(shot) {
            flush_run(&mut runs, &mut current);
            continue;
        }
        if let Some(prev) = current.last() {
            if !index.are_adjacent(prev, shot) {
                flush_run(&mut runs, &mut current);
            }
        }
        current.push(shot.clone());
    }
    flush_run(&mut runs, &mut current);
    runs
}

fn flush_run(runs: &mut Vec<Vec<ShotId>>, current: &mut Vec<ShotId>) {
    let run = std::mem::take(current);
    if run.len() >= 2 {
        runs.push(run);
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn ensure_adjacent(
    tx: &Transaction,
    index: &ShotIndex,
    a: &ShotId,
    b: &ShotId,
) -> ContinuityResult<()> {
    if index.are_adjacent(a, b) {
        Ok(())
    } else {
        Err(ContinuityError::InvalidConnection {
            scene_id: tx.scene_id().clone(),
            shot_a: a.clone(),
            shot_b: b.clone(),
        })
    }
}

/// Absorb every approved group in `tx` that shares an edge with `group`.
fn fold_overlapping_approved(tx: &mut Transaction, group: &mut ContinuityGroup) {
    while let Some(i) = tx
        .partition(GroupStatus::Approved)
        .iter()
        .position(|other| other.id != group.id && group.shares_edge_with(other))
    {
        let other = tx.remove(GroupStatus::Approved, i);
        group.shot_ids = union_runs(&group.shot_ids, &other.shot_ids);
        if group.transition_type.is_none() {
            group.transition_type = other.transition_type;
        }
        if group.description.is_none() {
            group.description = other.description;
        }
    }
}

/// Union of two overlapping runs of the same shot order.
fn union_runs(base: &[ShotId], other: &[ShotId]) -> Vec<ShotId> {
    let mut out = Vec::with_capacity(base.len() + other.len());
    if let Some(i) = base.first().and_then(|f| other.iter().position(|s| s == f)) {
        out.extend_from_slice(&other[..i]);
    }
    out.extend_from_slice(base);
    if let Some(i) = base.last().and_then(|l| other.iter().position(|s| s == l)) {
        out.extend_from_slice(&other[i + 1..]);
    }
    out
}
