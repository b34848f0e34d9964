//! Connection derivation.
//!
//! Computes the live connection for each shot from the approved and proposed
//! partitions. Declined groups never contribute. The result depends only on
//! the inputs, so it is recomputed on every read.

use std::collections::BTreeMap;

use shotline_models::{Connection, ConnectionStatus, ContinuityGroup};

use crate::shot_index::ShotIndex;

/// Derive at most one connection per source shot, ordered by source rank.
///
/// Approved groups are applied first and are never overwritten. A proposed
/// edge only fills a source shot that has no connection yet. Edges whose
/// shots are not adjacent in `index` are skipped.
pub fn derive_connections<'a>(
    index: &ShotIndex,
    approved: impl IntoIterator<Item = &'a ContinuityGroup>,
    proposed: impl IntoIterator<Item = &'a ContinuityGroup>,
) -> Vec<Connection> {
    let mut by_source: BTreeMap<usize, Connection> = BTreeMap::new();

    let layers = [
        (ConnectionStatus::Approved, approved.into_iter().collect::<Vec<_>>()),
        (ConnectionStatus::Proposed, proposed.into_iter().collect::<Vec<_>>()),
    ];

    for (status, groups) in layers {
        for group in groups {
            for (a, b) in group.edges() {
                if !index.are_adjacent(a, b) {
                    continue;
                }
                let Some(rank) = index.rank_of(a) else {
                    continue;
                };
                by_source.entry(rank).or_insert_with(|| Connection {
                    shot_a: a.clone(),
                    shot_b: b.clone(),
                    status,
                    group_id: group.id.clone(),
                });
            }
        }
    }

    by_source.into_values().collect()
}
