//! Multi-device position merge
//!
//! Same device: the higher sync version wins. Different devices: the position
//! further into the book wins and the disagreement is reported. Equal progress
//! falls back to the most recent write.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// A merge decision that discarded a differing value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    /// Book the positions belong to
    pub book_id: String,
    /// Field that disagreed
    pub field: String,
    /// Local value, formatted for display
    pub local_value: String,
    /// Remote value, formatted for display
    pub remote_value: String,
    /// Which side won and why
    pub resolution: String,
}

/// Merge one book's local and remote positions
pub fn merge_position(
    book_id: &str,
    local: &Position,
    remote: &Position,
    local_device_id: &str,
) -> (Position, Option<ConflictInfo>) {
    let same_device = local.device_id.as_deref() == Some(local_device_id)
        && remote.device_id.as_deref() == Some(local_device_id);

    if same_device {
        return if local.has_higher_version(remote) {
            log::debug!("position for {}: same device, local version higher", book_id);
            (local.clone(), None)
        } else {
            log::debug!("position for {}: same device, remote version higher", book_id);
            (remote.clone(), None)
        };
    }

    let conflict = |resolution: &str| ConflictInfo {
        book_id: book_id.to_string(),
        field: "progress".to_string(),
        local_value: format!("{:.1}%", local.total_progress * 100.0),
        remote_value: format!("{:.1}%", remote.total_progress * 100.0),
        resolution: resolution.to_string(),
    };

    if remote.is_further_than(local) {
        log::debug!(
            "position for {}: remote further ({} > {})",
            book_id,
            remote.total_progress,
            local.total_progress
        );
        (remote.clone(), Some(conflict("remote (further)")))
    } else if local.is_further_than(remote) {
        log::debug!(
            "position for {}: local further ({} > {})",
            book_id,
            local.total_progress,
            remote.total_progress
        );
        (local.clone(), Some(conflict("local (further)")))
    } else if remote.is_newer_than(local) {
        log::debug!("position for {}: same progress, remote newer", book_id);
        (remote.clone(), None)
    } else {
        (local.clone(), None)
    }
}

/// Merge per-book position maps, reporting every progress conflict
pub fn merge_positions(
    local: BTreeMap<String, Position>,
    remote: BTreeMap<String, Position>,
    local_device_id: &str,
) -> (BTreeMap<String, Position>, Vec<ConflictInfo>) {
    let books: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();
    let mut merged = BTreeMap::new();
    let mut conflicts = Vec::new();

    for book_id in books {
        let chosen = match (local.get(book_id), remote.get(book_id)) {
            (Some(l), Some(r)) => {
                let (winner, conflict) = merge_position(book_id, l, r, local_device_id);
                conflicts.extend(conflict);
                winner
            }
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (None, None) => continue,
        };
        merged.insert(book_id.clone(), chosen);
    }

    (merged, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(device: &str, progress: f64, version: u64, modified: i64) -> Position {
        Position {
            total_progress: progress,
            sync_version: Some(version),
            last_modified: Some(modified),
            device_id: Some(device.to_string()),
            ..Position::default()
        }
    }

    #[test]
    fn test_same_device_prefers_higher_version() {
        let local = position("phone", 0.8, 3, 100);
        let remote = position("phone", 0.2, 5, 50);
        let (winner, conflict) = merge_position("b", &local, &remote, "phone");
        assert_eq!(winner.sync_version, Some(5));
        assert!(conflict.is_none());
    }

    #[test]
    fn test_other_device_prefers_further_and_reports() {
        let local = position("phone", 0.3, 9, 100);
        let remote = position("tablet", 0.55, 1, 10);
        let (winner, conflict) = merge_position("b", &local, &remote, "phone");
        assert_eq!(winner.device_id.as_deref(), Some("tablet"));
        let conflict = conflict.unwrap();
        assert_eq!(conflict.local_value, "30.0%");
        assert_eq!(conflict.remote_value, "55.0%");
        assert_eq!(conflict.resolution, "remote (further)");
    }

    #[test]
    fn test_equal_progress_prefers_newer() {
        let local = position("phone", 0.5, 1, 100);
        let remote = position("tablet", 0.5, 1, 200);
        let (winner, conflict) = merge_position("b", &local, &remote, "phone");
        assert_eq!(winner.last_modified, Some(200));
        assert!(conflict.is_none());
    }

    #[test]
    fn test_merge_maps_keeps_one_sided_entries() {
        let mut local = BTreeMap::new();
        local.insert("a".to_string(), position("phone", 0.1, 1, 1));
        local.insert("b".to_string(), position("phone", 0.9, 1, 1));
        let mut remote = BTreeMap::new();
        remote.insert("b".to_string(), position("tablet", 0.2, 1, 1));
        remote.insert("c".to_string(), position("tablet", 0.3, 1, 1));

        let (merged, conflicts) = merge_positions(local, remote, "phone");
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["b"].total_progress, 0.9);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].resolution, "local (further)");
    }
}
