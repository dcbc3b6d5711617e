//! Applying a diff through the inventory and acquisition collaborators.

use tracing::{debug, info, warn};

use crate::acquisition::{AcquisitionError, AcquisitionRegistry};
use crate::collection::CollectionSpec;
use crate::inventory::{InventoryCollaborator, InventoryError};
use crate::metrics::{ACQUISITION_REQUESTS, APPLY_FAILURES, MEMBERSHIP_CHANGES};

use super::{ApplyError, ReconciliationDiff, SyncOutcome};

#[derive(Clone, Copy)]
enum Membership {
    Add,
    Remove,
}

/// Apply `diff` to `collection`.
///
/// Additions run before removals, then acquisition requests for the missing
/// candidates. A failed batch is retried item by item so failures are
/// attributed to single items and do not block their siblings. Nothing is
/// rolled back.
pub async fn apply_diff(
    spec: &CollectionSpec,
    collection: &str,
    diff: &ReconciliationDiff,
    inventory: &dyn InventoryCollaborator,
    acquisition: Option<&AcquisitionRegistry>,
) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();

    let adds = diff.add_handles();
    outcome.added = apply_membership(
        spec,
        collection,
        &adds,
        Membership::Add,
        inventory,
        &mut outcome.errors,
    )
    .await;
    outcome.removed = apply_membership(
        spec,
        collection,
        &diff.to_remove,
        Membership::Remove,
        inventory,
        &mut outcome.errors,
    )
    .await;

    match acquisition {
        Some(registry) => request_missing(spec, diff, registry, &mut outcome).await,
        None => outcome.unresolved = diff.missing.clone(),
    }

    for error in &outcome.errors {
        APPLY_FAILURES
            .with_label_values(&[error.operation()])
            .inc();
    }
    info!(
        "Collection '{}': +{} -{} requested {} ({} errors)",
        spec.name,
        outcome.added.len(),
        outcome.removed.len(),
        outcome.requested.len(),
        outcome.errors.len()
    );
    outcome
}

async fn apply_membership(
    spec: &CollectionSpec,
    collection: &str,
    handles: &[String],
    direction: Membership,
    inventory: &dyn InventoryCollaborator,
    errors: &mut Vec<ApplyError>,
) -> Vec<String> {
    if handles.is_empty() {
        return Vec::new();
    }

    let applied = match send(inventory, collection, direction, handles).await {
        Ok(()) => handles.to_vec(),
        Err(batch_error) => {
            debug!(
                "Batch update of '{}' failed ({}), retrying per item",
                spec.name, batch_error
            );
            let mut applied = Vec::new();
            for handle in handles {
                match send(inventory, collection, direction, std::slice::from_ref(handle)).await {
                    Ok(()) => applied.push(handle.clone()),
                    Err(error) => {
                        let error = membership_error(spec, handle, direction, error);
                        warn!("{}", error);
                        errors.push(error);
                    }
                }
            }
            applied
        }
    };

    let label = match direction {
        Membership::Add => "added",
        Membership::Remove => "removed",
    };
    MEMBERSHIP_CHANGES
        .with_label_values(&[label])
        .inc_by(applied.len() as u64);
    applied
}

async fn send(
    inventory: &dyn InventoryCollaborator,
    collection: &str,
    direction: Membership,
    items: &[String],
) -> Result<(), InventoryError> {
    match direction {
        Membership::Add => inventory.add_to_collection(collection, items).await,
        Membership::Remove => inventory.remove_from_collection(collection, items).await,
    }
}

fn membership_error(
    spec: &CollectionSpec,
    handle: &str,
    direction: Membership,
    error: InventoryError,
) -> ApplyError {
    let collection = spec.name.clone();
    let item = handle.to_string();
    match direction {
        Membership::Add => ApplyError::Add {
            collection,
            item,
            error,
        },
        Membership::Remove => ApplyError::Remove {
            collection,
            item,
            error,
        },
    }
}

async fn request_missing(
    spec: &CollectionSpec,
    diff: &ReconciliationDiff,
    registry: &AcquisitionRegistry,
    outcome: &mut SyncOutcome,
) {
    for candidate in &diff.missing {
        let Some(collaborator) = registry.get(candidate.kind) else {
            debug!(
                "No acquisition collaborator for {}; '{}' left unresolved",
                candidate.kind,
                candidate.display_title()
            );
            outcome.unresolved.push(candidate.clone());
            continue;
        };

        let options = spec.acquisition_options(candidate.kind);
        let kind = candidate.kind.as_str();
        match collaborator.request_acquisition(candidate, options).await {
            Ok(()) => {
                ACQUISITION_REQUESTS
                    .with_label_values(&[kind, "requested"])
                    .inc();
                debug!(
                    "Requested '{}' from {}",
                    candidate.display_title(),
                    collaborator.name()
                );
                outcome.requested.push(candidate.clone());
            }
            Err(AcquisitionError::AlreadyRequested(_)) => {
                ACQUISITION_REQUESTS
                    .with_label_values(&[kind, "already_requested"])
                    .inc();
                outcome.already_requested.push(candidate.clone());
            }
            Err(error) => {
                ACQUISITION_REQUESTS
                    .with_label_values(&[kind, "failed"])
                    .inc();
                let error = ApplyError::Acquire {
                    collection: spec.name.clone(),
                    candidate: candidate.display_title(),
                    error,
                };
                warn!("{}", error);
                outcome.errors.push(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::collection::AcquisitionOptions;
    use crate::inventory::InventoryItem;
    use crate::media::{ExternalIds, MediaKind};
    use crate::source::CandidateItem;
    use crate::testing::{MockAcquisition, MockInventory};

    fn spec() -> CollectionSpec {
        let mut spec = CollectionSpec::new("Best", "Movies", MediaKind::Movie);
        spec.movie_acquisition = AcquisitionOptions {
            root_folder: Some("/movies".into()),
            quality_profile: None,
            tag: Some("best".into()),
        };
        spec
    }

    fn item(handle: &str) -> InventoryItem {
        InventoryItem::new(handle, handle, Some(2000), MediaKind::Movie)
    }

    fn missing(title: &str, tmdb: u32) -> CandidateItem {
        CandidateItem::new(title, Some(2020), MediaKind::Movie).with_ids(ExternalIds::tmdb(tmdb))
    }

    async fn inventory_with_collection(members: &[&str]) -> (MockInventory, String) {
        let inventory = MockInventory::new();
        let collection = inventory.add_collection("Movies", "Best", members).await;
        (inventory, collection)
    }

    #[tokio::test]
    async fn test_adds_before_removes() {
        let (inventory, handle) = inventory_with_collection(&["x"]).await;
        let diff = ReconciliationDiff {
            to_add: vec![item("a"), item("b")],
            to_remove: vec!["x".into()],
            missing: vec![],
        };

        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, None).await;

        assert_eq!(outcome.added, vec!["a", "b"]);
        assert_eq!(outcome.removed, vec!["x"]);
        assert!(outcome.errors.is_empty());
        let ops: Vec<_> = inventory
            .recorded_calls()
            .await
            .into_iter()
            .map(|c| c.operation)
            .collect();
        assert_eq!(ops, vec!["add_to_collection", "remove_from_collection"]);
        assert_eq!(inventory.members(&handle).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_single_item_failure_does_not_block_siblings() {
        let (inventory, handle) = inventory_with_collection(&[]).await;
        inventory
            .fail_item("b", InventoryError::NotFound("b".into()))
            .await;
        let diff = ReconciliationDiff {
            to_add: vec![item("a"), item("b"), item("c")],
            ..Default::default()
        };

        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, None).await;

        assert_eq!(outcome.added, vec!["a", "c"]);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(
            &outcome.errors[0],
            ApplyError::Add { item, error: InventoryError::NotFound(_), .. } if item == "b"
        ));
    }

    #[tokio::test]
    async fn test_acquisition_requests_for_missing() {
        let (inventory, handle) = inventory_with_collection(&[]).await;
        let radarr = Arc::new(MockAcquisition::new("radarr"));
        radarr
            .mark_already_requested(&missing("Tracked", 2).key().to_string())
            .await;
        let registry = AcquisitionRegistry::new().with(MediaKind::Movie, radarr.clone());

        let diff = ReconciliationDiff {
            missing: vec![missing("New", 1), missing("Tracked", 2)],
            ..Default::default()
        };
        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, Some(&registry)).await;

        assert_eq!(outcome.requested.len(), 1);
        assert_eq!(outcome.already_requested.len(), 1);
        assert!(outcome.errors.is_empty());

        let requests = radarr.recorded_requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].options.tag.as_deref(), Some("best"));
        assert_eq!(requests[0].options.root_folder.as_deref(), Some("/movies"));
    }

    #[tokio::test]
    async fn test_acquisition_failure_keeps_applied_changes() {
        let (inventory, handle) = inventory_with_collection(&[]).await;
        let radarr = Arc::new(MockAcquisition::new("radarr"));
        radarr
            .set_next_error(AcquisitionError::Rejected("quota".into()))
            .await;
        let registry = AcquisitionRegistry::new().with(MediaKind::Movie, radarr);

        let diff = ReconciliationDiff {
            to_add: vec![item("a")],
            missing: vec![missing("New", 1)],
            ..Default::default()
        };
        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, Some(&registry)).await;

        assert_eq!(outcome.added, vec!["a"]);
        assert_eq!(inventory.members(&handle).await, vec!["a"]);
        assert!(matches!(outcome.errors[0], ApplyError::Acquire { .. }));
    }

    #[tokio::test]
    async fn test_missing_unresolved_without_acquisition() {
        let (inventory, handle) = inventory_with_collection(&[]).await;
        let diff = ReconciliationDiff {
            missing: vec![missing("New", 1)],
            ..Default::default()
        };
        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, None).await;
        assert_eq!(outcome.unresolved.len(), 1);
        assert!(!outcome.changed());

        let empty = AcquisitionRegistry::new();
        let outcome = apply_diff(&spec(), &handle, &diff, &inventory, Some(&empty)).await;
        assert_eq!(outcome.unresolved.len(), 1);
    }
}
