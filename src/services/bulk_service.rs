use std::collections::BTreeSet;

use crate::{
    error::Result,
    models::{Actor, Flash, RecordScope},
    services::product_policy::{Authorizer, Capability},
    store::CatalogStore,
};

pub const NONE_DELETED_MESSAGE: &str =
    "No products were deleted. You may not have permission to delete these products.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDeleteOutcome {
    NothingSelected,
    Deleted(usize),
    NoneDeleted { attempted: usize },
}

impl BulkDeleteOutcome {
    pub fn deleted(&self) -> usize {
        match self {
            BulkDeleteOutcome::Deleted(count) => *count,
            _ => 0,
        }
    }

    pub fn notification(&self) -> Option<Flash> {
        match self {
            BulkDeleteOutcome::NothingSelected => None,
            BulkDeleteOutcome::Deleted(count) => {
                Some(Flash::success(format!("{} product(s) moved to trash", count)))
            }
            BulkDeleteOutcome::NoneDeleted { .. } => Some(Flash::error(NONE_DELETED_MESSAGE)),
        }
    }
}

/// Soft-deletes every selected product the actor may delete. Records that
/// are gone, already trashed or not permitted are skipped.
pub async fn bulk_soft_delete(
    store: &dyn CatalogStore,
    authorizer: &dyn Authorizer,
    actor: &Actor,
    ids: BTreeSet<i32>,
) -> Result<BulkDeleteOutcome> {
    if ids.is_empty() {
        return Ok(BulkDeleteOutcome::NothingSelected);
    }

    let attempted = ids.len();
    let mut deleted = 0;

    for id in ids {
        let Some(product) = store.find(id, RecordScope::Active).await? else {
            continue;
        };

        if !authorizer.can(actor, Capability::Delete, Some(&product)) {
            tracing::warn!("User {} may not delete product {}", actor.id, id);
            continue;
        }

        if store.soft_delete(id).await? {
            deleted += 1;
        }
    }

    tracing::info!(
        "User {} bulk deleted {} of {} product(s)",
        actor.id,
        deleted,
        attempted
    );

    Ok(if deleted > 0 {
        BulkDeleteOutcome::Deleted(deleted)
    } else {
        BulkDeleteOutcome::NoneDeleted { attempted }
    })
}
