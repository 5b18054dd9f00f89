use std::collections::HashSet;
use uuid::Uuid;

use super::{ChildInput, ReconcileError};

/// New child, with its 0-based index in the desired list
#[derive(Debug, Clone, PartialEq)]
pub struct ChildCreate<I> {
    pub position: usize,
    pub input: I,
}

/// Persisted child to overwrite from a desired item
#[derive(Debug, Clone, PartialEq)]
pub struct ChildUpdate<I> {
    pub id: Uuid,
    pub position: usize,
    pub input: I,
}

/// Disjoint create/update/delete sets for one collection
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<I> {
    pub create: Vec<ChildCreate<I>>,
    pub update: Vec<ChildUpdate<I>>,
    pub delete: Vec<Uuid>,
}

impl<I> ReconcilePlan<I> {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Partition `desired` against the parent's existing child ids.
///
/// An item whose id is among `existing_ids` becomes an update and claims that
/// id. Items without an id, or with an id this parent does not own, become
/// creates. Unclaimed existing ids are deleted, in their original order. A
/// desired list naming the same id twice is rejected before anything is
/// planned.
pub fn plan<I: ChildInput>(existing_ids: &[Uuid], desired: &[I]) -> Result<ReconcilePlan<I>, ReconcileError> {
    let mut seen = HashSet::new();
    for id in desired.iter().filter_map(|item| item.id()) {
        if !seen.insert(id) {
            return Err(ReconcileError::DuplicateChildId(id));
        }
    }

    let mut remaining: HashSet<Uuid> = existing_ids.iter().copied().collect();
    let mut create = vec![];
    let mut update = vec![];

    for (position, item) in desired.iter().enumerate() {
        match item.id() {
            Some(id) if remaining.remove(&id) => update.push(ChildUpdate { id, position, input: item.clone() }),
            Some(id) => {
                tracing::warn!("Child id {} is not owned by this parent, creating a new row instead", id);
                create.push(ChildCreate { position, input: item.clone() });
            }
            None => create.push(ChildCreate { position, input: item.clone() }),
        }
    }

    let delete = existing_ids.iter().copied().filter(|id| remaining.contains(id)).collect();

    Ok(ReconcilePlan { create, update, delete })
}
