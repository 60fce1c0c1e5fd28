//! Reconciliation engine: pure count aggregation and class-to-tool mapping.
//!
//! The engine only reports quantities. It never rejects a mismatch between
//! required, given and returned counts; accepting or rejecting a hand-off is
//! a human decision taken through the `*WaitingForApproval` states.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detection::Detection;

/// Count detections per model class identifier.
///
/// Deterministic and I/O free; the `BTreeMap` keeps iteration order stable
/// for logging and tests.
///
/// # Examples
/// ```
/// use toolcrib::domain::reconcile::count_by_class;
///
/// assert!(count_by_class(&[]).is_empty());
/// ```
pub fn count_by_class(detections: &[Detection]) -> BTreeMap<u32, u32> {
    let mut counts = BTreeMap::new();
    for detection in detections {
        *counts.entry(detection.class_id).or_insert(0) += 1;
    }
    counts
}

/// Static mapping from model class identifiers to internal tool identifiers.
///
/// Loaded once at startup from configuration. Classes absent from the
/// mapping are silently dropped during translation; the model may know
/// object classes the crib does not stock.
#[derive(Debug, Clone, Default)]
pub struct ToolClassMap {
    classes: HashMap<u32, Uuid>,
}

impl ToolClassMap {
    /// Build a mapping from `(class_id, tool_id)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (u32, Uuid)>) -> Self {
        Self {
            classes: entries.into_iter().collect(),
        }
    }

    /// Translate per-class counts into per-tool counts, dropping classes
    /// without a configured tool.
    pub fn map_to_tools(&self, counts: &BTreeMap<u32, u32>) -> HashMap<Uuid, u32> {
        counts
            .iter()
            .filter_map(|(class_id, quantity)| {
                self.classes.get(class_id).map(|tool_id| (*tool_id, *quantity))
            })
            .collect()
    }

    /// Number of configured class mappings.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no classes are configured.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// One row of the reconciliation read view: how many of a kit tool were
/// required, handed out, and brought back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
    pub tool_id: Uuid,
    pub tool_name: String,
    pub quantity_required: u32,
    pub quantity_given: u32,
    pub quantity_returned: u32,
}

impl LedgerLine {
    /// Quantity handed out but not yet returned.
    pub fn outstanding(&self) -> u32 {
        self.quantity_given.saturating_sub(self.quantity_returned)
    }
}
