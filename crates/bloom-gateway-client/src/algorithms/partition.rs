//! # Request Partitioning
//!
//! Groups per-block inputs by owning gateway address.

use crate::domain::{
    Address, BlockAssignment, BlockRef, FingerprintRange, GatewayError, ShardWorkUnit,
};
use std::collections::HashMap;

/// Per-call routing result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionPlan {
    /// One unit per distinct address, in first-seen order.
    pub units: Vec<ShardWorkUnit>,
    /// Fingerprint range across all inputs (telemetry only).
    pub fingerprint_range: Option<FingerprintRange>,
}

impl PartitionPlan {
    /// True when no work was routed.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Total number of series groups across all units.
    pub fn series_count(&self) -> usize {
        self.units.iter().map(|u| u.groups.len()).sum()
    }
}

/// Route every block to its owner and group the work per address.
///
/// Fails fast on the first routing error: an unroutable block means the
/// routing layer itself is broken, not a remote peer.
pub fn partition_blocks<F>(
    blocks: Vec<BlockAssignment>,
    mut owner: F,
) -> Result<PartitionPlan, GatewayError>
where
    F: FnMut(&BlockRef) -> Result<Address, GatewayError>,
{
    let mut plan = PartitionPlan::default();
    let mut pos: HashMap<Address, usize> = HashMap::new();

    for assignment in blocks {
        let addr = owner(&assignment.block)?;

        for group in &assignment.series {
            match plan.fingerprint_range.as_mut() {
                Some(range) => range.include(group.fingerprint),
                None => plan.fingerprint_range = Some(FingerprintRange::point(group.fingerprint)),
            }
        }

        let idx = *pos.entry(addr.clone()).or_insert_with(|| {
            plan.units.push(ShardWorkUnit::new(addr));
            plan.units.len() - 1
        });
        plan.units[idx].push(&assignment.block, assignment.series);
    }

    Ok(plan)
}
