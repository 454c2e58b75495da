use std::collections::VecDeque;

use uuid::Uuid;

use super::{Checkpoint, CheckpointSummary};
use crate::Metadata;
use crate::canvas::Snapshot;
use crate::errors::WorkflowError;
use crate::phase::Phase;

pub const DEFAULT_MAX_CHECKPOINTS: usize = 10;

/// Bounded, insertion-ordered checkpoint collection.
///
/// Once `max_checkpoints` is reached, each new checkpoint evicts the oldest.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    checkpoints: VecDeque<Checkpoint>,
    max_checkpoints: usize,
}

impl CheckpointStore {
    /// Capacity is clamped to at least one checkpoint.
    pub fn new(max_checkpoints: usize) -> Self {
        let max_checkpoints = max_checkpoints.max(1);
        Self {
            checkpoints: VecDeque::with_capacity(max_checkpoints),
            max_checkpoints,
        }
    }

    pub fn max_checkpoints(&self) -> usize {
        self.max_checkpoints
    }

    /// Snapshot `canvas` and `actions` and store the result.
    ///
    /// Nothing is evicted when serialization fails.
    pub fn create<C: Snapshot, A: Snapshot>(
        &mut self,
        canvas: &C,
        phase: Phase,
        actions: &[A],
        description: &str,
        metadata: Metadata,
    ) -> Result<&Checkpoint, WorkflowError> {
        let checkpoint = Checkpoint::capture(canvas, phase, actions, description, metadata)?;
        Ok(self.push(checkpoint))
    }

    /// Store an already captured checkpoint, evicting the oldest if full.
    pub fn push(&mut self, checkpoint: Checkpoint) -> &Checkpoint {
        while self.checkpoints.len() >= self.max_checkpoints {
            if let Some(evicted) = self.checkpoints.pop_front() {
                tracing::debug!(
                    checkpoint_id = %evicted.id,
                    phase = %evicted.phase,
                    "Evicted oldest checkpoint"
                );
            }
        }

        self.checkpoints.push_back(checkpoint);
        &self.checkpoints[self.checkpoints.len() - 1]
    }

    pub fn get(&self, id: Uuid) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|cp| cp.id == id)
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.back()
    }

    /// Checkpoints taken while in `phase`, oldest first.
    pub fn by_phase(&self, phase: Phase) -> Vec<&Checkpoint> {
        self.checkpoints.iter().filter(|cp| cp.phase == phase).collect()
    }

    /// Deserialize a fresh canvas from `checkpoint`.
    pub fn restore<C: Snapshot>(&self, checkpoint: &Checkpoint) -> Result<C, WorkflowError> {
        checkpoint.restore_canvas()
    }

    /// Deserialize the action history stored in `checkpoint`.
    pub fn action_history_at<A: Snapshot>(
        &self,
        checkpoint: &Checkpoint,
    ) -> Result<Vec<A>, WorkflowError> {
        checkpoint.restore_actions()
    }

    /// Look up a rollback target by id. Later checkpoints are kept.
    pub fn rollback_to(&self, id: Uuid) -> Option<&Checkpoint> {
        self.get(id)
    }

    /// The most recent checkpoint taken in `phase`.
    pub fn rollback_to_phase(&self, phase: Phase) -> Option<&Checkpoint> {
        self.checkpoints.iter().rev().find(|cp| cp.phase == phase)
    }

    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    pub fn count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    pub fn summary(&self) -> Vec<CheckpointSummary> {
        self.checkpoints.iter().map(Checkpoint::summary).collect()
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHECKPOINTS)
    }
}
