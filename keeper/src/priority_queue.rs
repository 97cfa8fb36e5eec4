//! Priority queue for tracking position health (min-heap by ratio)

use priority_queue::PriorityQueue;
use rei_ledger::Owner;
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::health::PositionHealth;

/// Health-based priority queue (min-heap: lowest ratio first)
pub struct HealthQueue {
    /// Priority queue (using Reverse for min-heap)
    queue: PriorityQueue<Owner, Reverse<u128>>,
    /// Map for O(1) lookups
    map: HashMap<Owner, PositionHealth>,
}

impl HealthQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            map: HashMap::new(),
        }
    }

    /// Push or update position health
    pub fn push(&mut self, health: PositionHealth) {
        let owner = health.owner.clone();
        let priority = health.priority();

        self.map.insert(owner.clone(), health);
        self.queue.push(owner, Reverse(priority));
    }

    /// Replace the queue contents with a fresh snapshot
    pub fn rebuild(&mut self, snapshot: Vec<PositionHealth>) {
        self.clear();
        for health in snapshot {
            self.push(health);
        }
    }

    /// Pop position with lowest ratio
    pub fn pop(&mut self) -> Option<PositionHealth> {
        let (owner, _priority) = self.queue.pop()?;
        self.map.remove(&owner)
    }

    /// Peek at position with lowest ratio without removing
    pub fn peek(&self) -> Option<&PositionHealth> {
        let (owner, _priority) = self.queue.peek()?;
        self.map.get(owner)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pop liquidatable positions in heap order, lowest ratio first.
    ///
    /// Stops at the first entry at or above `min_ratio_bps`; nothing from
    /// there on can be liquidatable. Healthy entries popped on the way are
    /// dropped until the next rebuild.
    pub fn drain_liquidatable(&mut self, min_ratio_bps: u64) -> Vec<PositionHealth> {
        let mut due = Vec::new();
        while self.peek().map_or(false, |h| h.priority() < min_ratio_bps as u128) {
            match self.pop() {
                Some(h) if h.needs_liquidation() => due.push(h),
                Some(_) => {}
                None => break,
            }
        }
        due
    }

    /// Healthy positions inside the warning band
    pub fn get_preliq_candidates(&self, min_ratio_bps: u64, buffer_bps: u64) -> Vec<PositionHealth> {
        self.map
            .values()
            .filter(|h| h.in_preliq_zone(min_ratio_bps, buffer_bps))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.map.clear();
    }
}

impl Default for HealthQueue {
    fn default() -> Self {
        Self::new()
    }
}
