//! Deferred sub-effects (axe second wave, staggered lightning, frost shards)
//!
//! Each entry names its target by id. The owner of the world looks the
//! target up again when the entry comes due and drops the entry if the
//! target is gone.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Work to run at a later time
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// Second axe volley, angles offset between the first volley's axes
    AxeWave {
        weapon_id: u32,
        base_angle: f32,
        count: u32,
    },
    /// One lightning strike; `next` is the following target for the chain visual
    LightningStrike {
        target: u32,
        damage: f32,
        critical: bool,
        next: Option<u32>,
    },
    /// Ice shards bursting out of a frozen enemy
    FrostShards { weapon_id: u32, enemy: u32 },
}

#[derive(Debug, Clone)]
struct Scheduled {
    due_ms: f64,
    /// Insertion order, breaks ties between equal due times
    seq: u64,
    event: Deferred,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_ms
            .total_cmp(&other.due_ms)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Time-ordered queue of deferred work
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn schedule(&mut self, due_ms: f64, event: Deferred) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { due_ms, seq, event }));
    }

    /// Pop the earliest entry due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Deferred> {
        if self.queue.peek()?.0.due_ms > now_ms {
            return None;
        }
        self.queue.pop().map(|Reverse(entry)| entry.event)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
