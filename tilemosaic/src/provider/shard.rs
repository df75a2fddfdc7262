//! Server shard selection
//!
//! Several providers expose the same imagery on a handful of numbered hosts
//! (`mt0`..`mt3`, `t1`..`t4`). Which one a request goes to only spreads load,
//! so the choice is injectable and tests can pin it.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Chooses a shard in `0..count` for each request.
pub trait ShardSelector: Send + Sync {
    /// Returns a shard index in `0..count`. `count` is at least 1.
    fn pick(&self, count: u8) -> u8;
}

/// Uniformly random shard per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShard;

impl ShardSelector for RandomShard {
    fn pick(&self, count: u8) -> u8 {
        if count <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..count)
    }
}

/// Cycles through the shards in order.
#[derive(Debug, Default)]
pub struct RoundRobinShard {
    counter: AtomicUsize,
}

impl RoundRobinShard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShardSelector for RoundRobinShard {
    fn pick(&self, count: u8) -> u8 {
        let current = self.counter.fetch_add(1, Ordering::Relaxed);
        (current % count.max(1) as usize) as u8
    }
}

/// Always the same shard (wrapped into range).
#[derive(Debug, Clone, Copy)]
pub struct FixedShard(pub u8);

impl ShardSelector for FixedShard {
    fn pick(&self, count: u8) -> u8 {
        self.0 % count.max(1)
    }
}
