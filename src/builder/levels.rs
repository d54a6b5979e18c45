//! Per-mode level rotation (spec.md §4.8.2): a FIFO queue per mode,
//! refilled with a shuffled copy of the mode's level list whenever it
//! runs low, never repeating the same level twice in a row across a
//! refill boundary.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use rand::seq::SliceRandom;

use crate::identity::Symbol;

#[derive(Default)]
struct ModeQueue {
    queue: VecDeque<Symbol>,
}

/// The process-wide level rotation, one FIFO queue per mode.
pub struct LevelRotation {
    by_mode: Mutex<HashMap<Symbol, ModeQueue>>,
    /// The full level list per mode, configured once at startup.
    pools: HashMap<Symbol, Vec<Symbol>>,
}

impl LevelRotation {
    pub fn new(pools: HashMap<Symbol, Vec<Symbol>>) -> Self {
        Self {
            by_mode: Mutex::new(HashMap::new()),
            pools,
        }
    }

    /// Pops the next level for `mode`, refilling first if the queue has
    /// `<= 1` element left (spec.md §4.8.2: "When the queue has <=1
    /// element, refill by appending a shuffled copy... the very next
    /// level is not immediately repeated").
    pub fn next(&self, mode: Symbol) -> Option<Symbol> {
        let pool = self.pools.get(&mode)?;
        if pool.is_empty() {
            return None;
        }

        let mut by_mode = self.by_mode.lock();
        let state = by_mode.entry(mode).or_default();

        if state.queue.len() <= 1 {
            let mut shuffled = pool.clone();
            shuffled.shuffle(&mut rand::thread_rng());

            if let (Some(&last), Some(&first_new)) = (state.queue.back(), shuffled.first()) {
                if last == first_new && shuffled.len() > 1 {
                    shuffled.swap(0, 1);
                }
            }
            state.queue.extend(shuffled);
        }

        state.queue.pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::to_symbol;

    #[test]
    fn test_single_level_pool_never_errors() {
        let mode = to_symbol("social_public");
        let mut pools = HashMap::new();
        pools.insert(mode, vec![to_symbol("the_plaza")]);
        let rotation = LevelRotation::new(pools);
        for _ in 0..10 {
            assert_eq!(rotation.next(mode), Some(to_symbol("the_plaza")));
        }
    }

    #[test]
    fn test_no_immediate_repeat_across_many_pops() {
        let mode = to_symbol("arena_public");
        let levels: Vec<Symbol> = ["dyson_dc", "fission_surge", "combustion"]
            .iter()
            .map(|s| to_symbol(s))
            .collect();
        let mut pools = HashMap::new();
        pools.insert(mode, levels);
        let rotation = LevelRotation::new(pools);

        let mut last = rotation.next(mode).unwrap();
        for _ in 0..60 {
            let current = rotation.next(mode).unwrap();
            assert_ne!(current, last);
            last = current;
        }
    }

    #[test]
    fn test_unknown_mode_returns_none() {
        let rotation = LevelRotation::new(HashMap::new());
        assert!(rotation.next(to_symbol("unknown_mode")).is_none());
    }
}
