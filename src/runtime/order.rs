//! Play order over one playlist.
//!
//! [`PlayOrder`] owns a sequence of playlist indices and a cursor.
//! Eviction and reordering invalidate indices, so the runtime rebuilds
//! the order from the playlist after every change and re-anchors the
//! cursor on whatever is currently audible.

use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    NoLoop,
    LoopAll,
    LoopOne,
}

pub struct PlayOrder {
    order: Vec<usize>,
    pos: Option<usize>,
    loop_mode: LoopMode,
}

impl PlayOrder {
    pub fn new(mut order: Vec<usize>, shuffle: bool, loop_mode: LoopMode) -> Self {
        if shuffle {
            order.shuffle(&mut rand::rng());
        }
        Self {
            order,
            pos: None,
            loop_mode,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.pos.map(|p| self.order[p])
    }

    /// The track that would play next, without moving the cursor.
    pub fn peek_next(&self) -> Option<usize> {
        self.next_pos().map(|p| self.order[p])
    }

    /// Move the cursor to the next track and return it.
    pub fn advance(&mut self) -> Option<usize> {
        self.pos = self.next_pos();
        self.current()
    }

    fn next_pos(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        match self.pos {
            None => Some(0),
            Some(p) => match self.loop_mode {
                LoopMode::LoopOne => Some(p),
                LoopMode::LoopAll => Some((p + 1) % self.order.len()),
                LoopMode::NoLoop => (p + 1 < self.order.len()).then_some(p + 1),
            },
        }
    }

    /// Swap in a fresh order, keeping the cursor on `current` when that
    /// track survived. A lost cursor restarts from the top.
    pub fn rebuild(&mut self, order: Vec<usize>, current: Option<usize>) {
        self.pos = current.and_then(|c| order.iter().position(|&i| i == c));
        self.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_loop_plays_front_to_back_once() {
        let mut order = PlayOrder::new(vec![0, 1, 2], false, LoopMode::NoLoop);
        assert_eq!(order.current(), None);
        assert_eq!(order.advance(), Some(0));
        assert_eq!(order.advance(), Some(1));
        assert_eq!(order.advance(), Some(2));
        assert_eq!(order.advance(), None);
        assert_eq!(order.peek_next(), None);
    }

    #[test]
    fn peek_does_not_move_the_cursor() {
        let mut order = PlayOrder::new(vec![0, 1], false, LoopMode::NoLoop);
        assert_eq!(order.peek_next(), Some(0));
        assert_eq!(order.peek_next(), Some(0));
        assert_eq!(order.advance(), Some(0));
        assert_eq!(order.peek_next(), Some(1));
        assert_eq!(order.current(), Some(0));
    }

    #[test]
    fn loop_all_wraps_around() {
        let mut order = PlayOrder::new(vec![3, 7], false, LoopMode::LoopAll);
        assert_eq!(order.advance(), Some(3));
        assert_eq!(order.advance(), Some(7));
        assert_eq!(order.advance(), Some(3));
    }

    #[test]
    fn loop_one_repeats_the_current_track() {
        let mut order = PlayOrder::new(vec![3, 7], false, LoopMode::LoopOne);
        assert_eq!(order.advance(), Some(3));
        assert_eq!(order.advance(), Some(3));
        assert_eq!(order.peek_next(), Some(3));
    }

    #[test]
    fn shuffle_keeps_every_index_exactly_once() {
        let mut order = PlayOrder::new((0..50).collect(), true, LoopMode::NoLoop);
        let mut seen = Vec::new();
        while let Some(index) = order.advance() {
            seen.push(index);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn rebuild_re_anchors_on_the_surviving_track() {
        let mut order = PlayOrder::new(vec![0, 1, 2], false, LoopMode::NoLoop);
        order.advance();
        order.advance();
        assert_eq!(order.current(), Some(1));

        order.rebuild(vec![2, 1, 0], Some(1));
        assert_eq!(order.current(), Some(1));
        assert_eq!(order.advance(), Some(0));
    }

    #[test]
    fn rebuild_without_the_current_track_restarts() {
        let mut order = PlayOrder::new(vec![0, 1, 2], false, LoopMode::NoLoop);
        order.advance();
        order.rebuild(vec![1, 2], None);
        assert_eq!(order.current(), None);
        assert_eq!(order.advance(), Some(1));
    }

    #[test]
    fn empty_orders_never_yield() {
        let mut order = PlayOrder::new(Vec::new(), false, LoopMode::LoopAll);
        assert_eq!(order.peek_next(), None);
        assert_eq!(order.advance(), None);
    }
}
