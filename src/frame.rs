use crate::address::Vpn;
use std::ops::{Index, IndexMut};

/// Stable identity of a physical frame, `0..frame_count`.
pub type FrameNumber = usize;

/// Position of a process in the simulation's process list.
pub type Pid = usize;

/// The (process, virtual page) pair a frame is currently holding.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Owner {
    pub pid: Pid,
    pub vpn: Vpn,
}

/// The `Frame` struct represents one physical page slot. An associated owner is kept simply for
/// record keeping and to minimize the effort required to invalidate the corresponding mapping
/// when the frame is victimized. `prev` and `next` place the frame in the recency ring.
#[derive(Debug, PartialEq, Clone)]
pub struct Frame {
    number: FrameNumber,
    pub owner: Option<Owner>,
    prev: FrameNumber,
    next: FrameNumber,
}

impl Frame {
    pub fn number(&self) -> FrameNumber {
        self.number
    }
}

/// The `FrameRing` struct simulates the finite pool of physical frames shared by every process.
/// Frames are arranged in a circular doubly linked list, ordered from least to most recently
/// used starting at `oldest`. Links are frame numbers into `entries`, so frames never move and
/// the ring never grows or shrinks; only the links and the owners change.
#[derive(Debug)]
pub struct FrameRing {
    entries: Vec<Frame>,
    oldest: FrameNumber,
}

impl FrameRing {
    /// Construct a ring of `frame_count` free frames linked in frame number order.
    ///
    /// # Panics
    ///
    /// Panics if `frame_count` is zero; configuration validation guarantees at least one frame.
    pub fn build(frame_count: usize) -> Self {
        assert!(frame_count > 0, "a frame ring needs at least one frame");
        let mut ring = Self {
            entries: (0..frame_count)
                .map(|number| Frame {
                    number,
                    owner: None,
                    prev: number,
                    next: number,
                })
                .collect(),
            oldest: 0,
        };
        ring.reset();
        ring
    }

    /// Free every frame and relink the ring in frame number order with frame 0 as the oldest.
    pub fn reset(&mut self) {
        let count = self.entries.len();
        for (number, frame) in self.entries.iter_mut().enumerate() {
            frame.owner = None;
            frame.prev = (number + count - 1) % count;
            frame.next = (number + 1) % count;
        }
        self.oldest = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The next eviction victim.
    pub fn oldest(&self) -> &Frame {
        &self.entries[self.oldest]
    }

    /// Mark a frame as the most recently used one.
    ///
    /// When the frame is already the oldest, advancing the oldest cursor is enough: by rotation
    /// the old head becomes the tail. Otherwise the frame is unlinked and relinked just before
    /// the oldest frame.
    ///
    /// # Arguments
    ///
    /// * `number` - the frame that was just accessed
    pub fn promote(&mut self, number: FrameNumber) {
        if number == self.oldest {
            self.oldest = self.entries[number].next;
            return;
        }

        let (prev, next) = (self.entries[number].prev, self.entries[number].next);
        self.entries[prev].next = next;
        self.entries[next].prev = prev;

        let newest = self.entries[self.oldest].prev;
        self.entries[newest].next = number;
        self.entries[number].prev = newest;
        self.entries[number].next = self.oldest;
        let oldest = self.oldest;
        self.entries[oldest].prev = number;
    }

    /// Frame numbers from the oldest to the most recently used.
    pub fn lru_order(&self) -> Vec<FrameNumber> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut cursor = self.oldest;
        for _ in 0..self.entries.len() {
            order.push(cursor);
            cursor = self.entries[cursor].next;
        }
        order
    }
}

impl Index<FrameNumber> for FrameRing {
    type Output = Frame;

    fn index(&self, index: FrameNumber) -> &Self::Output {
        &self.entries[index]
    }
}

impl IndexMut<FrameNumber> for FrameRing {
    fn index_mut(&mut self, index: FrameNumber) -> &mut Self::Output {
        &mut self.entries[index]
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use linked_hash_map::LinkedHashMap;
    use proptest::prelude::*;

    const TEST_RING_SIZE: usize = 4;

    #[cfg(test)]
    mod frame_ring_tests {

        use super::*;

        #[test]
        fn build() {
            let ring = FrameRing::build(TEST_RING_SIZE);
            assert_eq!(ring.len(), TEST_RING_SIZE);
            assert_eq!(ring.oldest().number(), 0);
            assert_eq!(ring.lru_order(), vec![0, 1, 2, 3]);
            assert!((0..TEST_RING_SIZE).all(|x| ring[x].owner.is_none()));
        }

        #[test]
        fn promote_oldest_rotates() {
            let mut ring = FrameRing::build(TEST_RING_SIZE);
            ring.promote(0);
            assert_eq!(ring.oldest().number(), 1);
            assert_eq!(ring.lru_order(), vec![1, 2, 3, 0]);
        }

        #[test]
        fn promote_middle() {
            let mut ring = FrameRing::build(TEST_RING_SIZE);
            ring.promote(2);
            assert_eq!(ring.oldest().number(), 0);
            assert_eq!(ring.lru_order(), vec![0, 1, 3, 2]);
        }

        #[test]
        fn promote_newest_is_stable() {
            let mut ring = FrameRing::build(TEST_RING_SIZE);
            ring.promote(3);
            ring.promote(3);
            assert_eq!(ring.lru_order(), vec![0, 1, 2, 3]);
        }

        #[test]
        fn single_frame() {
            let mut ring = FrameRing::build(1);
            ring.promote(0);
            ring.promote(0);
            assert_eq!(ring.oldest().number(), 0);
            assert_eq!(ring.lru_order(), vec![0]);
        }

        #[test]
        fn reset() {
            let mut ring = FrameRing::build(TEST_RING_SIZE);
            ring[2].owner = Some(Owner { pid: 1, vpn: 7 });
            ring.promote(2);
            ring.promote(0);
            ring.reset();
            assert_eq!(ring.lru_order(), vec![0, 1, 2, 3]);
            assert!(ring[2].owner.is_none());
            assert_eq!(ring[2].number(), 2);
        }

        #[test]
        #[should_panic]
        fn build_empty() {
            FrameRing::build(0);
        }
    }

    proptest! {
        #[test]
        fn matches_linked_hash_map_lru(
            size in 1usize..16,
            touches in proptest::collection::vec(0usize..16, 0..200),
        ) {
            let mut ring = FrameRing::build(size);
            let mut model: LinkedHashMap<usize, ()> = (0..size).map(|x| (x, ())).collect();

            for touch in touches.into_iter().map(|x| x % size) {
                ring.promote(touch);
                model.remove(&touch);
                model.insert(touch, ());
                prop_assert_eq!(ring.oldest().number(), *model.front().unwrap().0);
            }

            let expected: Vec<usize> = model.keys().copied().collect();
            prop_assert_eq!(ring.lru_order(), expected);
        }
    }
}
