//! Resolution entries and their age-ordered storage
//!
//! Entries live in a generational arena. A hash index maps each
//! [`NodeAddress`] to its slot, and the slots are threaded on a doubly
//! linked list ordered by last insert, oldest first, so eviction and
//! refresh are both O(1).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use generational_arena::{Arena, Index};
use meshroute_core::{EtherAddress, NodeAddress};

/// Poll signals start out one second in the past, so the first query
/// may poll immediately
const INITIAL_POLL_OFFSET_MS: i64 = -1000;

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// One node's link-layer mapping and the packets waiting on it
pub(crate) struct ArpEntry<P> {
    pub(crate) node: NodeAddress,
    pub(crate) eth: EtherAddress,
    pub(crate) unicast: bool,
    /// When the mapping was last inserted
    pub(crate) live: Instant,
    /// Last poll signal, in milliseconds relative to `live`
    poll_offset: AtomicI64,
    pub(crate) queue: VecDeque<P>,
    prev: Option<Index>,
    next: Option<Index>,
}

impl<P> ArpEntry<P> {
    fn new(node: NodeAddress, now: Instant) -> Self {
        Self {
            node,
            eth: EtherAddress::broadcast(),
            unicast: false,
            live: now,
            poll_offset: AtomicI64::new(INITIAL_POLL_OFFSET_MS),
            queue: VecDeque::new(),
            prev: None,
            next: None,
        }
    }

    /// Store a fresh mapping, resetting live and poll ticks
    pub(crate) fn refresh(&mut self, eth: EtherAddress, now: Instant) {
        self.eth = eth;
        self.unicast = !eth.is_broadcast();
        self.live = now;
        *self.poll_offset.get_mut() = INITIAL_POLL_OFFSET_MS;
    }

    /// Time since the last insert
    pub(crate) fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.live)
    }

    /// Not refreshed within `timeout`; a zero timeout never expires
    pub(crate) fn expired(&self, now: Instant, timeout: Duration) -> bool {
        !timeout.is_zero() && self.age(now) > timeout
    }

    /// Holds a real (non-broadcast) address that has not expired
    pub(crate) fn is_fresh_unicast(&self, now: Instant, timeout: Duration) -> bool {
        self.unicast && !self.expired(now, timeout)
    }

    /// Claim a poll signal if the last one is at least `rate_limit` old
    ///
    /// Safe under a shared lock; of several racing callers exactly one
    /// wins.
    pub(crate) fn try_poll(&self, now: Instant, rate_limit: Duration) -> bool {
        let now_offset = millis(self.age(now));
        let limit = millis(rate_limit);
        let mut last = self.poll_offset.load(Ordering::Acquire);
        loop {
            if now_offset < last.saturating_add(limit) {
                return false;
            }
            match self.poll_offset.compare_exchange_weak(
                last,
                now_offset,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }
}

/// Arena-backed entry storage with an age-ordered list
pub(crate) struct EntryTable<P> {
    arena: Arena<ArpEntry<P>>,
    index: HashMap<NodeAddress, Index>,
    head: Option<Index>,
    tail: Option<Index>,
    pub(crate) packet_count: usize,
}

impl<P> Default for EntryTable<P> {
    fn default() -> Self {
        Self {
            arena: Arena::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            packet_count: 0,
        }
    }
}

impl<P> EntryTable<P> {
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn find(&self, node: &NodeAddress) -> Option<Index> {
        self.index.get(node).copied()
    }

    pub(crate) fn get(&self, node: &NodeAddress) -> Option<&ArpEntry<P>> {
        self.find(node).and_then(|idx| self.arena.get(idx))
    }

    pub(crate) fn entry(&self, idx: Index) -> Option<&ArpEntry<P>> {
        self.arena.get(idx)
    }

    pub(crate) fn entry_mut(&mut self, idx: Index) -> Option<&mut ArpEntry<P>> {
        self.arena.get_mut(idx)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ArpEntry<P>> {
        self.arena.iter().map(|(_, entry)| entry)
    }

    /// Oldest entry first
    pub(crate) fn front(&self) -> Option<Index> {
        self.head
    }

    pub(crate) fn next_of(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|e| e.next)
    }

    /// Allocate an entry for `node` at the tail of the age list
    pub(crate) fn create(&mut self, node: NodeAddress, now: Instant) -> Index {
        let idx = self.arena.insert(ArpEntry::new(node, now));
        self.index.insert(node, idx);
        self.push_back(idx);
        idx
    }

    /// Free an entry, handing back its queued packets
    pub(crate) fn remove(&mut self, idx: Index) -> VecDeque<P> {
        self.unlink(idx);
        match self.arena.remove(idx) {
            Some(entry) => {
                self.index.remove(&entry.node);
                self.packet_count -= entry.queue.len();
                entry.queue
            }
            None => VecDeque::new(),
        }
    }

    /// Move an entry to the tail of the age list
    pub(crate) fn touch(&mut self, idx: Index) {
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_back(idx);
    }

    /// Change an entry's key
    pub(crate) fn rekey(&mut self, idx: Index, node: NodeAddress) {
        if let Some(entry) = self.arena.get_mut(idx) {
            self.index.remove(&entry.node);
            entry.node = node;
            self.index.insert(node, idx);
        }
    }

    /// Drop everything, returning the number of queued packets discarded
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.packet_count;
        self.arena.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.packet_count = 0;
        dropped
    }

    fn push_back(&mut self, idx: Index) {
        let old_tail = self.tail;
        if let Some(entry) = self.arena.get_mut(idx) {
            entry.prev = old_tail;
            entry.next = None;
        }
        match old_tail.and_then(|t| self.arena.get_mut(t)) {
            Some(tail) => tail.next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn unlink(&mut self, idx: Index) {
        let Some(entry) = self.arena.get_mut(idx) else {
            return;
        };
        let (prev, next) = (entry.prev.take(), entry.next.take());
        match prev.and_then(|p| self.arena.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.arena.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }
}
