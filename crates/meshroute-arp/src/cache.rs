//! The address resolution cache
//!
//! [`ArpCache`] maps [`NodeAddress`]es to link-layer addresses and holds
//! packets for destinations that are still being resolved. All state sits
//! behind one reader/writer lock; lookups share it, everything that can
//! create, move or free an entry takes it exclusively.

use std::fmt::Write;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use meshroute_core::{Clock, EtherAddress, NodeAddress, SystemClock, is_default_iface};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::ArpConfig;
use crate::entry::EntryTable;
use crate::error::{Rejected, ResolutionError};

/// A mapped address from [`ArpCache::lookup_poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub eth: EtherAddress,
    /// The mapping is old enough that the caller should re-resolve it
    pub poll: bool,
}

/// Outcome of a successful [`ArpCache::append_query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The packet is queued; `poll` asks the caller to send a resolution
    /// request now
    Queued { poll: bool },
}

/// Point-in-time view of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub node: NodeAddress,
    pub eth: EtherAddress,
    /// Holds a unicast address that has not expired
    pub ok: bool,
    pub age: Duration,
    pub queued: usize,
}

/// Concurrent (IP, interface) to link-layer address cache
pub struct ArpCache<P> {
    config: ArpConfig,
    clock: Arc<dyn Clock>,
    table: RwLock<EntryTable<P>>,
    drops: AtomicU64,
}

impl<P> ArpCache<P> {
    /// Create an empty cache with default configuration
    pub fn new() -> Self {
        Self::with_config(ArpConfig::default(), Arc::new(SystemClock))
    }

    /// Create an empty cache with explicit configuration and clock
    pub fn with_config(config: ArpConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            table: RwLock::new(EntryTable::default()),
            drops: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ArpConfig {
        &self.config
    }

    /// Packets discarded so far, by eviction, capacity or clear
    pub fn drops(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> usize {
        self.table.read().len()
    }

    pub fn packet_count(&self) -> usize {
        self.table.read().packet_count
    }

    fn count_drops(&self, n: usize) {
        if n > 0 {
            self.drops.fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    /// Find or create the entry for `node`
    fn ensure(
        &self,
        table: &mut EntryTable<P>,
        node: NodeAddress,
        now: Instant,
    ) -> Result<generational_arena::Index, ResolutionError> {
        if let Some(idx) = table.find(&node) {
            return Ok(idx);
        }
        if let Some(limit) = self.config.allocation_limit {
            if table.len() >= limit {
                debug!(node = %node, limit, "Entry allocation refused");
                return Err(ResolutionError::OutOfMemory);
            }
        }
        let capacity = self.config.entry_capacity;
        if capacity > 0 && table.len() + 1 > capacity {
            self.slim_locked(table, now, 1);
        }
        trace!(node = %node, "New resolution entry");
        Ok(table.create(node, now))
    }

    /// Expire old entries, then shed queued packets over capacity
    ///
    /// `reserve` counts entries about to be created, so room is made for
    /// them too.
    #[instrument(skip(self, table), fields(entries = table.len(), packets = table.packet_count))]
    fn slim_locked(&self, table: &mut EntryTable<P>, now: Instant, reserve: usize) {
        let timeout = self.config.timeout;
        let entry_capacity = self.config.entry_capacity;
        let mut dropped = 0usize;
        let mut evicted = 0usize;

        while let Some(idx) = table.front() {
            let expired = table
                .entry(idx)
                .is_some_and(|e| e.expired(now, timeout));
            let over = entry_capacity > 0 && table.len() + reserve > entry_capacity;
            if !expired && !over {
                break;
            }
            dropped += table.remove(idx).len();
            evicted += 1;
        }

        let packet_capacity = self.config.packet_capacity;
        let mut cursor = table.front();
        while packet_capacity > 0 && table.packet_count > packet_capacity {
            let Some(idx) = cursor else {
                break;
            };
            let excess = table.packet_count - packet_capacity;
            let shed = match table.entry_mut(idx) {
                Some(entry) => {
                    let n = excess.min(entry.queue.len());
                    entry.queue.drain(..n).count()
                }
                None => 0,
            };
            table.packet_count -= shed;
            dropped += shed;
            cursor = table.next_of(idx);
        }

        self.count_drops(dropped);
        if evicted > 0 || dropped > 0 {
            debug!(evicted, dropped, "Slimmed resolution cache");
        }
    }

    /// Expire stale entries and enforce capacities
    ///
    /// Meant to be driven by an external timer every
    /// [`ArpConfig::slim_interval`].
    pub fn slim(&self) {
        let now = self.clock.now();
        let mut table = self.table.write();
        self.slim_locked(&mut table, now, 0);
    }

    /// Record a mapping; a broadcast address marks the node unresolved
    pub fn insert(&self, node: NodeAddress, eth: EtherAddress) -> Result<(), ResolutionError> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let idx = self.ensure(&mut table, node, now)?;
        if let Some(entry) = table.entry_mut(idx) {
            entry.refresh(eth, now);
        }
        table.touch(idx);
        trace!(node = %node, eth = %eth, "Inserted mapping");
        Ok(())
    }

    /// Record a mapping and take back every packet queued on it, oldest
    /// first
    pub fn insert_and_drain(
        &self,
        node: NodeAddress,
        eth: EtherAddress,
    ) -> Result<Vec<P>, ResolutionError> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let idx = self.ensure(&mut table, node, now)?;
        let drained: Vec<P> = match table.entry_mut(idx) {
            Some(entry) => {
                entry.refresh(eth, now);
                entry.queue.drain(..).collect()
            }
            None => Vec::new(),
        };
        table.packet_count -= drained.len();
        table.touch(idx);
        trace!(node = %node, eth = %eth, released = drained.len(), "Inserted mapping");
        Ok(drained)
    }

    /// Reset a node's mapping to broadcast
    pub fn delete(&self, node: NodeAddress) -> Result<(), ResolutionError> {
        self.insert(node, EtherAddress::broadcast())
    }

    /// Mapped address, broadcast if absent or expired
    pub fn lookup(&self, node: NodeAddress) -> EtherAddress {
        let now = self.clock.now();
        let table = self.table.read();
        match table.get(&node) {
            Some(entry) if !entry.expired(now, self.config.timeout) => entry.eth,
            _ => EtherAddress::broadcast(),
        }
    }

    /// Mapped address plus a hint to re-resolve
    ///
    /// `poll` is set when the mapping is at least `poll_after` old and no
    /// poll was signalled within the rate limit. A zero `poll_after`
    /// never polls. Returns `None` if absent or expired.
    pub fn lookup_poll(&self, node: NodeAddress, poll_after: Duration) -> Option<Resolved> {
        let now = self.clock.now();
        let table = self.table.read();
        let entry = table.get(&node)?;
        if entry.expired(now, self.config.timeout) {
            return None;
        }
        let poll = !poll_after.is_zero()
            && entry.age(now) >= poll_after
            && entry.try_poll(now, self.config.poll_rate_limit);
        Some(Resolved {
            eth: entry.eth,
            poll,
        })
    }

    /// Queue a packet until `node` resolves
    ///
    /// Fails with [`ResolutionError::AlreadyResolved`] when a fresh
    /// unicast mapping exists, and with [`ResolutionError::OutOfMemory`]
    /// when no entry can be allocated; the packet comes back in both
    /// cases.
    pub fn append_query(&self, node: NodeAddress, packet: P) -> Result<QueryOutcome, Rejected<P>> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let idx = match self.ensure(&mut table, node, now) {
            Ok(idx) => idx,
            Err(reason) => return Err(Rejected { packet, reason }),
        };

        let Some(entry) = table.entry_mut(idx) else {
            return Err(Rejected {
                packet,
                reason: ResolutionError::NotFound,
            });
        };
        if entry.is_fresh_unicast(now, self.config.timeout) {
            return Err(Rejected {
                packet,
                reason: ResolutionError::AlreadyResolved,
            });
        }
        let poll = entry.try_poll(now, self.config.poll_rate_limit);

        // count the packet before slimming so older queued packets give
        // way to it
        table.packet_count += 1;
        let capacity = self.config.packet_capacity;
        if capacity > 0 && table.packet_count > capacity {
            self.slim_locked(&mut table, now, 0);
        }
        // slimming may have expired the entry itself
        let idx = if table.entry(idx).is_some() {
            idx
        } else {
            match self.ensure(&mut table, node, now) {
                Ok(idx) => idx,
                Err(reason) => {
                    table.packet_count -= 1;
                    return Err(Rejected { packet, reason });
                }
            }
        };
        match table.entry_mut(idx) {
            Some(entry) => entry.queue.push_back(packet),
            None => {
                table.packet_count -= 1;
                return Err(Rejected {
                    packet,
                    reason: ResolutionError::NotFound,
                });
            }
        }
        trace!(node = %node, poll, queued = table.packet_count, "Queued packet");
        Ok(QueryOutcome::Queued { poll })
    }

    /// Node whose mapping is `eth`, null if none
    pub fn reverse_lookup(&self, eth: EtherAddress) -> NodeAddress {
        let table = self.table.read();
        table
            .iter()
            .find(|e| e.eth == eth)
            .map_or_else(NodeAddress::null, |e| e.node)
    }

    /// Address mapped for the default interface of `node`'s IP
    pub fn lookup_def(&self, node: NodeAddress) -> EtherAddress {
        let table = self.table.read();
        Self::default_eth(&table, node)
    }

    /// Address mapped for the default interface of whichever node owns
    /// `eth`
    pub fn lookup_def_eth(&self, eth: EtherAddress) -> EtherAddress {
        let table = self.table.read();
        let node = table
            .iter()
            .find(|e| e.eth == eth)
            .map_or_else(NodeAddress::null, |e| e.node);
        Self::default_eth(&table, node)
    }

    fn default_eth(table: &EntryTable<P>, node: NodeAddress) -> EtherAddress {
        if node.is_null() {
            return EtherAddress::broadcast();
        }
        table
            .iter()
            .find(|e| e.node.ip == node.ip && is_default_iface(e.node.iface))
            .map_or_else(EtherAddress::broadcast, |e| e.eth)
    }

    /// Move `node`'s entry to `new_iface`
    ///
    /// An entry already present under the new key is replaced and its
    /// queued packets count as drops.
    pub fn change_if(&self, node: NodeAddress, new_iface: u16) -> Result<(), ResolutionError> {
        let target = node.with_iface(new_iface);
        let mut table = self.table.write();
        let Some(idx) = table.find(&node) else {
            debug!(node = %node, new_iface, "No entry to move");
            return Err(ResolutionError::NotFound);
        };
        if target == node {
            return Ok(());
        }
        if let Some(existing) = table.find(&target) {
            let dropped = table.remove(existing).len();
            self.count_drops(dropped);
        }
        table.rekey(idx, target);
        debug!(from = %node, to = %target, "Moved resolution entry");
        Ok(())
    }

    /// Kill every queued packet and free every entry
    pub fn clear(&self) {
        let mut table = self.table.write();
        let dropped = table.clear();
        self.count_drops(dropped);
        debug!(dropped, "Cleared resolution cache");
    }

    /// Take over the entries of a previous cache
    ///
    /// Refused with [`ResolutionError::LateTakeState`] if this cache
    /// already holds entries. The drop counter moves along; `other` is
    /// left empty.
    pub fn take_state(&self, other: &ArpCache<P>) -> Result<(), ResolutionError> {
        if ptr::eq(self, other) {
            return Ok(());
        }
        // both locks are taken in address order
        let (mut mine, mut theirs) = if ptr::from_ref(self) < ptr::from_ref(other) {
            let mine = self.table.write();
            (mine, other.table.write())
        } else {
            let theirs = other.table.write();
            (self.table.write(), theirs)
        };
        if !mine.is_empty() {
            return Err(ResolutionError::LateTakeState);
        }
        std::mem::swap(&mut *mine, &mut *theirs);
        self.drops
            .store(other.drops.load(Ordering::Relaxed), Ordering::Relaxed);
        debug!(entries = mine.len(), packets = mine.packet_count, "Took over resolution state");
        Ok(())
    }

    /// Snapshot of every entry, ordered by node
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        let now = self.clock.now();
        let table = self.table.read();
        let mut entries: Vec<_> = table
            .iter()
            .map(|e| EntrySnapshot {
                node: e.node,
                eth: e.eth,
                ok: e.is_fresh_unicast(now, self.config.timeout),
                age: e.age(now),
                queued: e.queue.len(),
            })
            .collect();
        entries.sort_by_key(|e| e.node);
        entries
    }

    /// One `ip iface ok eth age` line per entry, age in seconds
    pub fn dump_table(&self) -> String {
        let mut out = String::new();
        for e in self.entries() {
            let _ = writeln!(
                out,
                "{} {} {} {} {:.3}",
                e.node.ip,
                e.node.iface,
                u8::from(e.ok),
                e.eth,
                e.age.as_secs_f64()
            );
        }
        out
    }
}

impl<P> Default for ArpCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
