// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process pub/sub bus
//!
//! Behaves like a broker with PUB/SUB semantics: a message reaches only the
//! subscribers connected at the moment it is injected, and nothing is queued for
//! subscribers that connect later. The bus can be taken offline or have its
//! connections severed, which makes it suitable for exercising reconnect logic
//! without a real broker.

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::{TransportError, TransportResult};
use crate::traits::{Publisher, Subscriber, Transport};

type Frame = (Vec<u8>, Vec<u8>);

#[derive(Default)]
struct SubscriberSlot {
    topics: Vec<Vec<u8>>,
    queue: VecDeque<Frame>,
    severed: bool,
}

impl SubscriberSlot {
    fn accepts(&self, topic: &[u8]) -> bool {
        self.topics.iter().any(|prefix| topic.starts_with(prefix))
    }
}

struct BusState {
    online: bool,
    epoch: u64,
    next_id: u64,
    connect_attempts: u64,
    subscribers: HashMap<u64, SubscriberSlot>,
    published: Vec<Frame>,
}

struct BusShared {
    state: Mutex<BusState>,
    arrivals: Condvar,
}

/// Handle to an in-process bus; clones share the same bus
#[derive(Clone)]
pub struct MemoryBus {
    shared: Arc<BusShared>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    /// A new bus, online and empty
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BusShared {
                state: Mutex::new(BusState {
                    online: true,
                    epoch: 0,
                    next_id: 0,
                    connect_attempts: 0,
                    subscribers: HashMap::new(),
                    published: Vec::new(),
                }),
                arrivals: Condvar::new(),
            }),
        }
    }

    pub fn subscriber(&self) -> MemorySub {
        MemorySub {
            bus: self.clone(),
            id: Mutex::new(None),
        }
    }

    pub fn publisher(&self) -> MemoryPub {
        MemoryPub {
            bus: self.clone(),
            epoch: Mutex::new(None),
        }
    }

    /// Bring the bus up or down; going down severs every live connection
    pub fn set_online(&self, online: bool) {
        let mut state = self.shared.state.lock();
        state.online = online;
        if !online {
            Self::sever_locked(&mut state);
        }
        drop(state);
        self.shared.arrivals.notify_all();
    }

    /// Drop every live connection while staying online
    pub fn sever_connections(&self) {
        Self::sever_locked(&mut self.shared.state.lock());
        self.shared.arrivals.notify_all();
    }

    fn sever_locked(state: &mut BusState) {
        state.epoch += 1;
        for slot in state.subscribers.values_mut() {
            slot.severed = true;
            slot.queue.clear();
        }
    }

    /// Deliver a message to every connected subscriber whose topics match
    ///
    /// Returns the number of subscribers that received it.
    pub fn inject(&self, topic: &[u8], data: &[u8]) -> usize {
        self.inject_all(&[(topic, data)])
    }

    /// Deliver several messages under one lock, so each subscriber has all of
    /// them queued before it can read the first
    ///
    /// Returns the total number of deliveries.
    pub fn inject_all(&self, messages: &[(&[u8], &[u8])]) -> usize {
        let mut state = self.shared.state.lock();
        if !state.online {
            return 0;
        }
        let mut delivered = 0;
        for (topic, data) in messages {
            for slot in state.subscribers.values_mut() {
                if !slot.severed && slot.accepts(topic) {
                    slot.queue.push_back((topic.to_vec(), data.to_vec()));
                    delivered += 1;
                }
            }
        }
        drop(state);
        self.shared.arrivals.notify_all();
        delivered
    }

    /// Messages published onto the bus so far, oldest first
    pub fn published(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.shared.state.lock().published.clone()
    }

    /// Drain and return everything published so far
    pub fn take_published(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        std::mem::take(&mut self.shared.state.lock().published)
    }

    /// Subscribers currently connected (severed ones excluded)
    pub fn connected_subscribers(&self) -> usize {
        self.shared
            .state
            .lock()
            .subscribers
            .values()
            .filter(|slot| !slot.severed)
            .count()
    }

    /// Subscribers currently connected that would receive `topic`
    pub fn subscribers_for(&self, topic: &[u8]) -> usize {
        self.shared
            .state
            .lock()
            .subscribers
            .values()
            .filter(|slot| !slot.severed && slot.accepts(topic))
            .count()
    }

    /// Every `start()` call made by a subscriber or publisher, successful or not
    pub fn connect_attempts(&self) -> u64 {
        self.shared.state.lock().connect_attempts
    }

    /// Block until `predicate` holds or `timeout` passes; returns the final result
    pub fn wait_until<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&MemoryBus) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn connect(&self) -> TransportResult<u64> {
        let mut state = self.shared.state.lock();
        state.connect_attempts += 1;
        if !state.online {
            return Err(TransportError::ConnectFailed("bus offline".to_string()));
        }
        Ok(state.epoch)
    }
}

/// Subscriber end of a [`MemoryBus`]
pub struct MemorySub {
    bus: MemoryBus,
    id: Mutex<Option<u64>>,
}

impl Transport for MemorySub {
    fn start(&mut self) -> TransportResult<()> {
        if self.id.lock().is_some() {
            return Err(TransportError::AlreadyRunning);
        }
        self.bus.connect()?;

        let mut state = self.bus.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(id, SubscriberSlot::default());
        *self.id.lock() = Some(id);
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        if let Some(id) = self.id.lock().take() {
            self.bus.shared.state.lock().subscribers.remove(&id);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.id.lock().is_some()
    }

    fn transport_type(&self) -> &str {
        "memory-sub"
    }
}

impl Subscriber for MemorySub {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let id = (*self.id.lock()).ok_or(TransportError::NotRunning)?;
        let mut state = self.bus.shared.state.lock();
        let slot = state
            .subscribers
            .get_mut(&id)
            .ok_or(TransportError::ConnectionClosed)?;
        if slot.severed {
            return Err(TransportError::ConnectionClosed);
        }
        slot.topics.push(topic.to_vec());
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let id = (*self.id.lock()).ok_or(TransportError::NotRunning)?;
        let mut state = self.bus.shared.state.lock();
        if let Some(slot) = state.subscribers.get_mut(&id) {
            slot.topics.retain(|t| t.as_slice() != topic);
        }
        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        let id = (*self.id.lock()).ok_or(TransportError::NotRunning)?;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        let mut state = self.bus.shared.state.lock();
        loop {
            let slot = state
                .subscribers
                .get_mut(&id)
                .ok_or(TransportError::ConnectionClosed)?;
            if slot.severed {
                return Err(TransportError::ConnectionClosed);
            }
            if let Some(frame) = slot.queue.pop_front() {
                return Ok(frame);
            }
            if self
                .bus
                .shared
                .arrivals
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Err(TransportError::Timeout);
            }
        }
    }
}

impl Drop for MemorySub {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Publisher end of a [`MemoryBus`]
pub struct MemoryPub {
    bus: MemoryBus,
    epoch: Mutex<Option<u64>>,
}

impl Transport for MemoryPub {
    fn start(&mut self) -> TransportResult<()> {
        if self.epoch.lock().is_some() {
            return Err(TransportError::AlreadyRunning);
        }
        let epoch = self.bus.connect()?;
        *self.epoch.lock() = Some(epoch);
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        *self.epoch.lock() = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.epoch.lock().is_some()
    }

    fn transport_type(&self) -> &str {
        "memory-pub"
    }
}

impl Publisher for MemoryPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        let epoch = (*self.epoch.lock()).ok_or(TransportError::NotRunning)?;
        let mut state = self.bus.shared.state.lock();
        if !state.online || state.epoch != epoch {
            return Err(TransportError::SendFailed("connection severed".to_string()));
        }
        state.published.push((topic.to_vec(), data.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_respects_topics() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscriber();
        sub.start().unwrap();
        sub.subscribe(b"SET_").unwrap();

        assert_eq!(bus.inject(b"SET_START", b"{}"), 1);
        assert_eq!(bus.inject(b"OTHER", b"{}"), 0);

        let (topic, _) = sub.receive_timeout(10).unwrap();
        assert_eq!(topic, b"SET_START");
        assert!(matches!(sub.receive_timeout(10), Err(TransportError::Timeout)));
    }

    #[test]
    fn test_no_queueing_for_disconnected_subscribers() {
        let bus = MemoryBus::new();
        assert_eq!(bus.inject(b"SET_START", b"{}"), 0);

        let mut sub = bus.subscriber();
        sub.start().unwrap();
        sub.subscribe(b"").unwrap();
        assert!(matches!(sub.receive_timeout(10), Err(TransportError::Timeout)));
    }

    #[test]
    fn test_inject_all_queues_in_order() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscriber();
        sub.start().unwrap();
        sub.subscribe(b"").unwrap();

        let batch: [(&[u8], &[u8]); 2] = [(b"EXIT", b"{}"), (b"SET_START", b"{}")];
        assert_eq!(bus.inject_all(&batch), 2);
        assert_eq!(sub.receive_timeout(10).unwrap().0, b"EXIT");
        assert_eq!(sub.receive_timeout(10).unwrap().0, b"SET_START");
    }

    #[test]
    fn test_offline_bus_refuses_connections() {
        let bus = MemoryBus::new();
        bus.set_online(false);

        let mut sub = bus.subscriber();
        assert!(matches!(sub.start(), Err(TransportError::ConnectFailed(_))));
        assert_eq!(bus.connect_attempts(), 1);
    }

    #[test]
    fn test_sever_breaks_both_ends() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscriber();
        let mut publisher = bus.publisher();
        sub.start().unwrap();
        sub.subscribe(b"").unwrap();
        publisher.start().unwrap();

        bus.sever_connections();

        assert!(matches!(sub.receive_timeout(10), Err(TransportError::ConnectionClosed)));
        assert!(matches!(
            publisher.publish(b"t", b"d"),
            Err(TransportError::SendFailed(_))
        ));
        assert_eq!(bus.connected_subscribers(), 0);
    }

    #[test]
    fn test_publish_recorded_in_order() {
        let bus = MemoryBus::new();
        let mut publisher = bus.publisher();
        publisher.start().unwrap();
        publisher.publish(b"a", b"1").unwrap();
        publisher.publish(b"b", b"2").unwrap();

        let topics: Vec<Vec<u8>> = bus.take_published().into_iter().map(|(t, _)| t).collect();
        assert_eq!(topics, vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(bus.published().is_empty());
    }
}
