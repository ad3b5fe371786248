// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process loopback transport.

use parking_lot::{Mutex, RwLock};

use crate::error::ProtocolError;

use super::{MessageHandler, Transport};

/// Transport that keeps everything in memory.
///
/// Published messages are recorded in order; [`deliver`](Self::deliver)
/// hands a message to the subscribed handler as if it came from a broker.
/// Filters are recorded but not applied.
///
/// # Examples
///
/// ```
/// use tasmota_fleet::protocol::{MemoryTransport, Transport};
///
/// let transport = MemoryTransport::new();
/// transport.publish("cmnd/lamp1/Power", b"ON").unwrap();
/// assert_eq!(transport.published_topics(), vec!["cmnd/lamp1/Power".to_string()]);
/// ```
#[derive(Default)]
pub struct MemoryTransport {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    filters: Mutex<Vec<String>>,
    handler: RwLock<Option<MessageHandler>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an inbound message to the subscribed handler.
    ///
    /// Returns `false` if nothing is subscribed.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                handler(topic, payload);
                true
            }
            None => false,
        }
    }

    /// Returns every published message in order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    /// Returns the topics of every published message in order.
    #[must_use]
    pub fn published_topics(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Forgets all recorded publishes.
    pub fn clear(&self) {
        self.published.lock().clear();
    }

    /// Returns the filters passed to [`Transport::subscribe`].
    #[must_use]
    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().clone()
    }
}

impl Transport for MemoryTransport {
    fn subscribe(&self, filters: &[String], handler: MessageHandler) -> Result<(), ProtocolError> {
        self.filters.lock().extend_from_slice(filters);
        *self.handler.write() = Some(handler);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), ProtocolError> {
        self.published
            .lock()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("published", &self.published.lock().len())
            .field("filters", &self.filters.lock())
            .field("subscribed", &self.handler.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn deliver_without_subscriber() {
        let transport = MemoryTransport::new();
        assert!(!transport.deliver("tele/lamp1/LWT", b"Online"));
    }

    #[test]
    fn deliver_reaches_handler() {
        let transport = MemoryTransport::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        transport
            .subscribe(
                &["tele/#".to_string()],
                Arc::new(move |topic, payload| {
                    assert_eq!(topic, "tele/lamp1/LWT");
                    assert_eq!(payload, b"Online");
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(transport.deliver("tele/lamp1/LWT", b"Online"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(transport.filters(), vec!["tele/#".to_string()]);
    }

    #[test]
    fn publish_records_in_order() {
        let transport = MemoryTransport::new();
        transport.publish("a", b"1").unwrap();
        transport.publish("b", b"").unwrap();
        assert_eq!(
            transport.published(),
            vec![("a".to_string(), b"1".to_vec()), ("b".to_string(), Vec::new())]
        );
        transport.clear();
        assert!(transport.published().is_empty());
    }
}
