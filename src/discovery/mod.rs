// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery of devices from their last-will messages.
//!
//! Tasmota devices do not announce their topic layout, so an unknown device
//! is bootstrapped in three steps:
//!
//! ```text
//! tele/lamp1/LWT "Online"          (no device matches)
//!     ↓ on_unmatched_lwt: guess the topic with every configured template
//! cmnd/lamp1/FullTopic ""           (one probe per matching template)
//!     ↓ device answers
//! stat/lamp1/RESULT {"FullTopic":"%prefix%/%topic%/"}
//!     ↓ on_reply: parse the reply topic with the declared template
//! lamp1 registered, persisted, queried, marked Online
//! ```
//!
//! A topic whose probe is never answered stays pending; there is no timeout.
//! Repeated last-will messages probe again.

mod pending;

pub use pending::PendingLwts;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::CommandPublisher;
use crate::device::{
    Device, DeviceId, DeviceRecord, ENDPOINT_FULL_TOPIC, ENDPOINT_LWT, EndpointValue, LWT_OFFLINE,
    LWT_ONLINE,
};
use crate::event::{DeviceEvent, EventBus};
use crate::pattern::{ProbeMatcher, TopicTemplate};
use crate::registry::DeviceRegistry;
use crate::router::{FullTopicReply, Payload};
use crate::store::DeviceStore;

/// Prefix of telemetry topics, including last-will.
pub(crate) const TELEMETRY_PREFIX: &str = "tele";

/// Captures that name a channel rather than a device.
const RESERVED_TOPICS: [&str; 2] = ["tele", "stat"];

/// Outcome of a `FullTopic` reply that identified a device.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The device was unknown and has been registered.
    Discovered(Arc<Device>),
    /// The device declared a new template, which was persisted.
    Updated(Arc<Device>),
    /// The device repeated its current template.
    Unchanged(Arc<Device>),
}

impl Resolution {
    /// Returns the resolved device.
    #[must_use]
    pub fn device(&self) -> &Arc<Device> {
        match self {
            Self::Discovered(device) | Self::Updated(device) | Self::Unchanged(device) => device,
        }
    }
}

/// Outcome of a last-will message that matched no device on arrival.
#[derive(Debug, Clone)]
pub enum UnmatchedLwt {
    /// The topic is pending; carries the number of `FullTopic` queries sent.
    Probed(usize),
    /// The device was registered before the message was handled.
    Registered(Arc<Device>),
}

/// Turns unknown last-will topics into registered devices.
pub struct DiscoveryEngine {
    probes: Vec<ProbeMatcher>,
    registry: Arc<DeviceRegistry>,
    store: Arc<dyn DeviceStore>,
    publisher: CommandPublisher,
    events: EventBus,
    pending: PendingLwts,
    /// Held across lookup, persistence and insertion of a reply so duplicate
    /// replies resolve once.
    resolving: Mutex<()>,
}

impl DiscoveryEngine {
    /// Creates an engine probing with `patterns`.
    ///
    /// Templates that do not compile are logged and skipped.
    #[must_use]
    pub fn new(
        patterns: &[TopicTemplate],
        registry: Arc<DeviceRegistry>,
        store: Arc<dyn DeviceStore>,
        publisher: CommandPublisher,
        events: EventBus,
    ) -> Self {
        let probes = patterns
            .iter()
            .filter_map(|template| match template.compile_probe() {
                Ok(probe) => Some(probe),
                Err(e) => {
                    tracing::warn!(
                        full_topic = %template,
                        error = %e,
                        "Discovery template rejected"
                    );
                    None
                }
            })
            .collect();

        Self {
            probes,
            registry,
            store,
            publisher,
            events,
            pending: PendingLwts::default(),
            resolving: Mutex::new(()),
        }
    }

    /// Returns the templates used for probing.
    pub fn patterns(&self) -> impl Iterator<Item = &TopicTemplate> {
        self.probes.iter().map(ProbeMatcher::template)
    }

    /// Returns the last-will topics still waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> &PendingLwts {
        &self.pending
    }

    /// Handles a last-will message no registered device matched on arrival.
    ///
    /// The registry is checked again under the resolution lock: if a reply
    /// registered the device in the meantime, the last-will is applied to it
    /// as liveness. Otherwise the topic becomes pending and a `FullTopic`
    /// query is published for every template that yields a plausible device
    /// topic.
    pub fn on_unmatched_lwt(&self, topic: &str, payload: &Payload) -> UnmatchedLwt {
        let registered = {
            let _guard = self.resolving.lock();
            let registered = self.registry.find_by_topic(topic).map(|(device, _)| device);
            if registered.is_none() && self.pending.insert(topic) {
                tracing::info!(topic = %topic, "Last-will from an unknown device");
            }
            registered
        };

        if let Some(device) = registered {
            tracing::debug!(
                topic = %topic,
                device = %device.id(),
                "Last-will of a device resolved meanwhile"
            );
            self.on_device_lwt(&device, payload);
            return UnmatchedLwt::Registered(device);
        }

        let mut sent = 0;
        for probe in &self.probes {
            let Some(guess) = probe.parse(topic) else {
                continue;
            };
            if guess.topic.is_empty() || RESERVED_TOPICS.contains(&guess.topic.as_str()) {
                tracing::trace!(
                    topic = %topic,
                    full_topic = %probe.template(),
                    capture = %guess.topic,
                    "Probe suppressed"
                );
                continue;
            }
            self.publisher.probe_full_topic(probe.template(), &guess.topic);
            sent += 1;
        }
        UnmatchedLwt::Probed(sent)
    }

    /// Handles a `FullTopic` reply that arrived on `topic`.
    ///
    /// The declared template is used to recover the device identifier from
    /// the topic it arrived on. Returns `None` if that fails or if
    /// persistence fails.
    pub fn on_reply(&self, topic: &str, reply: &FullTopicReply) -> Option<Resolution> {
        let matcher = match reply.full_topic.compile() {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::debug!(
                    topic = %topic,
                    full_topic = %reply.full_topic,
                    error = %e,
                    "Declared template rejected"
                );
                return None;
            }
        };
        let Some(parsed) = matcher.parse(topic) else {
            tracing::debug!(
                topic = %topic,
                full_topic = %reply.full_topic,
                "Reply topic does not fit its declared template"
            );
            return None;
        };

        tracing::info!(
            topic = %topic,
            full_topic = %reply.full_topic,
            device = %parsed.topic,
            "Reply matched by its FullTopic"
        );

        let _guard = self.resolving.lock();
        match self.registry.find_by_id(&parsed.topic) {
            Some(device) => self.refresh(device, &reply.full_topic),
            None => self.register(DeviceId::new(parsed.topic), reply.full_topic.clone()),
        }
    }

    /// Handles a last-will message of a registered device.
    ///
    /// An empty payload counts as `Offline`. Every `Online` triggers the
    /// initial query; an event is emitted only when the value changes.
    pub fn on_device_lwt(&self, device: &Device, payload: &Payload) {
        let lwt = if payload.is_empty() {
            LWT_OFFLINE
        } else {
            payload.raw()
        };

        let previous = device.endpoints().set(ENDPOINT_LWT, lwt);
        tracing::debug!(device = %device.id(), lwt = %lwt, "Device last-will");

        if lwt == LWT_ONLINE {
            self.publisher.initial_query(device);
        }

        if previous.as_ref().and_then(EndpointValue::as_text) != Some(lwt) {
            self.events
                .publish(DeviceEvent::liveness_changed(device.id().clone(), lwt));
        }
    }

    fn refresh(&self, device: Arc<Device>, full_topic: &TopicTemplate) -> Option<Resolution> {
        if device.full_topic() == *full_topic {
            device
                .endpoints()
                .set(ENDPOINT_FULL_TOPIC, full_topic.as_str());
            return Some(Resolution::Unchanged(device));
        }

        let record = DeviceRecord::new(device.id().clone(), full_topic.clone());
        if let Err(e) = self.store.save(&record) {
            tracing::warn!(
                device = %device.id(),
                full_topic = %full_topic,
                error = %e,
                "Failed to persist new template"
            );
            return None;
        }

        self.registry.update(device.id().as_str(), full_topic.clone());
        device
            .endpoints()
            .set(ENDPOINT_FULL_TOPIC, full_topic.as_str());
        tracing::info!(device = %device.id(), full_topic = %full_topic, "Device template changed");
        self.events.publish(DeviceEvent::full_topic_changed(
            device.id().clone(),
            full_topic.clone(),
        ));
        Some(Resolution::Updated(device))
    }

    fn register(&self, id: DeviceId, full_topic: TopicTemplate) -> Option<Resolution> {
        let record = DeviceRecord::new(id, full_topic);
        if let Err(e) = self.store.save(&record) {
            tracing::warn!(
                device = %record.id,
                full_topic = %record.full_topic,
                error = %e,
                "Failed to persist discovered device"
            );
            return None;
        }

        let Some(device) = self.registry.insert(record.clone()) else {
            // Registered outside discovery since the lookup.
            return self
                .registry
                .find_by_id(record.id.as_str())
                .map(Resolution::Unchanged);
        };

        tracing::info!(device = %device.id(), full_topic = %record.full_topic, "Discovered device");
        self.publisher.initial_query(&device);

        let lwt_topic = device.topic_for(TELEMETRY_PREFIX, Some(ENDPOINT_LWT));
        self.pending.remove(&lwt_topic);
        device.endpoints().set(ENDPOINT_LWT, LWT_ONLINE);
        device
            .endpoints()
            .set(ENDPOINT_FULL_TOPIC, record.full_topic.as_str());

        self.events
            .publish(DeviceEvent::discovered(record.id, record.full_topic));
        Some(Resolution::Discovered(device))
    }
}

impl std::fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::INITIAL_COMMANDS;
    use crate::error::StoreError;
    use crate::protocol::MemoryTransport;
    use crate::store::MemoryStore;

    struct Fixture {
        transport: Arc<MemoryTransport>,
        store: Arc<MemoryStore>,
        registry: Arc<DeviceRegistry>,
        events: EventBus,
        engine: DiscoveryEngine,
    }

    fn fixture(patterns: &[&str]) -> Fixture {
        let transport = Arc::new(MemoryTransport::new());
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(DeviceRegistry::new());
        let events = EventBus::new();
        let patterns: Vec<_> = patterns.iter().copied().map(TopicTemplate::new).collect();
        let engine = DiscoveryEngine::new(
            &patterns,
            Arc::clone(&registry),
            store.clone(),
            CommandPublisher::new(transport.clone()),
            events.clone(),
        );
        Fixture {
            transport,
            store,
            registry,
            events,
            engine,
        }
    }

    fn online() -> Payload {
        Payload::new(LWT_ONLINE)
    }

    fn reply(template: &str) -> FullTopicReply {
        FullTopicReply {
            full_topic: TopicTemplate::new(template),
        }
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let f = fixture(&["%prefix%/%topic%/", "%prefix%/nothing/", "%topic%/%topic%/"]);
        assert_eq!(f.engine.patterns().count(), 1);
    }

    #[test]
    fn unmatched_lwt_probes_each_plausible_template() {
        let f = fixture(&["%prefix%/%topic%/", "%topic%/%prefix%/"]);

        let outcome = f.engine.on_unmatched_lwt("tele/lamp1/LWT", &online());

        // The reversed layout captures "tele", which is suppressed.
        assert!(matches!(outcome, UnmatchedLwt::Probed(1)));
        assert_eq!(
            f.transport.published(),
            vec![("cmnd/lamp1/FullTopic".to_string(), Vec::new())]
        );
        assert!(f.engine.pending().contains("tele/lamp1/LWT"));
    }

    #[test]
    fn reversed_layout_probe() {
        let f = fixture(&["%prefix%/%topic%/", "%topic%/%prefix%/"]);

        f.engine.on_unmatched_lwt("plug/tele/LWT", &online());

        let topics = f.transport.published_topics();
        assert!(topics.contains(&"plug/cmnd/FullTopic".to_string()));
    }

    #[test]
    fn reserved_capture_suppresses_probe() {
        let f = fixture(&["%topic%/%prefix%/"]);

        assert!(matches!(
            f.engine.on_unmatched_lwt("stat/x/LWT", &online()),
            UnmatchedLwt::Probed(0)
        ));
        assert!(matches!(
            f.engine.on_unmatched_lwt("tele/x/LWT", &online()),
            UnmatchedLwt::Probed(0)
        ));
        assert!(f.transport.published().is_empty());
        assert_eq!(f.engine.pending().len(), 2);
    }

    #[test]
    fn repeated_lwt_probes_again() {
        let f = fixture(&["%prefix%/%topic%/"]);
        f.engine.on_unmatched_lwt("tele/lamp1/LWT", &online());
        f.engine.on_unmatched_lwt("tele/lamp1/LWT", &online());
        assert_eq!(f.transport.published().len(), 2);
        assert_eq!(f.engine.pending().len(), 1);
    }

    #[test]
    fn lwt_after_registration_is_applied_as_liveness() {
        let f = fixture(&["%prefix%/%topic%/"]);
        f.engine
            .on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"))
            .unwrap();
        f.transport.clear();
        let mut rx = f.events.subscribe();

        // Missed the registry before the reply was resolved.
        let outcome = f
            .engine
            .on_unmatched_lwt("tele/lamp1/LWT", &Payload::new(LWT_OFFLINE));

        assert!(matches!(outcome, UnmatchedLwt::Registered(ref d) if d.id() == "lamp1"));
        assert!(f.engine.pending().is_empty());
        assert!(f.transport.published().is_empty());
        let device = f.registry.find_by_id("lamp1").unwrap();
        assert_eq!(device.liveness().as_deref(), Some(LWT_OFFLINE));
        assert!(rx.try_recv().unwrap().is_liveness());
    }

    #[test]
    fn reply_registers_unknown_device() {
        let f = fixture(&["%prefix%/%topic%/"]);
        let mut rx = f.events.subscribe();
        f.engine.on_unmatched_lwt("tele/lamp1/LWT", &online());
        f.transport.clear();

        let resolution = f
            .engine
            .on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"))
            .unwrap();

        assert!(matches!(resolution, Resolution::Discovered(_)));
        let device = resolution.device();
        assert_eq!(device.id(), "lamp1");
        assert!(device.is_online());
        assert_eq!(f.store.save_count(), 1);
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.transport.published().len(), INITIAL_COMMANDS.len());
        assert!(f.engine.pending().is_empty());
        assert!(rx.try_recv().unwrap().is_lifecycle());
    }

    #[test]
    fn duplicate_reply_saves_once() {
        let f = fixture(&["%prefix%/%topic%/"]);

        let first = f.engine.on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"));
        let second = f.engine.on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"));

        assert!(matches!(first, Some(Resolution::Discovered(_))));
        assert!(matches!(second, Some(Resolution::Unchanged(_))));
        assert_eq!(f.store.save_count(), 1);
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn concurrent_duplicate_replies_save_once() {
        let f = Arc::new(fixture(&["%prefix%/%topic%/"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let f = Arc::clone(&f);
                std::thread::spawn(move || {
                    f.engine
                        .on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(f.store.save_count(), 1);
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.transport.published().len(), INITIAL_COMMANDS.len());
    }

    #[test]
    fn changed_template_is_persisted_once() {
        let f = fixture(&["%prefix%/%topic%/"]);
        f.engine
            .on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"))
            .unwrap();

        let updated = f
            .engine
            .on_reply("lamp1/stat/RESULT", &reply("%topic%/%prefix%/"))
            .unwrap();
        let repeated = f
            .engine
            .on_reply("lamp1/stat/RESULT", &reply("%topic%/%prefix%/"))
            .unwrap();

        assert!(matches!(updated, Resolution::Updated(_)));
        assert!(matches!(repeated, Resolution::Unchanged(_)));
        assert_eq!(f.store.save_count(), 2);
        assert_eq!(
            f.store.get("lamp1").unwrap().unwrap().full_topic.as_str(),
            "%topic%/%prefix%/"
        );
        assert!(f.registry.find_by_topic("lamp1/tele/STATE").is_some());
    }

    #[test]
    fn reply_on_foreign_layout_is_ignored() {
        let f = fixture(&["%prefix%/%topic%/"]);
        assert!(
            f.engine
                .on_reply("stat/lamp1/RESULT", &reply("home/%prefix%/%topic%/"))
                .is_none()
        );
        assert!(
            f.engine
                .on_reply("stat/lamp1/RESULT", &reply("%prefix%/fixed/"))
                .is_none()
        );
        assert_eq!(f.store.save_count(), 0);
    }

    struct FailingStore;

    impl DeviceStore for FailingStore {
        fn save(&self, _: &DeviceRecord) -> Result<DeviceRecord, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn find_all(&self) -> Result<Vec<DeviceRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn persistence_failure_abandons_discovery() {
        let transport = Arc::new(MemoryTransport::new());
        let registry = Arc::new(DeviceRegistry::new());
        let engine = DiscoveryEngine::new(
            &TopicTemplate::defaults(),
            Arc::clone(&registry),
            Arc::new(FailingStore),
            CommandPublisher::new(transport.clone()),
            EventBus::new(),
        );

        assert!(
            engine
                .on_reply("stat/lamp1/RESULT", &reply("%prefix%/%topic%/"))
                .is_none()
        );
        assert!(registry.is_empty());
        assert!(transport.published().is_empty());
    }

    #[test]
    fn device_lwt_online_queries_offline_does_not() {
        let f = fixture(&["%prefix%/%topic%/"]);
        let device = f
            .registry
            .insert(DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();

        f.engine.on_device_lwt(&device, &Payload::new("Offline"));
        assert!(f.transport.published().is_empty());
        assert_eq!(device.liveness().as_deref(), Some("Offline"));

        f.engine.on_device_lwt(&device, &Payload::new("Online"));
        assert_eq!(f.transport.published().len(), INITIAL_COMMANDS.len());
        assert!(device.is_online());
    }

    #[test]
    fn empty_lwt_means_offline() {
        let f = fixture(&["%prefix%/%topic%/"]);
        let device = f
            .registry
            .insert(DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();

        f.engine.on_device_lwt(&device, &Payload::new(""));
        assert_eq!(device.liveness().as_deref(), Some(LWT_OFFLINE));
    }

    #[test]
    fn liveness_event_only_on_change() {
        let f = fixture(&["%prefix%/%topic%/"]);
        let mut rx = f.events.subscribe();
        let device = f
            .registry
            .insert(DeviceRecord::new("lamp1", "%prefix%/%topic%/"))
            .unwrap();

        f.engine.on_device_lwt(&device, &Payload::new("Online"));
        f.engine.on_device_lwt(&device, &Payload::new("Online"));

        assert!(rx.try_recv().unwrap().is_liveness());
        assert!(rx.try_recv().is_err());
        // Both Online messages still query the device.
        assert_eq!(f.transport.published().len(), 2 * INITIAL_COMMANDS.len());
    }
}
