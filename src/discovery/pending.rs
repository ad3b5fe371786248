// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeSet;

use parking_lot::Mutex;

/// Last-will topics of devices that have not answered a `FullTopic` probe.
///
/// Entries never expire; one stays until its device is resolved or the
/// process restarts.
#[derive(Debug, Default)]
pub struct PendingLwts {
    topics: Mutex<BTreeSet<String>>,
}

impl PendingLwts {
    /// Records a topic; returns `false` if it was already pending.
    pub fn insert(&self, topic: &str) -> bool {
        self.topics.lock().insert(topic.to_string())
    }

    /// Forgets a topic; returns `true` if it was pending.
    pub fn remove(&self, topic: &str) -> bool {
        self.topics.lock().remove(topic)
    }

    /// Returns `true` if the topic is pending.
    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.lock().contains(topic)
    }

    /// Returns the pending topics in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.topics.lock().iter().cloned().collect()
    }

    /// Returns the number of pending topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.lock().is_empty()
    }
}
