// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands published to a device when it is discovered or comes online.

/// Command name and payload pairs of the initial query burst.
///
/// An empty payload queries the current value.
pub const INITIAL_COMMANDS: [(&str, &str); 27] = [
    ("status", "0"),
    ("template", ""),
    ("modules", ""),
    ("gpio", ""),
    ("gpios", "255"),
    ("buttondebounce", ""),
    ("switchdebounce", ""),
    ("interlock", ""),
    ("blinktime", ""),
    ("blinkcount", ""),
    ("mqttlog", ""),
    ("pulsetime1", ""),
    ("pulsetime2", ""),
    ("pulsetime3", ""),
    ("pulsetime4", ""),
    ("pulsetime5", ""),
    ("pulsetime6", ""),
    ("pulsetime7", ""),
    ("pulsetime8", ""),
    ("shutterrelay1", ""),
    ("shutterrelay2", ""),
    ("shutterrelay3", ""),
    ("shutterrelay4", ""),
    ("shutterposition1", ""),
    ("shutterposition2", ""),
    ("shutterposition3", ""),
    ("shutterposition4", ""),
];
