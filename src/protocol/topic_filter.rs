// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic filter matching.

/// Returns `true` if `topic` matches the subscription `filter`.
///
/// `+` matches exactly one level, `#` matches the parent level and any
/// number of child levels and must be the last level. Filters starting with
/// a wildcard never match topics starting with `$`. Malformed filters match
/// nothing.
///
/// # Examples
///
/// ```
/// use smartpanel::protocol::topic_matches;
///
/// assert!(topic_matches("shellies/fan/relay/0/#", "shellies/fan/relay/0"));
/// assert!(topic_matches("shellies/fan/relay/0/#", "shellies/fan/relay/0/power"));
/// assert!(topic_matches("home/+/LWT", "home/desk/LWT"));
/// assert!(!topic_matches("home/+/LWT", "home/desk/lamp/LWT"));
/// ```
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if filter.is_empty() || topic.is_empty() {
        return false;
    }
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/').peekable();
    let mut topic_levels = topic.split('/');

    while let Some(level) = filter_levels.next() {
        match level {
            "#" => return filter_levels.peek().is_none(),
            "+" => {
                if topic_levels.next().is_none() {
                    return false;
                }
            }
            literal => {
                if literal.contains(['+', '#']) {
                    return false;
                }
                if topic_levels.next() != Some(literal) {
                    return false;
                }
            }
        }
    }

    topic_levels.next().is_none()
}
