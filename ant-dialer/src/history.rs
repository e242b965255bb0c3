// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::node::NodeId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

/// A node id that was dialed recently, with the instant its cooldown ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PastDial {
    pub id: NodeId,
    pub exp: Instant,
}

impl Ord for PastDial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.exp.cmp(&other.exp).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for PastDial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Recently dialed node ids, ordered by cooldown expiry.
///
/// A min-heap keyed by expiration. Membership and removal scan linearly;
/// the history stays small because entries only live for the cooldown
/// window, so the scan beats maintaining a parallel index.
#[derive(Debug, Default)]
pub struct DialHistory {
    heap: BinaryHeap<Reverse<PastDial>>,
}

impl DialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dial. Duplicate ids are allowed; the entry expiring last
    /// effectively wins because membership holds until every entry for
    /// the id has expired.
    pub fn add(&mut self, id: NodeId, exp: Instant) {
        self.heap.push(Reverse(PastDial { id, exp }));
    }

    /// Removes one entry for `id`, if present. Returns whether an entry
    /// was removed.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let found = entries.iter().position(|Reverse(past)| past.id == *id);
        if let Some(index) = found {
            let _ = entries.swap_remove(index);
        }
        self.heap = entries.into();
        found.is_some()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.heap.iter().any(|Reverse(past)| past.id == *id)
    }

    /// Drops every entry whose cooldown ended before `now`.
    pub fn expire(&mut self, now: Instant) {
        while let Some(Reverse(past)) = self.heap.peek() {
            if past.exp >= now {
                break;
            }
            let _ = self.heap.pop();
        }
    }

    /// The entry expiring soonest.
    pub fn min(&self) -> Option<PastDial> {
        self.heap.peek().map(|Reverse(past)| *past)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
