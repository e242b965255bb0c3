// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::config::DialerConfig;
use crate::history::DialHistory;
use crate::netlist::NetRestrict;
use crate::node::{ConnFlags, Node, NodeId, PeerFlags};
use crate::server::DiscoverTable;
use crate::task::{DialTask, DiscoverTask, Task, WaitExpireTask};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooldown applied to a node id after every dial attempt, successful or
/// not. Also keeps a freshly dropped peer from being redialed immediately.
pub const DIAL_HISTORY_EXPIRATION: Duration = Duration::from_secs(30);

/// How long the scheduler waits after startup before it starts dialing the
/// bootstrap list. Gives discovery a chance to produce candidates first.
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(20);

/// Why a dial candidate was turned down. Internal scheduling signal only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DialReject {
    AlreadyDialing,
    AlreadyConnected,
    IsSelf,
    NotWhitelisted,
    RecentlyDialed,
}

/// Plans which nodes to dial and when to refill the candidate pool.
///
/// Owned by the host's server loop: each tick it calls
/// [`new_tasks`](Self::new_tasks), runs the returned tasks concurrently,
/// and hands each one back through [`task_done`](Self::task_done) when it
/// finishes. The scheduler itself never blocks and needs no locking.
#[derive(custom_debug::Debug)]
pub struct DialScheduler {
    max_dyn_dials: usize,
    self_id: NodeId,
    #[debug(skip)]
    discovery: Option<Arc<dyn DiscoverTable>>,
    net_restrict: Option<NetRestrict>,
    /// One dial task per statically configured node, kept across attempts
    /// so resolution state survives between ticks.
    static_nodes: HashMap<NodeId, DialTask>,
    /// Ids with a dial task currently in flight, with the flags it carries.
    dialing: HashMap<NodeId, ConnFlags>,
    /// Unused candidates from completed discovery lookups.
    lookup_buf: Vec<Node>,
    /// Scratch buffer for reading from the discovery table.
    random_nodes: Vec<Node>,
    /// Rotated round-robin whenever the bootstrap fallback fires.
    bootnodes: Vec<Node>,
    hist: DialHistory,
    lookup_running: bool,
    start: Option<Instant>,
}

impl DialScheduler {
    pub fn new(
        self_id: NodeId,
        config: DialerConfig,
        discovery: Option<Arc<dyn DiscoverTable>>,
    ) -> Self {
        let DialerConfig {
            max_dyn_dials,
            static_nodes,
            bootnodes,
            net_restrict,
        } = config;

        let mut scheduler = Self {
            max_dyn_dials,
            self_id,
            discovery,
            net_restrict,
            static_nodes: HashMap::new(),
            dialing: HashMap::new(),
            lookup_buf: Vec::new(),
            random_nodes: vec![Node::default(); max_dyn_dials / 2],
            bootnodes,
            hist: DialHistory::new(),
            lookup_running: false,
            start: None,
        };
        for node in static_nodes {
            scheduler.add_static(node);
        }
        scheduler
    }

    /// Configures `node` as a static dial target.
    ///
    /// Re-adding a node that is already configured replaces its entry,
    /// which forces a fresh endpoint resolution on the next attempt.
    pub fn add_static(&mut self, node: Node) {
        info!("Adding static node {node}");
        let _ = self
            .static_nodes
            .insert(node.id(), DialTask::new(ConnFlags::STATIC_DIALED, node));
    }

    /// Removes `node` from the static set and clears its dial cooldown, so
    /// the host can force an immediate reconnect cycle.
    pub fn remove_static(&mut self, node: &Node) {
        info!("Removing static node {node}");
        let _ = self.static_nodes.remove(&node.id());
        let _ = self.hist.remove(&node.id());
    }

    pub fn has_static(&self, id: &NodeId) -> bool {
        self.static_nodes.contains_key(id)
    }

    pub fn is_dialing(&self, id: &NodeId) -> bool {
        self.dialing.contains_key(id)
    }

    /// Plans the tasks for one tick of the host loop.
    ///
    /// `n_running` is the number of tasks the host is still executing,
    /// `peers` the currently connected peers, `now` the tick's timestamp.
    pub fn new_tasks<P: PeerFlags>(
        &mut self,
        n_running: usize,
        peers: &HashMap<NodeId, P>,
        now: Instant,
    ) -> Vec<Task> {
        let start = *self.start.get_or_insert(now);
        let mut tasks = Vec::new();

        // Budget for dynamic dials: connected dynamic peers and in-flight
        // dynamic dials both occupy a slot.
        let mut need_dyn = self.max_dyn_dials;
        for peer in peers.values() {
            if peer.is(ConnFlags::DYN_DIALED) {
                need_dyn = need_dyn.saturating_sub(1);
            }
        }
        for flags in self.dialing.values() {
            if flags.intersects(ConnFlags::DYN_DIALED) {
                need_dyn = need_dyn.saturating_sub(1);
            }
        }

        self.hist.expire(now);

        // Static nodes are dialed whenever they are not connected, not in
        // flight and out of cooldown. Candidates that can never be dialed
        // are dropped from the set for good.
        let mut evicted = Vec::new();
        for (id, task) in &self.static_nodes {
            match self.check_dial(task.dest(), peers) {
                Ok(()) => {
                    debug!("Starting static dial to node {}", task.dest());
                    let _ = self.dialing.insert(*id, task.flags());
                    tasks.push(Task::Dial(task.clone()));
                }
                Err(DialReject::IsSelf) | Err(DialReject::NotWhitelisted) => {
                    evicted.push(*id);
                }
                Err(_) => {}
            }
        }
        for id in evicted {
            warn!("Removing undialable static node {id:?}");
            let _ = self.static_nodes.remove(&id);
        }

        // With no peers at all and discovery not delivering, fall back to
        // the bootstrap list, one node per tick, round-robin.
        if peers.is_empty()
            && !self.bootnodes.is_empty()
            && need_dyn > 0
            && now.saturating_duration_since(start) > FALLBACK_INTERVAL
        {
            let bootnode = self.bootnodes[0].clone();
            self.bootnodes.rotate_left(1);
            if self.add_dial(&mut tasks, ConnFlags::DYN_DIALED, &bootnode, peers) {
                need_dyn -= 1;
            }
        }

        // Use up to half of the open slots on nodes straight from the
        // discovery table; the rest is left for lookup results.
        let want = need_dyn / 2;
        if want > 0 {
            if let Some(discovery) = &self.discovery {
                let discovery = Arc::clone(discovery);
                let count = discovery.read_random_nodes(&mut self.random_nodes);
                for node in self.random_nodes[..want.min(count)].to_vec() {
                    if self.add_dial(&mut tasks, ConnFlags::DYN_DIALED, &node, peers) {
                        need_dyn -= 1;
                    }
                }
            }
        }

        // Drain buffered lookup results. Consumed entries are gone whether
        // the dial was added or rejected; rejected candidates are not kept
        // around for a retry.
        let mut consumed = 0;
        while consumed < self.lookup_buf.len() && need_dyn > 0 {
            let node = self.lookup_buf[consumed].clone();
            consumed += 1;
            if self.add_dial(&mut tasks, ConnFlags::DYN_DIALED, &node, peers) {
                need_dyn -= 1;
            }
        }
        let _ = self.lookup_buf.drain(..consumed);

        // Ask for a lookup when the buffer can't cover the remaining
        // slots. At most one lookup runs at a time.
        if self.lookup_buf.len() < need_dyn && !self.lookup_running && self.discovery.is_some() {
            self.lookup_running = true;
            tasks.push(Task::Discover(DiscoverTask::new()));
        }

        // If nothing else is happening, wait for the next history entry to
        // expire so the host loop wakes up when dialing becomes possible
        // again.
        if n_running == 0 && tasks.is_empty() {
            if let Some(min) = self.hist.min() {
                let duration = min.exp.saturating_duration_since(now);
                tasks.push(Task::WaitExpire(WaitExpireTask::new(duration)));
            }
        }

        tasks
    }

    /// Returns a finished task to the scheduler.
    ///
    /// Every completed dial enters the history, whether it succeeded or
    /// not; the cooldown doubles as back-pressure after failures and as a
    /// reconnect damper after drops.
    pub fn task_done(&mut self, task: Task, now: Instant) {
        match task {
            Task::Dial(task) => {
                let id = task.dest().id();
                self.hist.add(id, now + DIAL_HISTORY_EXPIRATION);
                let _ = self.dialing.remove(&id);
                // Keep the resolution state (endpoint, backoff) for nodes
                // that stay statically configured.
                if task.flags().intersects(ConnFlags::STATIC_DIALED) {
                    if let Some(entry) = self.static_nodes.get_mut(&id) {
                        *entry = task;
                    }
                }
            }
            Task::Discover(task) => {
                self.lookup_running = false;
                self.lookup_buf.extend(task.into_results());
            }
            Task::WaitExpire(_) => {}
        }
    }

    fn add_dial<P: PeerFlags>(
        &mut self,
        tasks: &mut Vec<Task>,
        flags: ConnFlags,
        node: &Node,
        peers: &HashMap<NodeId, P>,
    ) -> bool {
        match self.check_dial(node, peers) {
            Ok(()) => {
                debug!("Starting {flags:?} dial to node {node}");
                let _ = self.dialing.insert(node.id(), flags);
                tasks.push(Task::Dial(DialTask::new(flags, node.clone())));
                true
            }
            Err(reason) => {
                debug!("Skipping dial candidate {node}: {reason:?}");
                false
            }
        }
    }

    fn check_dial<P: PeerFlags>(
        &self,
        node: &Node,
        peers: &HashMap<NodeId, P>,
    ) -> Result<(), DialReject> {
        if self.dialing.contains_key(&node.id()) {
            return Err(DialReject::AlreadyDialing);
        }
        if peers.contains_key(&node.id()) {
            return Err(DialReject::AlreadyConnected);
        }
        if node.id() == self.self_id {
            return Err(DialReject::IsSelf);
        }
        if let Some(restrict) = &self.net_restrict {
            let allowed = match node.ip() {
                Some(ip) => restrict.contains(&ip),
                None => false,
            };
            if !allowed {
                return Err(DialReject::NotWhitelisted);
            }
        }
        if self.hist.contains(&node.id()) {
            return Err(DialReject::RecentlyDialed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xor_name::{XorName, XOR_NAME_LEN};

    fn node_id(fill: u8) -> NodeId {
        XorName([fill; XOR_NAME_LEN])
    }

    fn node(fill: u8) -> Node {
        Node::new(node_id(fill), "10.0.0.1".parse().unwrap(), 30000 + u16::from(fill))
    }

    fn scheduler(max_dyn_dials: usize) -> DialScheduler {
        DialScheduler::new(
            node_id(0xee),
            DialerConfig {
                max_dyn_dials,
                ..Default::default()
            },
            None,
        )
    }

    fn no_peers() -> HashMap<NodeId, ConnFlags> {
        HashMap::new()
    }

    #[test]
    fn check_dial_rejects_in_fixed_order() {
        let mut sched = scheduler(4);
        let candidate = node(1);
        let mut peers = no_peers();

        // Mark the candidate as everything at once; the first rule wins.
        let _ = sched.dialing.insert(candidate.id(), ConnFlags::DYN_DIALED);
        let _ = peers.insert(candidate.id(), ConnFlags::INBOUND);
        sched.hist.add(candidate.id(), Instant::now() + DIAL_HISTORY_EXPIRATION);

        assert_eq!(
            sched.check_dial(&candidate, &peers),
            Err(DialReject::AlreadyDialing)
        );

        let _ = sched.dialing.remove(&candidate.id());
        assert_eq!(
            sched.check_dial(&candidate, &peers),
            Err(DialReject::AlreadyConnected)
        );

        let _ = peers.remove(&candidate.id());
        assert_eq!(
            sched.check_dial(&candidate, &peers),
            Err(DialReject::RecentlyDialed)
        );

        let _ = sched.hist.remove(&candidate.id());
        assert_eq!(sched.check_dial(&candidate, &peers), Ok(()));
    }

    #[test]
    fn check_dial_rejects_self_and_unlisted_addresses() {
        let mut sched = scheduler(4);
        sched.net_restrict = Some("10.0.0.0/8".parse().unwrap());
        let peers = no_peers();

        let myself = Node::new(node_id(0xee), "10.0.0.9".parse().unwrap(), 7000);
        assert_eq!(sched.check_dial(&myself, &peers), Err(DialReject::IsSelf));

        let outside = Node::new(node_id(2), "192.0.2.1".parse().unwrap(), 7000);
        assert_eq!(
            sched.check_dial(&outside, &peers),
            Err(DialReject::NotWhitelisted)
        );

        // An unresolved node has no address to check against the list.
        let unresolved = Node::incomplete(node_id(3));
        assert_eq!(
            sched.check_dial(&unresolved, &peers),
            Err(DialReject::NotWhitelisted)
        );

        let inside = node(4);
        assert_eq!(sched.check_dial(&inside, &peers), Ok(()));
    }

    #[test]
    fn dynamic_budget_counts_peers_and_inflight_dials() {
        let mut sched = scheduler(4);
        let now = Instant::now();

        let mut peers = no_peers();
        let _ = peers.insert(node_id(1), ConnFlags::DYN_DIALED);
        let _ = peers.insert(node_id(2), ConnFlags::INBOUND);
        let _ = sched.dialing.insert(node_id(3), ConnFlags::DYN_DIALED);

        // Budget: 4 - 1 connected dynamic - 1 in flight = 2; the buffer
        // holds more candidates than that.
        sched.lookup_buf = (10u8..16).map(node).collect();
        let tasks = sched.new_tasks(0, &peers, now);

        let dials: Vec<_> = tasks
            .iter()
            .filter_map(|task| match task {
                Task::Dial(dial) => Some(dial.dest().id()),
                _ => None,
            })
            .collect();
        assert_eq!(dials.len(), 2);

        let dyn_in_flight = sched
            .dialing
            .values()
            .filter(|flags| flags.intersects(ConnFlags::DYN_DIALED))
            .count();
        let dyn_connected = 1;
        assert!(dyn_in_flight + dyn_connected <= 4);
    }

    #[test]
    fn consumed_lookup_candidates_are_not_retried() {
        let mut sched = scheduler(2);
        let now = Instant::now();
        let busy = node(1);

        // Two candidates; the first is in cooldown and gets discarded.
        sched.hist.add(busy.id(), now + DIAL_HISTORY_EXPIRATION);
        sched.lookup_buf = vec![busy.clone(), node(2)];

        let tasks = sched.new_tasks(1, &no_peers(), now);
        let dials: Vec<_> = tasks
            .iter()
            .filter_map(|task| match task {
                Task::Dial(dial) => Some(dial.dest().id()),
                _ => None,
            })
            .collect();
        assert_eq!(dials, vec![node_id(2)]);
        assert!(sched.lookup_buf.is_empty());
    }

    #[test]
    fn task_done_records_history_and_frees_the_slot() {
        let mut sched = scheduler(2);
        let now = Instant::now();
        sched.lookup_buf = vec![node(1)];

        let mut tasks = sched.new_tasks(1, &no_peers(), now);
        assert!(sched.is_dialing(&node_id(1)));

        let task = tasks.remove(0);
        sched.task_done(task, now);

        assert!(!sched.is_dialing(&node_id(1)));
        assert!(sched.hist.contains(&node_id(1)));
        let min = sched.hist.min().expect("history entry was added");
        assert_eq!(min.exp, now + DIAL_HISTORY_EXPIRATION);
    }

    #[test]
    fn static_nodes_survive_temporary_rejections() {
        let mut sched = scheduler(2);
        let target = node(1);
        sched.add_static(target.clone());
        let now = Instant::now();

        // While connected the static node is skipped but stays configured.
        let mut peers = no_peers();
        let _ = peers.insert(target.id(), ConnFlags::STATIC_DIALED);
        let tasks = sched.new_tasks(1, &peers, now);
        assert!(tasks.iter().all(|task| !matches!(task, Task::Dial(_))));
        assert!(sched.has_static(&target.id()));

        // Once the peer is gone the node is dialed again.
        let tasks = sched.new_tasks(1, &no_peers(), now);
        assert!(tasks.iter().any(|task| matches!(
            task,
            Task::Dial(dial) if dial.dest().id() == target.id()
        )));
    }

    #[test]
    fn self_static_node_is_evicted_permanently() {
        let mut sched = scheduler(2);
        let myself = Node::new(node_id(0xee), "10.0.0.5".parse().unwrap(), 9000);
        sched.add_static(myself.clone());

        let tasks = sched.new_tasks(1, &no_peers(), Instant::now());

        assert!(tasks.iter().all(|task| !matches!(task, Task::Dial(_))));
        assert!(!sched.has_static(&myself.id()));
    }

    #[test]
    fn remove_static_clears_the_cooldown() {
        let mut sched = scheduler(2);
        let target = node(1);
        sched.add_static(target.clone());
        let now = Instant::now();

        let mut tasks = sched.new_tasks(1, &no_peers(), now);
        let task = tasks.remove(0);
        sched.task_done(task, now);
        assert!(sched.hist.contains(&target.id()));

        sched.remove_static(&target);
        assert!(!sched.has_static(&target.id()));
        assert!(!sched.hist.contains(&target.id()));

        // Re-adding makes it dialable right away instead of after the
        // cooldown.
        sched.add_static(target.clone());
        let tasks = sched.new_tasks(1, &no_peers(), now + Duration::from_secs(1));
        assert!(tasks.iter().any(|task| matches!(
            task,
            Task::Dial(dial) if dial.dest().id() == target.id()
        )));
    }

    #[test]
    fn completed_static_attempt_keeps_resolution_state() {
        let mut sched = scheduler(2);
        let target = Node::incomplete(node_id(1));
        sched.add_static(target.clone());
        let now = Instant::now();

        let mut tasks = sched.new_tasks(1, &no_peers(), now);
        // Simulate the task resolving the endpoint while running.
        let task = match tasks.remove(0) {
            Task::Dial(dial) => Task::Dial(DialTask::new(dial.flags(), node(1))),
            other => other,
        };
        sched.task_done(task, now);

        let entry = sched.static_nodes.get(&node_id(1)).expect("still static");
        assert!(!entry.dest().is_incomplete());
    }
}
