// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::{Error, Result};
use crate::node::{ConnFlags, Node};
use crate::server::Server;
use std::time::{Duration, Instant};

/// Minimum gap between two random discovery lookups.
///
/// The scheduler asks for a lookup whenever its candidate buffer runs low,
/// which on a quiet network is every tick; the interval keeps the
/// discovery table from being walked continuously.
pub const LOOKUP_INTERVAL: Duration = Duration::from_secs(4);

/// Starting backoff between endpoint resolution attempts for a node.
pub const INITIAL_RESOLVE_DELAY: Duration = Duration::from_secs(60);

/// Ceiling for the resolution backoff.
pub const MAX_RESOLVE_DELAY: Duration = Duration::from_secs(60 * 60);

/// A unit of work handed from the scheduler to the host loop.
///
/// The host runs tasks concurrently and returns each one to
/// [`DialScheduler::task_done`](crate::DialScheduler::task_done) when it
/// finishes.
#[derive(Debug)]
pub enum Task {
    Dial(DialTask),
    Discover(DiscoverTask),
    WaitExpire(WaitExpireTask),
}

impl Task {
    pub async fn run<S: Server>(&mut self, server: &S) {
        match self {
            Task::Dial(task) => task.run(server).await,
            Task::Discover(task) => task.run(server).await,
            Task::WaitExpire(task) => task.run().await,
        }
    }
}

/// One attempt to establish an outbound connection to a node.
#[derive(Clone, Debug)]
pub struct DialTask {
    flags: ConnFlags,
    dest: Node,
    last_resolved: Option<Instant>,
    resolve_delay: Duration,
}

impl DialTask {
    pub(crate) fn new(flags: ConnFlags, dest: Node) -> Self {
        Self {
            flags,
            dest,
            last_resolved: None,
            resolve_delay: Duration::ZERO,
        }
    }

    pub fn flags(&self) -> ConnFlags {
        self.flags
    }

    pub fn dest(&self) -> &Node {
        &self.dest
    }

    pub async fn run<S: Server>(&mut self, server: &S) {
        if self.dest.is_incomplete() && !self.resolve(server, Instant::now(), false).await {
            return;
        }

        if let Err(err) = self.connect(server).await {
            debug!("Dial to node {} failed: {err}", self.dest);
            // Statically configured nodes get a fresh endpoint lookup and a
            // single retry when the socket could not be opened. Dynamic
            // dials are throttled by the scheduler's history instead.
            if matches!(err, Error::Dial(_))
                && self.flags.intersects(ConnFlags::STATIC_DIALED)
                && self.resolve(server, Instant::now(), true).await
            {
                if let Err(err) = self.connect(server).await {
                    debug!("Dial retry to node {} failed: {err}", self.dest);
                }
            }
        }
    }

    /// Asks discovery for a current endpoint of the destination.
    ///
    /// Attempts are spaced by a delay that doubles on every failure up to
    /// [`MAX_RESOLVE_DELAY`] and resets on success; `force` skips the
    /// spacing check for the post-failure retry of a static dial.
    async fn resolve<S: Server>(&mut self, server: &S, now: Instant, force: bool) -> bool {
        let Some(discovery) = server.discovery() else {
            debug!(
                "Can't resolve node {:?}: discovery is disabled",
                self.dest.id()
            );
            return false;
        };

        if self.resolve_delay.is_zero() {
            self.resolve_delay = INITIAL_RESOLVE_DELAY;
        }
        if !force {
            if let Some(last) = self.last_resolved {
                if now.saturating_duration_since(last) < self.resolve_delay {
                    return false;
                }
            }
        }

        let resolved = discovery.resolve(&self.dest).await;
        self.last_resolved = Some(now);
        match resolved {
            Some(node) => {
                self.resolve_delay = INITIAL_RESOLVE_DELAY;
                debug!("Resolved node: {node}");
                self.dest = node;
                true
            }
            None => {
                self.resolve_delay = (self.resolve_delay * 2).min(MAX_RESOLVE_DELAY);
                debug!(
                    "Resolving node {:?} failed, next attempt in {:?}",
                    self.dest.id(),
                    self.resolve_delay
                );
                false
            }
        }
    }

    async fn connect<S: Server>(&self, server: &S) -> Result<()> {
        let conn = server.dialer().dial(&self.dest).await?;
        server.setup_conn(conn, self.flags, &self.dest).await
    }
}

/// Asks discovery for a batch of random candidate nodes.
///
/// The scheduler keeps at most one of these in flight; the task itself
/// only enforces the spacing between lookups.
#[derive(Debug, Default)]
pub struct DiscoverTask {
    results: Vec<Node>,
}

impl DiscoverTask {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[Node] {
        &self.results
    }

    pub(crate) fn into_results(self) -> Vec<Node> {
        self.results
    }

    pub async fn run<S: Server>(&mut self, server: &S) {
        let next = server.last_lookup() + LOOKUP_INTERVAL;
        let now = Instant::now();
        if next > now {
            tokio::time::sleep(next - now).await;
        }
        server.set_last_lookup(Instant::now());

        self.results = match server.discovery() {
            Some(discovery) => discovery.lookup_random().await,
            None => Vec::new(),
        };
        debug!("Discovery lookup returned {} nodes", self.results.len());
    }
}

/// Sleeps until the earliest dial-history entry expires, so the host loop
/// ticks again even when there is nothing else to do.
#[derive(Debug)]
pub struct WaitExpireTask {
    duration: Duration,
}

impl WaitExpireTask {
    pub(crate) fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn run(&self) {
        tokio::time::sleep(self.duration).await;
    }
}
