// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Capabilities the dial scheduler consumes. All three are injected by the
//! host; tests substitute deterministic fakes.

use crate::error::{DialError, Result};
use crate::node::{ConnFlags, Node};
use async_trait::async_trait;
use std::time::Instant;

/// Opens raw TCP connections to remote nodes.
#[async_trait]
pub trait NodeDialer: Send + Sync {
    /// Whatever the host's connection type is; the scheduler never looks
    /// inside it, it only hands it back through [`Server::setup_conn`].
    type Conn: Send;

    async fn dial(&self, node: &Node) -> std::result::Result<Self::Conn, DialError>;
}

/// The discovery table the overlay runs to find candidate nodes.
///
/// Implementations synchronize internally; tasks call into the table
/// concurrently with each other and with the host.
#[async_trait]
pub trait DiscoverTable: Send + Sync {
    /// Ask the discovery network for a current endpoint of `node`.
    async fn resolve(&self, node: &Node) -> Option<Node>;

    /// Perform one random walk of the overlay and return its results.
    async fn lookup_random(&self) -> Vec<Node>;

    /// Fill up to `buf.len()` entries from the table's known node set.
    /// Returns the number of entries written.
    fn read_random_nodes(&self, buf: &mut [Node]) -> usize;

    /// Release the table's resources. Called by the host at shutdown,
    /// never by the scheduler.
    fn close(&self);
}

/// What a running task sees of the host server.
#[async_trait]
pub trait Server: Send + Sync {
    type Conn: Send;

    fn dialer(&self) -> &dyn NodeDialer<Conn = Self::Conn>;

    /// The discovery table, or `None` if the host runs without discovery.
    fn discovery(&self) -> Option<&dyn DiscoverTable>;

    /// Instant of the most recent random lookup. Used to keep lookups at
    /// least [`LOOKUP_INTERVAL`](crate::task::LOOKUP_INTERVAL) apart.
    fn last_lookup(&self) -> Instant;

    fn set_last_lookup(&self, at: Instant);

    /// Hand a freshly opened connection to the protocol layer (handshake,
    /// multiplexing, peer registration).
    async fn setup_conn(&self, conn: Self::Conn, flags: ConnFlags, dest: &Node) -> Result<()>;
}
