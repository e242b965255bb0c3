// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::Error;
use crate::netlist::NetRestrict;
use crate::node::Node;
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default cap on dynamically dialed peers.
pub const DEFAULT_MAX_DYN_DIALS: usize = 16;

/// Configuration for a [`DialScheduler`](crate::DialScheduler).
///
/// The local node identity and the discovery capability are passed to
/// [`DialScheduler::new`](crate::DialScheduler::new) alongside this; they
/// come from the host's key material and runtime, not from configuration.
#[derive(Clone, Debug)]
pub struct DialerConfig {
    /// Maximum number of dynamically dialed peers, connected or in flight.
    pub max_dyn_dials: usize,
    /// Operator-configured nodes the scheduler keeps trying to connect to.
    pub static_nodes: Vec<Node>,
    /// Well-known nodes dialed round-robin when the node has no peers.
    pub bootnodes: Vec<Node>,
    /// When set, only nodes inside these networks are dialed.
    pub net_restrict: Option<NetRestrict>,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            max_dyn_dials: DEFAULT_MAX_DYN_DIALS,
            static_nodes: Vec::new(),
            bootnodes: Vec::new(),
            net_restrict: None,
        }
    }
}

impl TryFrom<&DialerOpts> for DialerConfig {
    type Error = Error;

    /// Builds the runtime configuration from parsed command-line options.
    ///
    /// Bootstrap nodes must carry a TCP endpoint: they are dialed when
    /// discovery has nothing to offer, so there is nothing to resolve
    /// them with.
    fn try_from(opts: &DialerOpts) -> Result<Self, Self::Error> {
        for node in &opts.bootnodes {
            if node.is_incomplete() {
                return Err(Error::InvalidNode(format!(
                    "bootstrap node {node} has no TCP endpoint"
                )));
            }
        }

        Ok(Self {
            max_dyn_dials: opts.max_dial_peers,
            static_nodes: opts.static_peers.clone(),
            bootnodes: opts.bootnodes.clone(),
            net_restrict: opts.net_restrict.clone(),
        })
    }
}

/// Command-line options for dial scheduling, for hosts to embed in their
/// own clap command.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialerOpts {
    /// Maximum number of outbound connections to dynamically discovered
    /// nodes.
    #[clap(long, default_value_t = DEFAULT_MAX_DYN_DIALS)]
    pub max_dial_peers: usize,

    /// Node(s) to keep a connection to at all times, in the
    /// `<hex id>@<ip>:<port>` format. The endpoint may be omitted for
    /// nodes that discovery can resolve.
    ///
    /// This argument can be provided multiple times, or once with a
    /// comma-separated list.
    #[clap(long = "static-peer", value_name = "node", value_delimiter = ',')]
    pub static_peers: Vec<Node>,

    /// Node(s) to fall back to when no peers are connected, in the
    /// `<hex id>@<ip>:<port>` format.
    #[clap(long = "bootnode", value_name = "node", value_delimiter = ',')]
    pub bootnodes: Vec<Node>,

    /// Restrict outbound dials to the given comma-separated CIDR networks.
    #[clap(long, value_name = "cidrs")]
    pub net_restrict: Option<NetRestrict>,
}

impl Default for DialerOpts {
    fn default() -> Self {
        Self {
            max_dial_peers: DEFAULT_MAX_DYN_DIALS,
            static_peers: Vec::new(),
            bootnodes: Vec::new(),
            net_restrict: None,
        }
    }
}
