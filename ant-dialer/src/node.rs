// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::Error;
use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use xor_name::{XorName, XOR_NAME_LEN};

/// Unique identity of a node on the overlay.
pub type NodeId = XorName;

bitflags! {
    /// How a connection came to be, or will come to be.
    ///
    /// A flag value travels with every outbound dial and is recorded
    /// against every existing peer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ConnFlags: u8 {
        /// Outbound connection to a node obtained from discovery or the
        /// bootstrap list.
        const DYN_DIALED = 0b0000_0001;
        /// Outbound connection to an operator-configured node.
        const STATIC_DIALED = 0b0000_0010;
        /// Connection initiated by the remote side.
        const INBOUND = 0b0000_0100;
    }
}

/// The only thing the dial scheduler needs to know about an existing peer:
/// which connection flags it carries.
pub trait PeerFlags {
    /// Returns true if the peer carries any bit of `flag`.
    fn is(&self, flag: ConnFlags) -> bool;
}

impl PeerFlags for ConnFlags {
    fn is(&self, flag: ConnFlags) -> bool {
        self.intersects(flag)
    }
}

/// A remote node as the dial scheduler sees it: an identity plus an
/// optional TCP endpoint.
///
/// A node without an IP or port is *incomplete* and must be resolved via
/// discovery before it can be dialed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    ip: Option<IpAddr>,
    tcp_port: Option<u16>,
}

impl Node {
    /// A node with a known TCP endpoint.
    pub fn new(id: NodeId, ip: IpAddr, tcp_port: u16) -> Self {
        Self {
            id,
            ip: Some(ip),
            tcp_port: Some(tcp_port),
        }
    }

    /// A node known only by its identity.
    pub fn incomplete(id: NodeId) -> Self {
        Self {
            id,
            ip: None,
            tcp_port: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn tcp(&self) -> Option<u16> {
        self.tcp_port
    }

    /// True if the node cannot be dialed without resolving it first.
    pub fn is_incomplete(&self) -> bool {
        self.ip.is_none() || self.tcp_port.is_none()
    }

    /// The dialable socket address, if the node is complete.
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        match (self.ip, self.tcp_port) {
            (Some(ip), Some(port)) => Some(SocketAddr::new(ip, port)),
            _ => None,
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::incomplete(XorName([0u8; XOR_NAME_LEN]))
    }
}

impl fmt::Display for Node {
    /// Textual node form: `<64 hex chars>@<ip>:<port>`, or the bare hex
    /// identity for incomplete nodes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.id.0))?;
        if let Some(addr) = self.tcp_addr() {
            write!(f, "@{addr}")?;
        }
        Ok(())
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id_part, addr_part) = match s.split_once('@') {
            Some((id, addr)) => (id, Some(addr)),
            None => (s, None),
        };

        let id_bytes = hex::decode(id_part)
            .map_err(|_| Error::InvalidNode(format!("invalid hex identity in {s:?}")))?;
        let id_bytes: [u8; XOR_NAME_LEN] = id_bytes
            .try_into()
            .map_err(|_| Error::InvalidNode(format!("identity must be {XOR_NAME_LEN} bytes")))?;
        let id = XorName(id_bytes);

        match addr_part {
            Some(addr) => {
                let addr: SocketAddr = addr
                    .parse()
                    .map_err(|_| Error::InvalidNode(format!("invalid endpoint in {s:?}")))?;
                Ok(Node::new(id, addr.ip(), addr.port()))
            }
            None => Ok(Node::incomplete(id)),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
