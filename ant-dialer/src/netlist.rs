// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::Error;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A list of IP networks restricting which node addresses may be dialed.
///
/// When a restriction list is configured, the scheduler refuses to dial
/// any node whose IP does not fall inside one of the listed networks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetRestrict(Vec<IpNetwork>);

impl NetRestrict {
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Self(networks)
    }

    /// True if the address falls inside one of the allowed networks.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.iter().any(|network| network.contains(*ip))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NetRestrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for network in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{network}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for NetRestrict {
    type Err = Error;

    /// Parses a comma-separated CIDR list, e.g. `10.0.0.0/8,192.0.2.0/24`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut networks = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let network = part
                .parse::<IpNetwork>()
                .map_err(|err| Error::InvalidNetRestrict(format!("{part:?}: {err}")))?;
            networks.push(network);
        }
        Ok(Self(networks))
    }
}

impl Serialize for NetRestrict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetRestrict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
