// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Dial scheduling for overlay node connections.
//!
//! The scheduler decides, on every tick of a host server loop, which
//! remote nodes to open TCP connections to and when to ask discovery for
//! more candidates. It interleaves several policies behind one contract:
//!
//! - Static peers are redialed whenever their connection is down
//! - Dynamic peers fill a budgeted number of slots from discovery
//! - Every dialed id enters a cooldown window before it can be redialed
//! - Nodes without a known endpoint are resolved with a doubling backoff
//! - With no peers at all, the bootstrap list is dialed round-robin
//! - Discovery lookups are rate limited and run one at a time
//!
//! The host drives the scheduler with two calls: `new_tasks` returns work
//! to run, `task_done` hands finished work back. Everything the tasks
//! touch at runtime (the transport, the discovery table, connection
//! setup) is injected through the traits in [`server`].

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod history;
pub mod netlist;
pub mod node;
pub mod scheduler;
pub mod server;
pub mod task;

pub use config::{DialerConfig, DialerOpts, DEFAULT_MAX_DYN_DIALS};
pub use error::{DialError, Error, Result};
pub use history::{DialHistory, PastDial};
pub use netlist::NetRestrict;
pub use node::{ConnFlags, Node, NodeId, PeerFlags};
pub use scheduler::{DialScheduler, DIAL_HISTORY_EXPIRATION, FALLBACK_INTERVAL};
pub use server::{DiscoverTable, NodeDialer, Server};
pub use task::{
    DialTask, DiscoverTask, Task, WaitExpireTask, INITIAL_RESOLVE_DELAY, LOOKUP_INTERVAL,
    MAX_RESOLVE_DELAY,
};
