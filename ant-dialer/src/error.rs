// Copyright 2025 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Error types for the ant-dialer crate.

use thiserror::Error;

/// Result type used throughout ant-dialer.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ant-dialer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure while opening a connection.
    ///
    /// This is the only error class that triggers the re-resolve-and-retry
    /// path for statically configured nodes.
    #[error("dial failed: {0}")]
    Dial(#[from] DialError),

    /// The host rejected a freshly opened connection during setup
    /// (handshake, protocol negotiation, peer limits).
    #[error("connection setup failed: {0}")]
    Setup(String),

    /// A node could not be parsed from its textual form.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// A network allowlist could not be parsed.
    #[error("invalid network allowlist: {0}")]
    InvalidNetRestrict(String),
}

/// Failures reported by a [`NodeDialer`](crate::NodeDialer) when opening a
/// TCP connection.
#[derive(Debug, Error)]
pub enum DialError {
    /// The destination has no known IP or TCP port.
    #[error("destination has no TCP endpoint")]
    NoEndpoint,

    /// The socket could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
