//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Core types for the command server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Numeric id of a client session, assigned sequentially from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Listener state (stored as atomic u8 for lock-free state management)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Not listening
    Stopped = 0,
    /// Binding the listening socket
    Starting = 1,
    /// Accepting connections and dispatching frames
    Listening = 2,
    /// Notifying clients and tearing down sessions
    Stopping = 3,
}

impl ServerState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Listening,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether session readers should keep dispatching frames
    pub fn is_serving(self) -> bool {
        matches!(self, Self::Listening | Self::Stopping)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Listening => write!(f, "listening"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Host details a client announces right after connecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Operating system name
    pub os_name: String,
    /// Operating system user name
    pub user_name: String,
    /// Current working directory of the client process
    pub working_dir: String,
    /// Home directory of the client user
    pub home_dir: String,
}

impl ClientInfo {
    /// Build from the positional arguments of a client info frame.
    ///
    /// Missing arguments are left empty, extra arguments are ignored.
    pub fn from_args(args: &[String]) -> Self {
        let arg = |index: usize| args.get(index).cloned().unwrap_or_default();
        Self {
            os_name: arg(0),
            user_name: arg(1),
            working_dir: arg(2),
            home_dir: arg(3),
        }
    }
}

/// Estimated difference between the server clock and a client clock.
///
/// Positive when the server is ahead of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// Offsets further apart than this are treated as noise rather than averaged
    pub const OUTLIER_THRESHOLD: Duration = Duration::from_secs(1);

    /// Create an offset from signed milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Signed milliseconds
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Magnitude of the offset
    pub fn magnitude(&self) -> Duration {
        Duration::from_millis(self.0.unsigned_abs())
    }

    /// Fold a newly measured offset into this one.
    ///
    /// Measurements within [`Self::OUTLIER_THRESHOLD`] are averaged. Beyond it
    /// the one with the smaller magnitude wins, the current one on a tie.
    pub fn smooth(self, measured: ClockOffset) -> ClockOffset {
        let distance = Duration::from_millis(self.0.abs_diff(measured.0));
        if distance > Self::OUTLIER_THRESHOLD {
            if measured.magnitude() < self.magnitude() {
                measured
            } else {
                self
            }
        } else {
            ClockOffset(((self.0 as i128 + measured.0 as i128) / 2) as i64)
        }
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ms", self.0)
    }
}

/// Current wall clock in milliseconds since the Unix epoch
pub fn unix_millis_now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Listener state
    pub state: ServerState,
    /// Number of registered sessions
    pub active_sessions: usize,
    /// Sessions accepted since the server was created
    pub total_sessions: u64,
    /// Bound listening address while listening
    pub local_addr: Option<SocketAddr>,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_addr {
            Some(addr) => write!(
                f,
                "CommandServer {{ state: {}, active: {}, total: {}, addr: {} }}",
                self.state, self.active_sessions, self.total_sessions, addr
            ),
            None => write!(
                f,
                "CommandServer {{ state: {}, active: {}, total: {} }}",
                self.state, self.active_sessions, self.total_sessions
            ),
        }
    }
}
