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


//! Reserved protocol command codes
//!
//! These codes drive the session lifecycle and are handled by the server
//! itself. They can never be registered as user commands.

use std::fmt;

/// Command codes reserved by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedCommand {
    /// Client to server, right after connecting: OS name, user name,
    /// working directory, home directory.
    ClientInfo,
    /// Server to client, right after accept: the assigned numeric id.
    NewClientId,
    /// Client to server, sent by a well-behaved client before it closes.
    ClientDisconnects,
    /// Server to all clients, right before the server shuts down.
    DisconnectNotify,
    /// Client to server: client wall clock in milliseconds since the Unix epoch.
    ClientTimeReport,
}

impl ReservedCommand {
    /// Every reserved command
    pub const ALL: [ReservedCommand; 5] = [
        ReservedCommand::ClientInfo,
        ReservedCommand::NewClientId,
        ReservedCommand::ClientDisconnects,
        ReservedCommand::DisconnectNotify,
        ReservedCommand::ClientTimeReport,
    ];

    /// Wire code of the command
    pub const fn code(self) -> &'static str {
        match self {
            ReservedCommand::ClientInfo => "_INFO_ABOUT_NEW_CLIENT",
            ReservedCommand::NewClientId => "_NEW_CLIENT_ID_NOTIFY_MESSAGE",
            ReservedCommand::ClientDisconnects => "_CLIENT_DISCONNECTS_NOTIFY_MESSAGE",
            ReservedCommand::DisconnectNotify => "_DC_NOTIFY_MESSAGE",
            ReservedCommand::ClientTimeReport => "_CLIENT_TIME_REPORT",
        }
    }

    /// Look up a reserved command by its wire code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reserved| reserved.code() == code)
    }

    /// Whether the command travels from client to server
    pub fn is_client_to_server(self) -> bool {
        matches!(
            self,
            ReservedCommand::ClientInfo
                | ReservedCommand::ClientDisconnects
                | ReservedCommand::ClientTimeReport
        )
    }
}

impl fmt::Display for ReservedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_resolvable() {
        for reserved in ReservedCommand::ALL {
            assert_eq!(ReservedCommand::from_code(reserved.code()), Some(reserved));
        }
        assert_eq!(ReservedCommand::from_code("ECHO"), None);
        assert_eq!(ReservedCommand::from_code("_dc_notify_message"), None);
    }

    #[test]
    fn test_direction() {
        assert!(ReservedCommand::ClientInfo.is_client_to_server());
        assert!(!ReservedCommand::DisconnectNotify.is_client_to_server());
        assert!(!ReservedCommand::NewClientId.is_client_to_server());
    }
}
