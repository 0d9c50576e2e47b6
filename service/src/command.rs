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


//! Command registry
//!
//! Maps command codes to handlers. Lookups happen once per inbound frame and
//! never block other sessions.

use crate::{CommandHandler, Result, ServiceError};
use cmdwire_codec::ReservedCommand;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, info};

/// Registered command handlers keyed by command code
#[derive(Default)]
pub struct CommandRegistry {
    commands: DashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a command code.
    ///
    /// Codes are case-sensitive. Registering an empty code, a reserved
    /// protocol code or a code that already has a handler fails and leaves
    /// the registry unchanged.
    pub fn register(&self, code: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let code = code.into();
        if code.is_empty() {
            return Err(ServiceError::EmptyCommandCode);
        }
        if ReservedCommand::from_code(&code).is_some() {
            return Err(ServiceError::ReservedCommand(code));
        }

        match self.commands.entry(code) {
            Entry::Occupied(entry) => Err(ServiceError::DuplicateCommand(entry.key().clone())),
            Entry::Vacant(entry) => {
                info!(command = %entry.key(), "Registering command");
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Handler for a command code, if any
    pub fn lookup(&self, code: &str) -> Option<Arc<dyn CommandHandler>> {
        let handler = self.commands.get(code).map(|entry| entry.value().clone());
        if handler.is_none() {
            debug!(command = %code, "No handler registered");
        }
        handler
    }

    /// Whether a handler is bound to the code
    pub fn contains(&self, code: &str) -> bool {
        self.commands.contains_key(code)
    }

    /// Registered codes in sorted order
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.commands.iter().map(|entry| entry.key().clone()).collect();
        codes.sort();
        codes
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if no commands are registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}
