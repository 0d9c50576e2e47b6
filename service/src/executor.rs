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


//! Command executor
//!
//! Every dispatched frame runs on its own task. Within one session frames are
//! dispatched in arrival order, but a handler for frame N may still be running
//! when the handler for frame N+1 starts; handlers that need in-order
//! completion must serialize themselves. There is no execution timeout.

use crate::{CommandContext, CommandHandler, ExecutionError, handler::Hooks};
use futures_util::FutureExt;
use metrics::{counter, histogram};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, trace, trace_span, warn};

/// Runs handlers off the session reader and routes their failures
#[derive(Clone)]
pub(crate) struct CommandExecutor {
    hooks: Arc<Hooks>,
}

impl CommandExecutor {
    pub(crate) fn new(hooks: Arc<Hooks>) -> Self {
        Self { hooks }
    }

    /// Spawn the handler; errors and panics end up in the execution error hook
    pub(crate) fn execute(&self, handler: Arc<dyn CommandHandler>, ctx: CommandContext) {
        let hooks = self.hooks.clone();
        let session_id = ctx.session().id();
        let code = ctx.code().to_string();
        let span = trace_span!("command", session_id = %session_id, command = %code);

        tokio::spawn(
            async move {
                let start = Instant::now();
                let outcome = AssertUnwindSafe(handler.handle(ctx)).catch_unwind().await;
                histogram!("cmdwire.command.duration").record(start.elapsed().as_secs_f64());

                let error = match outcome {
                    Ok(Ok(())) => {
                        counter!("cmdwire.commands.completed").increment(1);
                        trace!("Command completed");
                        return;
                    }
                    Ok(Err(source)) => ExecutionError::Failed {
                        session_id,
                        code,
                        source,
                    },
                    Err(payload) => ExecutionError::Panicked {
                        session_id,
                        code,
                        message: panic_message(payload.as_ref()),
                    },
                };

                counter!("cmdwire.commands.failed").increment(1);
                warn!(error = %error, "Command failed");
                hooks.execution_error(&error);
            }
            .instrument(span),
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
