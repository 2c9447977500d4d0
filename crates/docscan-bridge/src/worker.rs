// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background dispatch: pipeline calls are CPU-bound and blocking, so they run
// on the tokio blocking pool rather than on the caller's async task.

use std::sync::Arc;

use tracing::{debug, error};

use crate::channel::{ChannelError, MethodCall, MethodReply};
use crate::traits::MethodHandler;

/// Run one call on the blocking pool and await its reply.
///
/// A panicked or cancelled task is reported with the call's own failure code.
pub async fn spawn_operation<H>(handler: Arc<H>, call: MethodCall) -> Result<MethodReply, ChannelError>
where
    H: MethodHandler + 'static,
{
    let method = call.method_name();
    let failure_code = call.failure_code();
    debug!(method, "Dispatching to blocking pool");

    tokio::task::spawn_blocking(move || handler.handle(&call))
        .await
        .map_err(|err| {
            error!(method, error = %err, "Worker task failed");
            ChannelError::new(failure_code, format!("worker task failed: {err}"))
        })?
}
