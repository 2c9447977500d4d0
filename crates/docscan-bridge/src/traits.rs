// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic handler trait for method-channel calls.
//
// A host platform (Flutter engine, JNI shim, CLI) parses its own call format
// into a `MethodCall` and hands it to a `MethodHandler`.

use crate::channel::{ChannelError, MethodCall, MethodReply};

/// Serves one decoded method call.
///
/// Implementations must be shareable across threads: the worker runs each
/// call on the blocking pool.
pub trait MethodHandler: Send + Sync {
    /// Run the call to completion. Failures carry a channel error code.
    fn handle(&self, call: &MethodCall) -> Result<MethodReply, ChannelError>;
}
