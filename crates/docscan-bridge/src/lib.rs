// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-bridge — Boundary layer between host front ends and the scanner.
//
// Decodes method-channel calls, maps pipeline errors to channel error codes,
// keeps the legacy "Error:" string and file-staging conventions alive, and
// runs calls on a background worker pool.

pub mod channel;
pub mod legacy;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use channel::{
    ChannelError, EncodedImage, ErrorCode, MethodCall, MethodReply, OutputFormat, ScanChannel,
    dispatch,
};
pub use traits::MethodHandler;
pub use worker::spawn_operation;
