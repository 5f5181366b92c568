// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Development trace sinks for meridian.
//!
//! Both sinks implement [`TraceSink`](meridian_core::trace::TraceSink):
//!
//! - [`pretty::PrettyPrintSink`]: one human-readable line per event.
//! - [`chrome::ChromeTraceSink`]: collects events and writes Chrome Trace
//!   Event Format JSON for `chrome://tracing` or Perfetto.

pub mod chrome;
pub mod pretty;
