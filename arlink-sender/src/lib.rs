//! # arlink-sender — Editor Frame Sender
//!
//! Renders a view, captures it on a frame budget and streams the
//! encoded frames to a device over TCP. On Ctrl-C the stream is flushed
//! before the process exits.
//!
//! ## Modes
//!
//! - **Connected**: frames go to the configured peer (default).
//! - **Dry run**: frames go to an in-process sink (`--dry-run`), useful
//!   for checking rates and sizes without a device.

pub mod config;
pub mod service;
