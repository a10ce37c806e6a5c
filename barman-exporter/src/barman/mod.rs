//! Barman command-line integration.
//!
//! [`CommandInvoker`] is the seam between the exporter and the barman
//! binary: production wiring uses [`BarmanProcess`], tests use
//! `ScriptedInvoker` (behind the `test-utils` feature). [`BarmanClient`]
//! decodes the JSON answers.

mod client;
mod command;
pub mod models;
#[cfg(any(test, feature = "test-utils"))]
mod scripted;

pub use client::BarmanClient;
pub use command::{BarmanProcess, CommandError, CommandErrorCause, CommandInvoker};
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedInvoker;
