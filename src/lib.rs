//! worldchat is a terminal client for a multi-model chat service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns client state: conversations, the guest quota, model
//!   selection, account sessions, persistence and configuration.
//! - [`api`] defines the service payloads and the HTTP client behind the
//!   [`api::ChatBackend`] and [`api::AdminBackend`] traits.
//! - [`admin`] wraps the operator endpoints (statistics, users, plans).
//! - [`cli`] parses arguments and runs the interactive chat and one-shot
//!   commands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which builds a [`core::session::Session`] and
//! dispatches into [`cli::chat`] for interactive use.

pub mod admin;
pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
