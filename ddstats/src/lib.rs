//! # ddstats - Live stats client for Devil Daggers
//!
//! Attaches to a running game, samples the stats block the game exports for
//! external readers, derives what the player is doing, records each run or
//! replay second by second, and submits finished sessions to a stats server.
//! A live channel lets spectators follow along while the run is in progress.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Devil Daggers process                  │
//! │          stats block + per-second stat frame array        │
//! └───────────────────────────┬───────────────────────────────┘
//!                             │ process_vm_readv
//!                             ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Sampling loop (36 Hz)                    │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐  │
//! │  │ Connection │──▶│   Decode   │──▶│ Session machine  │  │
//! │  │ supervisor │   │            │   │ status + record  │  │
//! │  └────────────┘   └────────────┘   └────────┬─────────┘  │
//! └─────────────────────────────────────────────┼────────────┘
//!              snapshots (watch)                │ completed sessions (queue)
//!        ┌───────────────┬──────────────────────┤
//!        ▼               ▼                      ▼
//! ┌─────────────┐ ┌─────────────┐      ┌─────────────────┐
//! │  Presence   │ │   Display   │      │   Dispatcher    │
//! │  (3 Hz)     │ │   (2 Hz)    │      │  HTTP submit    │
//! └─────────────┘ └─────────────┘      └─────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Core Pipeline Modules
//!
//! - [`memory`]: remote memory reader seam, `/proc` implementation and a
//!   scripted in-memory reader for tests
//! - [`decode`]: fixed-layout block and frame decoding
//! - [`connection`]: process lookup, pointer chain, liveness
//! - [`session`]: coarse status derivation and the recording state machine
//! - [`sampler`]: one sampling tick tying the three together
//!
//! ### Network Modules
//!
//! - [`submit`]: filters, payload, HTTP API and the dispatcher task
//! - [`live`]: Socket.IO live channel and the presence reporter
//!
//! ### UI and Wiring
//!
//! - [`display`]: pure mapping from snapshots to what the UI shows
//! - [`tui`]: terminal UI
//! - [`config`]: TOML config file
//! - [`cli`]: command-line arguments
//! - [`app`]: task wiring and shutdown
//! - [`domain`]: core types and errors

pub mod app;
pub mod cli;
pub mod config;
pub mod connection;
pub mod decode;
pub mod display;
pub mod domain;
pub mod live;
pub mod memory;
pub mod sampler;
pub mod session;
pub mod submit;
pub mod tui;
