//! # Matchbook
//!
//! Issue-pattern matching and incident generation for CI report chains.
//!
//! Matchbook keeps a store of administrator-curated match patterns derived
//! from known CI issues. Given an incoming report — a checkout, optionally a
//! build referencing it, optionally a test referencing the build — it decides
//! which stored (or inline) patterns the chain matches and can emit incident
//! records linking the report to the matched issues.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌────────────┐
//! │  stdin   │──▶│ Orchestrator  │──▶│  matches    │
//! │  report  │   │ (4 modes)     │   │  incidents  │
//! └──────────┘   └──┬───────┬────┘   └────────────┘
//!                   │       │
//!            ┌──────▼──┐ ┌──▼────────┐
//!            │ pattern │ │ evaluator │
//!            │ store   │ │ (regex)   │
//!            └─────────┘ └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (store path, origin, query tool) |
//! | [`models`] | Report documents, chains, patterns, incidents |
//! | [`extract`] | Lockstep spec/data tree extraction |
//! | [`patterns`] | Pattern compilation and chain evaluation |
//! | [`store`] | SQLite pattern store |
//! | [`ingest`] | Pattern upsert/withdrawal from issue updates |
//! | [`matcher`] | Candidate iteration and match collection |
//! | [`incidents`] | Incident document generation |
//! | [`logs`] | Remote log retrieval for `log_regex` checks |
//! | [`lookup`] | By-id chain resolution via the external query tool |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod error;
pub mod extract;
pub mod incidents;
pub mod ingest;
pub mod logs;
pub mod lookup;
pub mod matcher;
pub mod models;
pub mod patterns;
pub mod store;
