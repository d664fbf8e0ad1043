//! # Drive Harness
//!
//! Scoped Google Drive retrieval for AI agents.
//!
//! Each agent is granted a set of Drive files and folders. On every search
//! request Drive Harness resolves that scope to concrete files, downloads
//! them, brings the agent's search index up to date (creating, rewriting or
//! skipping each document based on its freshness), and then runs the search
//! against the index.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ScopeStore │──▶│ FileSource   │──▶│  Metadata    │
//! │ (agents)   │   │ (Drive API)  │   │  extraction  │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            ▼
//!                  ┌──────────────┐   ┌──────────────┐
//!                  │   Results    │◀──│ IndexSync    │──▶ IndexService
//!                  │  assembly    │   │ Engine       │    (HTTP / memory)
//!                  └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dctx check                                   # credentials and config
//! dctx scope --agent agent-42 "roadmap"        # show the resolved scope
//! dctx search --agent agent-42 "roadmap"       # sync and search
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`clock`] | Injectable time source |
//! | [`scope`] | Agent scope storage and resolution |
//! | [`source`] | File source trait, bounded download |
//! | [`connector_drive`] | Drive v3 REST file source |
//! | [`metadata`] | Locator, view link and title extraction |
//! | [`chunk`] | Paragraph-aware text chunking |
//! | [`index`] | Index service trait, HTTP and in-memory backends |
//! | [`sync`] | Per-file index synchronization |
//! | [`results`] | Search and hit flattening |
//! | [`pipeline`] | End-to-end request flow |
//! | [`traits`] | Agent tool interface |

pub mod chunk;
pub mod clock;
pub mod config;
pub mod connector_drive;
pub mod error;
pub mod index;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod results;
pub mod scope;
pub mod source;
pub mod sync;
pub mod traits;
