//! # riffbank
//!
//! A local-first ingestion pipeline that turns scattered music-education
//! content into one searchable chunk store.
//!
//! riffbank pulls from heterogeneous sources (theory sites, PDF method
//! books, ASCII tab archives, tab-binary exports, MIDI-derived scores, and a
//! chord-progression trends API), normalizes each into canonical text with
//! typed metadata, cuts token-bounded chunks with content-derived ids, and
//! upserts them into a SQLite store with FTS5 ranking.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐   ┌───────────┐
//! │    Collectors    │──▶│   Pipeline    │──▶│  SQLite   │
//! │ web/pdf/tabs/    │   │ normalize +  │   │   FTS5    │
//! │ midi/api         │   │ chunk + hash │   └─────┬─────┘
//! └──────────────────┘   └──────┬───────┘         │
//!                               ▼                 ▼
//!                        ┌────────────┐    ┌────────────┐
//!                        │  snapshots │    │    CLI     │
//!                        │   (JSON)   │    │   (riff)   │
//!                        └────────────┘    └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! riff init                     # create the store
//! riff sync all                 # run every configured collector
//! riff sync tabs --limit 10     # one collector, first 10 files
//! riff query "dorian mode"
//! riff stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`collect_web`] | Web page collector |
//! | [`collect_pdf`] | PDF document collector |
//! | [`collect_tabs`] | ASCII tab and tab-export collector |
//! | [`collect_midi`] | MIDI-derived score collector |
//! | [`collect_api`] | Chord-progression trends collector |
//! | [`extract`] | HTML and PDF text extraction |
//! | [`normalize`] | Canonical text + metadata per input shape |
//! | [`chunk`] | Token-window chunking and chunk ids |
//! | [`store`] | Vector-index seam and the SQLite implementation |
//! | [`pipeline`] | Sync orchestration, snapshots, summary report |
//! | [`query`] | Ranked retrieval over the store |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod collect_api;
pub mod collect_midi;
pub mod collect_pdf;
pub mod collect_tabs;
pub mod collect_web;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod score;
pub mod stats;
pub mod store;
pub mod tokenizer;
