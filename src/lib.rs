//! # Larder
//!
//! A self-hosted recipe box with LLM-assisted recipe generation.
//!
//! Larder stores recipes in a single-file SQLite database with append-only
//! versioning, generates recipe text and tags through an OpenAI-compatible
//! chat-completion API, parses the generated text into a structured
//! breakdown, and serves everything over a small authenticated HTTP UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │   HTTP    │──▶│   Store    │──▶│  SQLite   │
//! │ list/edit │   │ versioned  │   │ one table │
//! │  /recipe  │   │    rows    │   └──────────┘
//! └────┬─────┘   └────────────┘
//!      │
//!      ▼
//! ┌────────────┐   ┌──────────┐
//! │ Generation │──▶│  Parser   │
//! │ chat API   │   │ sections  │
//! └────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! larder init                   # create the database
//! larder seed                   # import the seed fixture
//! larder serve                  # start the HTTP server
//! larder export                 # dump everything as JSON
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection and schema |
//! | [`store`] | Versioned recipe storage |
//! | [`parser`] | Generated-text section parser |
//! | [`generation`] | Chat-completion client |
//! | [`auth`] | Basic auth and GitHub OAuth |
//! | [`server`] | HTTP server and handlers |
//! | [`views`] | HTML page rendering |
//! | [`snapshot`] | Periodic JSON snapshot |
//! | [`export`] | CLI JSON export |
//! | [`tag_cmd`] | Bulk fixture tagging |

pub mod auth;
pub mod config;
pub mod db;
pub mod export;
pub mod generation;
pub mod models;
pub mod parser;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod tag_cmd;
pub mod views;
