//! # Book Scout
//!
//! A warehouse-driven batch tool that builds per-user reading-history
//! summaries and asks a hosted assistant — backed by a retrieval index over
//! the book catalog — for personalized recommendations.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────────┐   ┌────────────────────┐
//! │ Warehouse │──▶│ Catalog NDJSON │──▶│ Vector store +      │
//! │ (sqlx)    │   │ export         │   │ assistant (vendor)  │
//! └─────┬─────┘   └───────────────┘   └─────────┬──────────┘
//!       │                                       │
//!       ▼                                       ▼
//!  reading history ──▶ prompts ──▶ runs (analyze, search) ──▶ stdout
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! scout export --output catalog.json   # inspect the catalog document
//! scout users                          # who would be processed
//! scout history user-42                # one user's recent books
//! scout recommend 3                    # recommend for up to 3 users
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Warehouse connection |
//! | [`catalog`] | Published-book NDJSON export |
//! | [`activity`] | Reading-activity queries |
//! | [`prompts`] | Prompt templates and rendering |
//! | [`assistant`] | Hosted assistant API client |
//! | [`lifecycle`] | Assistant provision and teardown |
//! | [`run`] | Run driver: polling and tool calls |
//! | [`recommend`] | Batch orchestration |

pub mod activity;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod prompts;
pub mod recommend;
pub mod run;
