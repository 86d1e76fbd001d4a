//! # sysgauge
//!
//! Headless driver for the sysgauge engine: layered settings, logging and
//! one command per engine operation.
//!
//! ```text
//! ┌──────────┐    ┌─────────────────────────────────────────────┐
//! │ Settings │───▶│                    App                      │
//! └──────────┘    │  Monitor ──▶ SeriesSet     Orchestrator     │
//!                 │     │                          │            │
//!                 │     ▼                          ▼            │
//!                 │  Sampler ──▶ Scorer     HistoryStore        │
//!                 │                               │             │
//!                 │                               ▼             │
//!                 │                         FileStorage         │
//!                 └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! sysgauge sample
//! sysgauge run check
//! sysgauge run install --cancel-after 3
//! sysgauge history --range 24h
//! sysgauge export-history --out history.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use sysgauge::{App, Settings};
//!
//! let app = App::new(Settings::default());
//! let reading = app.sample().unwrap();
//! println!("{} ({})", reading.score.value, reading.score.status.label());
//! ```

pub mod app;
pub mod settings;

pub use app::App;
pub use settings::Settings;
