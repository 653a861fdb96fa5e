//! # Unmark
//!
//! Remove watermarks from short-video share links and local images.
//!
//! Two flows share one history ledger:
//!
//! ```text
//! share text  →  identify platform  →  parse service  →  media URLs  →  album
//! local image →  pick band          →  band crop      →  PNG output  →  album
//! ```
//!
//! Every completed operation is written to a local ledger (newest first, capped
//! at 50 entries) that `unmark history` browses.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`platform`] | Platform identification, URL extraction, supported-platform listing |
//! | [`parse`] | Share-link parse client: network service or canned fixtures |
//! | [`imaging`] | Band-crop compositor: region math, backend trait, `image` crate backend |
//! | [`history`] | Bounded newest-first ledger of past operations |
//! | [`storage`] | Key-value persistence used by the ledger and credentials |
//! | [`api`] | JSON envelope client for the account service |
//! | [`auth`] | Login, registration, session resume, stored credentials |
//! | [`album`] | Download or import results into the album directory |
//! | [`config`] | `unmark.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Records shared between modules (`HistoryEntry`, `ParseResult`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Remove the Band, Keep the Rest
//!
//! A watermark strip spanning the full width is removed by stacking the rows
//! above it on top of the rows below it. The output is shorter than the input
//! but contains only original pixels. Nothing is inpainted or guessed.
//! Region arithmetic lives in pure functions ([`imaging::plan_band_removal`])
//! so it can be tested without decoding anything.
//!
//! ## Fixtures by Default
//!
//! The parse service is a seam ([`parse::MediaSource`]). Out of the box the
//! CLI answers from canned per-platform fixtures, so every command works
//! offline. Set `parse.mode = "network"` to talk to a real service.
//!
//! ## Corrupt State Is Empty State
//!
//! A ledger file that fails to decode reads as an empty ledger, with a
//! warning. Losing history is preferable to refusing to start.

pub mod album;
pub mod api;
pub mod auth;
pub mod config;
pub mod history;
pub mod imaging;
pub mod output;
pub mod parse;
pub mod platform;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
