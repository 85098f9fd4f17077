#![forbid(unsafe_code)]

//! Library half of the channel downloader.
//!
//! The binary in `src/bin/download_channel.rs` is a thin clap shell; every
//! piece with real control flow (listing, planning, the ledger) lives here so
//! it can be driven from tests with a scripted extractor and a recording
//! console.

pub mod config;
pub mod console;
pub mod cookies;
pub mod display;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod interrupt;
pub mod ledger;
pub mod lister;
pub mod model;
