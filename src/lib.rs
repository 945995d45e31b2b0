//! # Salat Library
//!
//! Internal library for the `salat` binary.
//!
//! The binary only parses arguments and dispatches; everything else lives here
//! so it can be tested directly.
//!
//! ## Architecture
//!
//! - **Prayer times**: `prayer` resolves the calculation method, caches daily
//!   timings and selects the next prayer
//! - **Geography**: `geo` holds coordinates and reverse geocoding
//! - **Location**: `location` abstracts where fixes come from
//! - **Tracking**: `tracking` runs the location state machine and the publish cycle
//! - **State**: `state` is the shared snapshot every consumer reads
//! - **Presentation**: `countdown` and `display` turn the snapshot into text
//! - **Widget bridge**: `widget` mirrors the snapshot into the shared store
//! - **Infrastructure**: configuration, signals, logging and the clock

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod countdown;
pub mod display;
pub mod geo;
pub mod location;
pub mod prayer;
pub mod signals;
pub mod state;
pub mod time_source;
pub mod tracking;
pub mod widget;
