//! Station curation core: catalog, selection, filter/sort view, preview
//! state machine and export of the curated subset.

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod platform;
pub mod preview;
pub mod seed;
pub mod selection;
pub mod session;
pub mod station;
pub mod view;

pub use error::{CurateError, Result};
