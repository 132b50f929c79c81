pub mod build_number;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;

pub use domain::Version;
pub use engine::VersionEngine;
pub use error::{Result, VersionerError};
pub use history::{HistoryConfig, HistoryProvider};
