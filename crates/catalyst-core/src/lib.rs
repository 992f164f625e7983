pub mod action;
pub mod catalog;
pub mod config;
pub mod continuation;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod host;
pub mod io;
pub mod mutator;
pub mod paths;
pub mod planner;
pub mod registry;

pub use error::{CatalystError, Result};
