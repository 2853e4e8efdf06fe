pub mod cli;
pub mod codegen;
pub mod config;
pub mod domain;
pub mod env;
pub mod error;
pub mod git;
pub mod resolver;
pub mod ui;

pub use error::{GitSemverError, Result};
