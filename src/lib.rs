pub mod cli;
pub mod codegen;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod schema;
