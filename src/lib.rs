#![forbid(unsafe_code)]

pub mod autocomplete;
pub mod cli;
pub mod collections;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod formats;
pub mod harvest;
pub mod index_paths;
pub mod logging;
pub mod publish;
pub mod store;
pub mod verify;
