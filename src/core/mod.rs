//! Core functionality: block configuration, markdown scanning, vault paths,
//! settings and the asset buffer cache

pub mod cache;
pub mod config;
pub mod markdown;
pub mod settings;
pub mod vault;
