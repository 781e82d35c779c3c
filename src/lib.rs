pub mod archive;
pub mod catalog;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod groups;
pub mod mapping;
pub mod munge;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod transform;
