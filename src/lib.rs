pub mod archive;
pub mod catalog;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod http;
pub mod platform;
pub mod runtime;
pub mod source;
pub mod version;
