// ABOUTME: Library crate for siteup exposing the server lifecycle API for
// the CLI binary and for integration tests

#![allow(missing_docs)]

pub mod cli;
pub mod config;
pub mod server;
