//! Command line client for the Cloudland virtualization control panel.
//!
//! Layers, innermost first: `domain` (protocol codec, session entities),
//! `application` (login, transport, operation registry), `infrastructure`
//! (filesystem and HTTP implementations), `cli` (dispatcher and output).

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
