// SPDX-License-Identifier: GPL-2.0

//! mysh: an interactive shell over a persistent in-memory FAT volume.
//!
//! The volume is a fixed-size block device held entirely in memory and
//! serialised to a single image file between sessions. Built-in commands
//! operate on the volume; anything else is spawned as a host process, and
//! pipelines may mix both, with `<`, `>` and `>>` redirections reading and
//! writing volume paths.

pub mod boot;
pub mod error;
pub mod exec;
pub mod fs;
pub mod history;
pub mod parser;
pub mod shell;
pub mod unix;

pub const NAME: &str = "mysh";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
