// SPDX-License-Identifier: GPL-2.0

//! Project root resolution at startup.

use std::env;
use std::io;
use std::path::PathBuf;

use log::info;

/// Name of the directory the shell anchors itself in.
pub const ROOT_DIR_NAME: &str = "OS_PROJECT";

/// Locates the project root and makes it the process working directory.
///
/// The current directory is searched first, then `$HOME`. The volume image
/// and the history file both live directly under the returned directory.
pub fn locate_root() -> io::Result<PathBuf> {
	let mut candidates = Vec::new();
	if let Ok(cwd) = env::current_dir() {
		candidates.push(cwd.join(ROOT_DIR_NAME));
	}
	if let Some(home) = env::var_os("HOME") {
		candidates.push(PathBuf::from(home).join(ROOT_DIR_NAME));
	}

	for candidate in candidates {
		if candidate.is_dir() {
			let root = candidate.canonicalize()?;
			env::set_current_dir(&root)?;
			info!("project root: {}", root.display());
			return Ok(root);
		}
	}

	Err(io::Error::new(
		io::ErrorKind::NotFound,
		format!("{} directory not found", ROOT_DIR_NAME),
	))
}
