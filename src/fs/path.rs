// SPDX-License-Identifier: GPL-2.0

//! Textual path resolution against the entry table.

use crate::error::{Error, Result};
use crate::fs::{FatVolume, ROOT_ENTRY};

impl FatVolume {
	/// Translates a path into an entry index.
	///
	/// Empty paths resolve to the current directory and `/` to the root.
	/// Absolute paths start at the root, relative ones at the current
	/// directory; `.` is skipped and `..` follows the parent link (the
	/// root is its own parent). Files and directories are not
	/// distinguished here; callers check `is_dir` themselves.
	pub fn resolve(&self, path: &str) -> Option<u32> {
		if path.is_empty() {
			return Some(self.current_dir);
		}
		if path == "/" {
			return Some(ROOT_ENTRY);
		}

		let mut current = if path.starts_with('/') {
			ROOT_ENTRY
		} else {
			self.current_dir
		};

		for segment in path.split('/') {
			match segment {
				"" | "." => {}
				".." => current = self.entry(current).parent,
				name => current = self.find_entry(name, current)?,
			}
		}

		Some(current)
	}

	/// Splits a path into a resolved parent directory and the final name
	/// component, for operations that create or rename entries.
	pub(crate) fn split_parent<'a>(&self, path: &'a str) -> Result<(u32, &'a str)> {
		match path.rfind('/') {
			Some(pos) => {
				let prefix = &path[..pos];
				let name = &path[pos + 1..];
				let parent = if prefix.is_empty() {
					ROOT_ENTRY
				} else {
					self.resolve(prefix).ok_or(Error::NotFound)?
				};
				Ok((parent, name))
			}
			None => Ok((self.current_dir, path)),
		}
	}
}
