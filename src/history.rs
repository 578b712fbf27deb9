// SPDX-License-Identifier: GPL-2.0

//! Command history: a bounded in-memory list backed by a flat text file.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info};

/// Maximum number of remembered commands
pub const MAX_HISTORY: usize = 100;

/// Command history state
#[derive(Debug, Default)]
pub struct History {
	entries: Vec<String>,
}

impl History {
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Loads history from a flat newline-separated file. A missing or
	/// unreadable file yields an empty history.
	pub fn load(path: &Path) -> Self {
		let mut history = Self::new();
		match fs::read_to_string(path) {
			Ok(content) => {
				for line in content.lines() {
					if !line.is_empty() && history.entries.len() < MAX_HISTORY {
						history.entries.push(line.to_string());
					}
				}
				info!("loaded {} history entries", history.entries.len());
			}
			Err(err) => {
				debug!("no history loaded from {}: {}", path.display(), err);
			}
		}
		history
	}

	/// Records a submitted command. Empty lines and consecutive duplicates
	/// are skipped; the oldest entry is dropped once the list is full.
	pub fn add(&mut self, cmd: &str) {
		if cmd.is_empty() {
			return;
		}
		if self.entries.last().map(String::as_str) == Some(cmd) {
			return;
		}
		if self.entries.len() == MAX_HISTORY {
			self.entries.remove(0);
		}
		self.entries.push(cmd.to_string());
	}

	pub fn save(&self, path: &Path) -> io::Result<()> {
		let mut content = String::new();
		for entry in &self.entries {
			content.push_str(entry);
			content.push('\n');
		}
		fs::write(path, content)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_skips_empty_and_consecutive_duplicates() {
		let mut history = History::new();
		history.add("");
		history.add("ls");
		history.add("ls");
		history.add("pwd");
		history.add("ls");
		let entries: Vec<&str> = history.iter().collect();
		assert_eq!(entries, vec!["ls", "pwd", "ls"]);
	}

	#[test]
	fn add_evicts_oldest_when_full() {
		let mut history = History::new();
		for i in 0..MAX_HISTORY + 5 {
			history.add(&format!("cmd{}", i));
		}
		assert_eq!(history.len(), MAX_HISTORY);
		assert_eq!(history.iter().next(), Some("cmd5"));
		assert_eq!(history.iter().last(), Some("cmd104"));
	}

	#[test]
	fn save_and_load_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(".mysh_history");

		let mut history = History::new();
		history.add("mkdir /d");
		history.add("ls /d");
		history.save(&path).unwrap();

		let loaded = History::load(&path);
		let entries: Vec<&str> = loaded.iter().collect();
		assert_eq!(entries, vec!["mkdir /d", "ls /d"]);
	}

	#[test]
	fn load_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let history = History::load(&dir.path().join("absent"));
		assert!(history.is_empty());
	}
}
