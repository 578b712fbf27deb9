// SPDX-License-Identifier: GPL-2.0

//! Directory entries and the flat entry table.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::fs::{FatVolume, FAT_EOC, MAX_ENTRIES, MAX_FILENAME};

bitflags! {
	/// Attribute bits of a directory entry, as stored in the image.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct EntryFlags: u8 {
		/// Slot holds a live entry; clear means tombstone
		const USED = 1 << 0;
		/// Entry is a directory
		const DIRECTORY = 1 << 1;
	}
}

/// One slot of the entry table.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
	pub(crate) name: String,
	pub(crate) size: u32,
	pub(crate) first_block: u16,
	pub(crate) flags: EntryFlags,
	pub(crate) created: i64,
	pub(crate) modified: i64,
	pub(crate) parent: u32,
}

impl DirEntry {
	pub(crate) fn new_dir(name: &str, parent: u32, now: i64) -> Self {
		Self {
			name: name.to_string(),
			size: 0,
			first_block: FAT_EOC,
			flags: EntryFlags::USED | EntryFlags::DIRECTORY,
			created: now,
			modified: now,
			parent,
		}
	}

	pub(crate) fn new_file(name: &str, parent: u32, now: i64) -> Self {
		Self {
			name: name.to_string(),
			size: 0,
			first_block: FAT_EOC,
			flags: EntryFlags::USED,
			created: now,
			modified: now,
			parent,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn size(&self) -> u32 {
		self.size
	}

	pub fn is_dir(&self) -> bool {
		self.flags.contains(EntryFlags::DIRECTORY)
	}

	pub fn is_used(&self) -> bool {
		self.flags.contains(EntryFlags::USED)
	}
}

/// Validates a single filename component.
pub(crate) fn validate_name(name: &str) -> Result<()> {
	if name.is_empty() || name.len() > MAX_FILENAME {
		return Err(Error::InvalidArgument);
	}
	if name.contains('/') || name.contains('\0') {
		return Err(Error::InvalidArgument);
	}
	Ok(())
}

impl FatVolume {
	pub(crate) fn entry(&self, idx: u32) -> &DirEntry {
		&self.entries[idx as usize]
	}

	pub(crate) fn entry_mut(&mut self, idx: u32) -> &mut DirEntry {
		&mut self.entries[idx as usize]
	}

	/// Linear scan for an in-use child of `parent` named `name`.
	pub(crate) fn find_entry(&self, name: &str, parent: u32) -> Option<u32> {
		self.entries
			.iter()
			.position(|entry| {
				entry.is_used() && entry.parent == parent && entry.name == name
			})
			.map(|idx| idx as u32)
	}

	/// Places a new entry, reusing a tombstoned slot before growing the
	/// table. Fails with [`Error::OutOfSpace`] when the table is full.
	pub(crate) fn alloc_entry(&mut self, entry: DirEntry) -> Result<u32> {
		for idx in 0..self.entries.len() {
			if !self.entries[idx].is_used() {
				self.entries[idx] = entry;
				return Ok(idx as u32);
			}
		}
		if self.entries.len() >= MAX_ENTRIES {
			return Err(Error::OutOfSpace);
		}
		self.entries.push(entry);
		Ok((self.entries.len() - 1) as u32)
	}

	/// In-use children of a directory as `(name, is_dir)` pairs.
	pub fn list_dir(&self, dir: u32) -> Vec<(String, bool)> {
		self.entries
			.iter()
			.enumerate()
			.filter(|(idx, entry)| {
				*idx as u32 != dir && entry.is_used() && entry.parent == dir
			})
			.map(|(_, entry)| (entry.name.clone(), entry.is_dir()))
			.collect()
	}
}
