// SPDX-License-Identifier: GPL-2.0

//! In-memory FAT volume: block store, allocation table and entry table.

pub mod entry;
pub mod fat;
pub mod file;
pub mod image;
pub mod ops;
pub mod path;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::fs::entry::DirEntry;

/// Size of one data block in bytes
pub const BLOCK_SIZE: usize = 512;
/// Number of data blocks in the volume
pub const N_BLOCKS: usize = 1024;
/// Capacity of the directory-entry table
pub const MAX_ENTRIES: usize = 256;
/// Maximum filename length in bytes
pub const MAX_FILENAME: usize = 255;

/// FAT cell value marking an unallocated block
pub const FAT_FREE: u16 = 0x0000;
/// FAT cell value marking the last block of a chain
pub const FAT_EOC: u16 = 0xFFFF;

/// Entry index of the root directory
pub const ROOT_ENTRY: u32 = 0;

/// Content of the sample file seeded into a fresh volume
const README_NAME: &str = "readme.txt";
const README_CONTENT: &str = "This is a virtual FAT file system.\nWelcome to mysh!\n";

/// The whole volume state.
///
/// The entry table only ever grows: removal tombstones a slot by clearing
/// its used flag, and creation reuses tombstoned slots before growing.
#[derive(Clone, PartialEq)]
pub struct FatVolume {
	/// One cell per block: free, end-of-chain, or successor index
	fat: Vec<u16>,
	/// Directory entries, index 0 is always the root
	entries: Vec<DirEntry>,
	/// Block data
	blocks: Vec<[u8; BLOCK_SIZE]>,
	/// Entry index anchoring relative path resolution
	current_dir: u32,
}

impl FatVolume {
	/// Builds a fresh volume: an empty FAT, the root directory and a
	/// sample readme file occupying the first block.
	pub fn fresh() -> Self {
		let now = timestamp();
		let mut volume = Self {
			fat: vec![FAT_FREE; N_BLOCKS],
			entries: Vec::new(),
			blocks: vec![[0u8; BLOCK_SIZE]; N_BLOCKS],
			current_dir: ROOT_ENTRY,
		};

		volume
			.entries
			.push(DirEntry::new_dir("/", ROOT_ENTRY, now));

		let content = README_CONTENT.as_bytes();
		volume.blocks[0][..content.len()].copy_from_slice(content);
		volume.fat[0] = FAT_EOC;
		let mut readme = DirEntry::new_file(README_NAME, ROOT_ENTRY, now);
		readme.size = content.len() as u32;
		readme.first_block = 0;
		volume.entries.push(readme);

		volume
	}

	/// Loads the volume from an image file, falling back to a fresh volume
	/// (persisted immediately) when the image is absent or unreadable.
	pub fn load_or_create(image: &Path) -> Self {
		match Self::load(image) {
			Ok(volume) => {
				info!("loaded existing file system from {}", image.display());
				volume
			}
			Err(err) => {
				info!("creating new file system ({})", err);
				let volume = Self::fresh();
				if let Err(err) = volume.save(image) {
					warn!("failed to persist fresh volume: {}", err);
				}
				volume
			}
		}
	}

	/// High-water mark of the entry table.
	pub fn num_entries(&self) -> usize {
		self.entries.len()
	}

	/// Index of the current directory.
	pub fn cwd(&self) -> u32 {
		self.current_dir
	}
}

/// Wall-clock seconds since the epoch.
pub(crate) fn timestamp() -> i64 {
	match SystemTime::now().duration_since(UNIX_EPOCH) {
		Ok(elapsed) => elapsed.as_secs() as i64,
		Err(_) => 0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fresh_volume_has_root_and_readme() {
		let volume = FatVolume::fresh();
		assert_eq!(volume.num_entries(), 2);
		assert_eq!(volume.cwd(), ROOT_ENTRY);

		let root = volume.entry(ROOT_ENTRY);
		assert!(root.is_used());
		assert!(root.is_dir());
		assert_eq!(root.name(), "/");
		assert_eq!(root.first_block, FAT_EOC);

		let readme = volume.resolve("/readme.txt").unwrap();
		let data = volume.read_file(readme).unwrap();
		assert_eq!(data, README_CONTENT.as_bytes());
	}

	#[test]
	fn fresh_volume_uses_exactly_one_block() {
		let volume = FatVolume::fresh();
		assert_eq!(volume.fat[0], FAT_EOC);
		assert!(volume.fat[1..].iter().all(|&cell| cell == FAT_FREE));
	}
}
