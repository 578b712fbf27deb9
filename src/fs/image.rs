// SPDX-License-Identifier: GPL-2.0

//! Volume image persistence.
//!
//! The image is a single blob with a fixed little-endian layout: the FAT
//! cells, all 256 entry records, the block data, then `num_entries` and
//! `current_dir`. Saving goes through a temporary file renamed over the
//! target so a crash mid-write never leaves a torn image.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fs::entry::{DirEntry, EntryFlags};
use crate::fs::{FatVolume, BLOCK_SIZE, MAX_ENTRIES, MAX_FILENAME, N_BLOCKS};

/// Bytes of the fixed filename field (name plus NUL padding)
const NAME_FIELD: usize = MAX_FILENAME + 1;
/// Bytes of one serialised entry record
const ENTRY_RECORD: usize = NAME_FIELD + 4 + 2 + 1 + 8 + 8 + 4;
/// Total image size in bytes
const IMAGE_SIZE: usize =
	N_BLOCKS * 2 + MAX_ENTRIES * ENTRY_RECORD + N_BLOCKS * BLOCK_SIZE + 4 + 4;

impl FatVolume {
	/// Serialises the volume to `path`, atomically.
	pub fn save(&self, path: &Path) -> Result<()> {
		let mut buf = Vec::with_capacity(IMAGE_SIZE);

		for &cell in &self.fat {
			buf.extend_from_slice(&cell.to_le_bytes());
		}
		for slot in 0..MAX_ENTRIES {
			match self.entries.get(slot) {
				Some(entry) => encode_entry(&mut buf, entry),
				None => buf.extend_from_slice(&[0u8; ENTRY_RECORD]),
			}
		}
		for block in &self.blocks {
			buf.extend_from_slice(block);
		}
		buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
		buf.extend_from_slice(&self.current_dir.to_le_bytes());

		let tmp = path.with_extension("img.tmp");
		fs::write(&tmp, &buf)?;
		fs::rename(&tmp, path)?;
		Ok(())
	}

	/// Reads a volume back from `path`. Any size or content mismatch is
	/// reported as an I/O error; callers fall back to a fresh volume.
	pub fn load(path: &Path) -> Result<Self> {
		let buf = fs::read(path)?;
		if buf.len() != IMAGE_SIZE {
			return Err(Error::Io);
		}

		let mut fat = Vec::with_capacity(N_BLOCKS);
		for idx in 0..N_BLOCKS {
			fat.push(read_u16(&buf, idx * 2));
		}

		let tail = N_BLOCKS * 2 + MAX_ENTRIES * ENTRY_RECORD + N_BLOCKS * BLOCK_SIZE;
		let num_entries = read_u32(&buf, tail) as usize;
		let current_dir = read_u32(&buf, tail + 4);
		if num_entries == 0 || num_entries > MAX_ENTRIES {
			return Err(Error::Io);
		}
		if current_dir as usize >= num_entries {
			return Err(Error::Io);
		}

		let mut entries = Vec::with_capacity(num_entries);
		for slot in 0..num_entries {
			let off = N_BLOCKS * 2 + slot * ENTRY_RECORD;
			entries.push(decode_entry(&buf[off..off + ENTRY_RECORD])?);
		}

		let mut blocks = vec![[0u8; BLOCK_SIZE]; N_BLOCKS];
		let data_base = N_BLOCKS * 2 + MAX_ENTRIES * ENTRY_RECORD;
		for (idx, block) in blocks.iter_mut().enumerate() {
			let off = data_base + idx * BLOCK_SIZE;
			block.copy_from_slice(&buf[off..off + BLOCK_SIZE]);
		}

		Ok(Self {
			fat,
			entries,
			blocks,
			current_dir,
		})
	}
}

fn encode_entry(buf: &mut Vec<u8>, entry: &DirEntry) {
	let mut name = [0u8; NAME_FIELD];
	let bytes = entry.name.as_bytes();
	name[..bytes.len()].copy_from_slice(bytes);
	buf.extend_from_slice(&name);
	buf.extend_from_slice(&entry.size.to_le_bytes());
	buf.extend_from_slice(&entry.first_block.to_le_bytes());
	buf.push(entry.flags.bits());
	buf.extend_from_slice(&entry.created.to_le_bytes());
	buf.extend_from_slice(&entry.modified.to_le_bytes());
	buf.extend_from_slice(&entry.parent.to_le_bytes());
}

fn decode_entry(record: &[u8]) -> Result<DirEntry> {
	let nul = record[..NAME_FIELD]
		.iter()
		.position(|&byte| byte == 0)
		.ok_or(Error::Io)?;
	let name = std::str::from_utf8(&record[..nul])
		.map_err(|_| Error::Io)?
		.to_string();

	Ok(DirEntry {
		name,
		size: read_u32(record, NAME_FIELD),
		first_block: read_u16(record, NAME_FIELD + 4),
		flags: EntryFlags::from_bits_truncate(record[NAME_FIELD + 6]),
		created: read_i64(record, NAME_FIELD + 7),
		modified: read_i64(record, NAME_FIELD + 15),
		parent: read_u32(record, NAME_FIELD + 23),
	})
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
	u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
	u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn read_i64(buf: &[u8], off: usize) -> i64 {
	i64::from_le_bytes([
		buf[off],
		buf[off + 1],
		buf[off + 2],
		buf[off + 3],
		buf[off + 4],
		buf[off + 5],
		buf[off + 6],
		buf[off + 7],
	])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn save_then_load_restores_identical_state() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mysh_fs.img");

		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.touch("/d/f").unwrap();
		volume.write_path("/d/f", &vec![b'y'; 1500], false).unwrap();
		volume.touch("/gone").unwrap();
		volume.rm("/gone").unwrap();
		volume.cd("/d").unwrap();

		volume.save(&path).unwrap();
		let loaded = FatVolume::load(&path).unwrap();
		assert!(loaded == volume);
	}

	#[test]
	fn image_has_fixed_size() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mysh_fs.img");
		FatVolume::fresh().save(&path).unwrap();
		assert_eq!(fs::metadata(&path).unwrap().len() as usize, IMAGE_SIZE);
	}

	#[test]
	fn load_rejects_missing_or_short_images() {
		let dir = tempfile::tempdir().unwrap();
		assert!(FatVolume::load(&dir.path().join("absent")).is_err());

		let short = dir.path().join("short.img");
		fs::write(&short, b"not an image").unwrap();
		assert_eq!(FatVolume::load(&short).err(), Some(Error::Io));
	}

	#[test]
	fn load_rejects_corrupt_counters() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mysh_fs.img");
		FatVolume::fresh().save(&path).unwrap();

		let mut buf = fs::read(&path).unwrap();
		let tail = buf.len() - 8;
		buf[tail..tail + 4].copy_from_slice(&0u32.to_le_bytes());
		fs::write(&path, &buf).unwrap();
		assert_eq!(FatVolume::load(&path).err(), Some(Error::Io));
	}

	#[test]
	fn load_or_create_falls_back_to_fresh() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mysh_fs.img");

		let volume = FatVolume::load_or_create(&path);
		assert_eq!(volume.num_entries(), 2);
		// The fresh volume was persisted for the next run.
		assert!(path.exists());
		let reloaded = FatVolume::load_or_create(&path);
		assert!(reloaded == volume);
	}
}
