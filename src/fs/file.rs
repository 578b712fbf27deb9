// SPDX-License-Identifier: GPL-2.0

//! Whole-file reads and writes over FAT chains.

use crate::error::{Error, Result};
use crate::fs::{timestamp, FatVolume, BLOCK_SIZE, FAT_EOC};

impl FatVolume {
	/// Replaces the entire content of a file entry.
	///
	/// The existing chain is released first. Blocks are then allocated one
	/// at a time and linked; if the volume runs out of space mid-write,
	/// every block allocated by this call is reclaimed and the entry is
	/// left holding no data.
	pub(crate) fn write_file(&mut self, idx: u32, data: &[u8]) -> Result<()> {
		{
			let entry = self.entry(idx);
			if !entry.is_used() {
				return Err(Error::NotFound);
			}
			if entry.is_dir() {
				return Err(Error::IsDirectory);
			}
		}

		let old = self.entry(idx).first_block;
		if old != FAT_EOC {
			self.free_chain(old);
		}

		if data.is_empty() {
			let entry = self.entry_mut(idx);
			entry.first_block = FAT_EOC;
			entry.size = 0;
			entry.modified = timestamp();
			return Ok(());
		}

		let blocks_needed = (data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
		let mut first = FAT_EOC;
		let mut prev = FAT_EOC;

		for i in 0..blocks_needed {
			let block = match self.alloc_block() {
				Some(block) => block,
				None => {
					if first != FAT_EOC {
						self.free_chain(first);
					}
					let entry = self.entry_mut(idx);
					entry.first_block = FAT_EOC;
					entry.size = 0;
					return Err(Error::OutOfSpace);
				}
			};

			let offset = i * BLOCK_SIZE;
			let chunk = &data[offset..data.len().min(offset + BLOCK_SIZE)];
			self.blocks[block as usize][..chunk.len()].copy_from_slice(chunk);

			if first == FAT_EOC {
				first = block;
			} else {
				self.fat[prev as usize] = block;
			}
			prev = block;
		}

		let entry = self.entry_mut(idx);
		entry.first_block = first;
		entry.size = data.len() as u32;
		entry.modified = timestamp();
		Ok(())
	}

	/// Reads the entire content of a file entry. An empty file yields an
	/// empty buffer.
	pub(crate) fn read_file(&self, idx: u32) -> Result<Vec<u8>> {
		let entry = self.entry(idx);
		if !entry.is_used() {
			return Err(Error::NotFound);
		}
		if entry.is_dir() {
			return Err(Error::IsDirectory);
		}

		let size = entry.size as usize;
		let mut data = Vec::with_capacity(size);
		let mut current = entry.first_block;

		while current != FAT_EOC && data.len() < size {
			let remaining = size - data.len();
			let take = remaining.min(BLOCK_SIZE);
			data.extend_from_slice(&self.blocks[current as usize][..take]);
			current = self.fat[current as usize];
		}

		Ok(data)
	}
}
