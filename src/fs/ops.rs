// SPDX-License-Identifier: GPL-2.0

//! Namespace operations over the volume.

use crate::error::{Error, Result};
use crate::fs::entry::{validate_name, DirEntry, EntryFlags};
use crate::fs::{timestamp, FatVolume, FAT_EOC, ROOT_ENTRY};

impl FatVolume {
	/// Creates a directory at `path`.
	pub fn mkdir(&mut self, path: &str) -> Result<()> {
		let (parent, name) = self.split_parent(path)?;
		if !self.entry(parent).is_dir() {
			return Err(Error::NotDirectory);
		}
		validate_name(name)?;
		if self.find_entry(name, parent).is_some() {
			return Err(Error::AlreadyExists);
		}
		self.alloc_entry(DirEntry::new_dir(name, parent, timestamp()))?;
		Ok(())
	}

	/// Creates a file at `path`, or refreshes its modification time when
	/// it already exists.
	pub fn touch(&mut self, path: &str) -> Result<()> {
		let (parent, name) = self.split_parent(path)?;
		if !self.entry(parent).is_dir() {
			return Err(Error::NotDirectory);
		}
		validate_name(name)?;

		if let Some(existing) = self.find_entry(name, parent) {
			if self.entry(existing).is_dir() {
				return Err(Error::IsDirectory);
			}
			self.entry_mut(existing).modified = timestamp();
			return Ok(());
		}

		self.alloc_entry(DirEntry::new_file(name, parent, timestamp()))?;
		Ok(())
	}

	/// Removes a file, releasing its chain and tombstoning the slot.
	pub fn rm(&mut self, path: &str) -> Result<()> {
		let idx = self.resolve(path).ok_or(Error::NotFound)?;
		if self.entry(idx).is_dir() {
			return Err(Error::IsDirectory);
		}

		let first = self.entry(idx).first_block;
		if first != FAT_EOC {
			self.free_chain(first);
		}

		let entry = self.entry_mut(idx);
		entry.flags.remove(EntryFlags::USED);
		entry.first_block = FAT_EOC;
		entry.size = 0;
		Ok(())
	}

	/// Removes an empty directory. The root and the current directory are
	/// refused.
	pub fn rmdir(&mut self, path: &str) -> Result<()> {
		let idx = self.resolve(path).ok_or(Error::NotFound)?;
		if !self.entry(idx).is_dir() {
			return Err(Error::NotDirectory);
		}
		if idx == ROOT_ENTRY || idx == self.current_dir {
			return Err(Error::Busy);
		}
		let has_children = self
			.entries
			.iter()
			.enumerate()
			.any(|(i, entry)| i as u32 != idx && entry.is_used() && entry.parent == idx);
		if has_children {
			return Err(Error::NotEmpty);
		}

		self.entry_mut(idx).flags.remove(EntryFlags::USED);
		Ok(())
	}

	/// Moves or renames an entry.
	///
	/// When `dst` names an existing directory the source is moved into it
	/// keeping its name; an existing file destination is refused. Moving
	/// the root, or a directory into its own subtree, is refused.
	pub fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
		let src_idx = self.resolve(src).ok_or(Error::NotFound)?;
		if src_idx == ROOT_ENTRY {
			return Err(Error::InvalidArgument);
		}

		let (mut dest_parent, mut new_name) = {
			let (parent, name) = self.split_parent(dst)?;
			(parent, name.to_string())
		};
		if !self.entry(dest_parent).is_dir() {
			return Err(Error::NotDirectory);
		}

		if let Some(existing) = self.find_entry(&new_name, dest_parent) {
			if self.entry(existing).is_dir() {
				// Move into the directory, keeping the source name.
				dest_parent = existing;
				new_name = self.entry(src_idx).name.clone();
				if self.find_entry(&new_name, dest_parent).is_some() {
					return Err(Error::AlreadyExists);
				}
			} else {
				return Err(Error::AlreadyExists);
			}
		}

		validate_name(&new_name)?;

		// A directory must not become its own ancestor.
		let mut probe = dest_parent;
		loop {
			if probe == src_idx {
				return Err(Error::InvalidArgument);
			}
			if probe == ROOT_ENTRY {
				break;
			}
			probe = self.entry(probe).parent;
		}

		let entry = self.entry_mut(src_idx);
		entry.parent = dest_parent;
		entry.name = new_name;
		entry.modified = timestamp();
		Ok(())
	}

	/// Changes the current directory.
	pub fn cd(&mut self, path: &str) -> Result<()> {
		let idx = self.resolve(path).ok_or(Error::NotFound)?;
		if !self.entry(idx).is_dir() {
			return Err(Error::NotDirectory);
		}
		self.current_dir = idx;
		Ok(())
	}

	/// Absolute path of the current directory, rebuilt by walking parent
	/// links up to the root.
	pub fn cwd_path(&self) -> String {
		let mut idx = self.current_dir;
		if idx == ROOT_ENTRY {
			return String::from("/");
		}

		let mut names = Vec::new();
		while idx != ROOT_ENTRY {
			names.push(self.entry(idx).name.clone());
			idx = self.entry(idx).parent;
		}

		let mut path = String::new();
		for name in names.iter().rev() {
			path.push('/');
			path.push_str(name);
		}
		path
	}

	/// Reads a whole file by path.
	pub fn read(&self, path: &str) -> Result<Vec<u8>> {
		let idx = self.resolve(path).ok_or(Error::NotFound)?;
		self.read_file(idx)
	}

	/// Writes a whole file by path, creating it when absent. With
	/// `append` the new data is added after the existing content.
	pub fn write_path(&mut self, path: &str, data: &[u8], append: bool) -> Result<()> {
		let idx = match self.resolve(path) {
			Some(idx) => idx,
			None => {
				self.touch(path)?;
				self.resolve(path).ok_or(Error::NotFound)?
			}
		};
		if self.entry(idx).is_dir() {
			return Err(Error::IsDirectory);
		}

		if append {
			let mut combined = self.read_file(idx)?;
			combined.extend_from_slice(data);
			self.write_file(idx, &combined)
		} else {
			self.write_file(idx, data)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mkdir_and_touch_create_entries() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.touch("/d/f").unwrap();

		let d = volume.resolve("/d").unwrap();
		let f = volume.resolve("/d/f").unwrap();
		assert!(volume.entry(d).is_dir());
		assert!(!volume.entry(f).is_dir());
		assert_eq!(volume.entry(f).parent, d);
	}

	#[test]
	fn mkdir_refuses_duplicates() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		assert_eq!(volume.mkdir("/d"), Err(Error::AlreadyExists));
		assert_eq!(volume.touch("/d"), Err(Error::IsDirectory));
	}

	#[test]
	fn touch_refreshes_existing_files() {
		let mut volume = FatVolume::fresh();
		volume.touch("/f").unwrap();
		let before = volume.num_entries();
		volume.touch("/f").unwrap();
		assert_eq!(volume.num_entries(), before);
	}

	#[test]
	fn creation_under_a_file_parent_is_refused() {
		let mut volume = FatVolume::fresh();
		volume.touch("/f").unwrap();
		assert_eq!(volume.mkdir("/f/d"), Err(Error::NotDirectory));
		assert_eq!(volume.touch("/f/g"), Err(Error::NotDirectory));
	}

	#[test]
	fn rm_refuses_directories_and_missing_paths() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		assert_eq!(volume.rm("/d"), Err(Error::IsDirectory));
		assert_eq!(volume.rm("/nope"), Err(Error::NotFound));
	}

	#[test]
	fn rmdir_guards() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.touch("/d/f").unwrap();
		volume.touch("/plain").unwrap();

		assert_eq!(volume.rmdir("/"), Err(Error::Busy));
		assert_eq!(volume.rmdir("/plain"), Err(Error::NotDirectory));
		assert_eq!(volume.rmdir("/d"), Err(Error::NotEmpty));

		volume.cd("/d").unwrap();
		assert_eq!(volume.rmdir("/d"), Err(Error::Busy));
		volume.cd("/").unwrap();

		volume.rm("/d/f").unwrap();
		volume.rmdir("/d").unwrap();
		assert!(volume.resolve("/d").is_none());
	}

	#[test]
	fn mkdir_then_rmdir_toggles_one_slot() {
		let mut volume = FatVolume::fresh();
		// Ensure a tombstone exists so creation reuses a slot.
		volume.touch("/scratch").unwrap();
		volume.rm("/scratch").unwrap();
		let before = volume.num_entries();

		volume.mkdir("/d").unwrap();
		assert_eq!(volume.num_entries(), before);
		volume.rmdir("/d").unwrap();
		assert_eq!(volume.num_entries(), before);
	}

	#[test]
	fn rename_moves_into_existing_directory() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.touch("/f").unwrap();
		let original = volume.resolve("/f").unwrap();

		volume.rename("/f", "/d").unwrap();
		assert!(volume.resolve("/f").is_none());
		assert_eq!(volume.resolve("/d/f"), Some(original));
	}

	#[test]
	fn rename_renames_in_place() {
		let mut volume = FatVolume::fresh();
		volume.touch("/a").unwrap();
		let idx = volume.resolve("/a").unwrap();

		volume.rename("/a", "/b").unwrap();
		assert!(volume.resolve("/a").is_none());
		assert_eq!(volume.resolve("/b"), Some(idx));
		assert_eq!(volume.entry(idx).name(), "b");
	}

	#[test]
	fn rename_round_trip_restores_entry() {
		let mut volume = FatVolume::fresh();
		volume.touch("/a").unwrap();
		let idx = volume.resolve("/a").unwrap();
		let parent = volume.entry(idx).parent;

		volume.rename("/a", "/b").unwrap();
		volume.rename("/b", "/a").unwrap();
		assert_eq!(volume.resolve("/a"), Some(idx));
		assert_eq!(volume.entry(idx).parent, parent);
		assert_eq!(volume.entry(idx).name(), "a");
	}

	#[test]
	fn rename_refuses_collisions_and_root() {
		let mut volume = FatVolume::fresh();
		volume.touch("/a").unwrap();
		volume.touch("/b").unwrap();
		volume.mkdir("/d").unwrap();
		volume.touch("/d/a").unwrap();

		assert_eq!(volume.rename("/a", "/b"), Err(Error::AlreadyExists));
		assert_eq!(volume.rename("/a", "/d"), Err(Error::AlreadyExists));
		assert_eq!(volume.rename("/", "/x"), Err(Error::InvalidArgument));
		assert_eq!(volume.rename("/missing", "/x"), Err(Error::NotFound));
	}

	#[test]
	fn rename_refuses_cycles() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.mkdir("/d/sub").unwrap();
		assert_eq!(volume.rename("/d", "/d/sub"), Err(Error::InvalidArgument));
		assert_eq!(volume.rename("/d", "/d"), Err(Error::InvalidArgument));
	}

	#[test]
	fn cd_to_file_fails_and_keeps_cwd() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/d").unwrap();
		volume.cd("/d").unwrap();
		let cwd = volume.cwd();

		assert_eq!(volume.cd("/readme.txt"), Err(Error::NotDirectory));
		assert_eq!(volume.cd("/missing"), Err(Error::NotFound));
		assert_eq!(volume.cwd(), cwd);
	}

	#[test]
	fn cwd_path_walks_up_to_root() {
		let mut volume = FatVolume::fresh();
		assert_eq!(volume.cwd_path(), "/");

		volume.mkdir("/a").unwrap();
		volume.mkdir("/a/b").unwrap();
		volume.cd("/a/b").unwrap();
		assert_eq!(volume.cwd_path(), "/a/b");
	}

	#[test]
	fn write_path_appends_and_creates() {
		let mut volume = FatVolume::fresh();
		volume.write_path("/greet", b"hello\n", false).unwrap();
		volume.write_path("/greet", b"world\n", true).unwrap();
		assert_eq!(volume.read("/greet").unwrap(), b"hello\nworld\n");

		volume.write_path("/greet", b"reset\n", false).unwrap();
		assert_eq!(volume.read("/greet").unwrap(), b"reset\n");

		assert_eq!(
			volume.write_path("/", b"x", false),
			Err(Error::IsDirectory)
		);
	}

	#[test]
	fn parent_links_reach_root_without_cycles() {
		let mut volume = FatVolume::fresh();
		volume.mkdir("/a").unwrap();
		volume.mkdir("/a/b").unwrap();
		volume.touch("/a/b/c").unwrap();
		volume.rename("/a/b/c", "/").unwrap_err();

		for idx in 0..volume.num_entries() as u32 {
			if !volume.entry(idx).is_used() {
				continue;
			}
			let mut probe = idx;
			let mut steps = 0;
			while probe != ROOT_ENTRY {
				probe = volume.entry(probe).parent;
				steps += 1;
				assert!(steps <= volume.num_entries());
			}
			assert!(volume.entry(volume.entry(idx).parent).is_dir());
		}
	}
}
