//! # File Cursor
//!
//! Turns the filesystem's "browse the directory" calls into an endless
//! playlist: [`FileCursor::find_next`] hands out each matching file in
//! directory order, and starts again from the top once the directory runs
//! out.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) The Pico MPG Player Developers, 2026
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use crate::error::{FilesystemFault, InitializationFault};
use crate::fmt::{debug, debug_format, info, trace, warn};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The filesystem operations the cursor needs.
pub trait Filesystem {
	/// Whatever the filesystem driver reports when it fails.
	type Error: core::fmt::Debug;

	/// Start (or restart) enumerating the directory from its first entry.
	fn begin_browse(&mut self) -> Result<(), Self::Error>;

	/// The next directory entry, or `None` once the enumeration is done.
	///
	/// A read error part-way through counts as the end of the directory.
	fn browse_next(&mut self) -> Option<FileContext>;
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
	name: heapless::String<MAX_NAME_LEN>,
	size: u32,
}

/// Walks a [`Filesystem`] looking for playable files.
pub struct FileCursor<F> {
	fs: F,
	extension: &'static str,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Longest name we keep: an 8.3 short name with its dot.
pub const MAX_NAME_LEN: usize = 12;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl FileContext {
	/// Describe a file. Returns `None` if the name does not fit in
	/// [`MAX_NAME_LEN`] bytes.
	pub fn new(name: &str, size: u32) -> Option<FileContext> {
		let mut stored = heapless::String::new();
		stored.push_str(name).ok()?;
		Some(FileContext { name: stored, size })
	}

	/// The file name, as the filesystem reported it.
	pub fn name(&self) -> &str {
		self.name.as_str()
	}

	/// The file size in bytes.
	pub fn size(&self) -> u32 {
		self.size
	}

	/// Everything after the last dot, or an empty string.
	pub fn extension(&self) -> &str {
		let name = self.name.as_str();
		match name.rfind('.') {
			Some(dot) => &name[dot + 1..],
			None => "",
		}
	}

	/// Does this file have extension `ext`?
	///
	/// `ext` may be given as `".MPG"` or `"MPG"`. FAT short names are upper
	/// case, but we compare without regard to case anyway.
	pub fn matches_extension(&self, ext: &str) -> bool {
		let wanted = ext.strip_prefix('.').unwrap_or(ext);
		!wanted.is_empty() && self.extension().eq_ignore_ascii_case(wanted)
	}
}

impl<F> FileCursor<F>
where
	F: Filesystem,
{
	/// Start browsing `fs` for files with the given extension.
	///
	/// Failing to open the directory at boot is an
	/// [`InitializationFault::Browse`].
	pub fn begin(mut fs: F, extension: &'static str) -> Result<FileCursor<F>, InitializationFault> {
		if let Err(e) = fs.begin_browse() {
			warn!("Begin browse failed: {:?}", debug_format(&e));
			return Err(InitializationFault::Browse);
		}
		Ok(FileCursor { fs, extension })
	}

	/// The extension we are filtering on.
	pub fn extension(&self) -> &'static str {
		self.extension
	}

	/// Advance one entry, matching or not.
	pub fn next(&mut self) -> Option<FileContext> {
		self.fs.browse_next()
	}

	/// Go back to the first entry of the directory.
	pub fn rewind(&mut self) -> Result<(), FilesystemFault> {
		self.fs.begin_browse().map_err(|e| {
			warn!("Re-begin browse failed: {:?}", debug_format(&e));
			FilesystemFault
		})
	}

	/// Find the next playable file, wrapping to the top of the directory
	/// when we hit the end.
	///
	/// Returns `Ok(None)` only when a whole pass from the top found nothing
	/// to play. Failing to restart the enumeration is a [`FilesystemFault`].
	pub fn find_next(&mut self) -> Result<Option<FileContext>, FilesystemFault> {
		let mut wrapped = false;
		loop {
			while let Some(file) = self.next() {
				if file.matches_extension(self.extension) {
					debug!("Found {} file {}", self.extension, file.name());
					return Ok(Some(file));
				}
				trace!("Skipping {}", file.name());
			}
			if wrapped {
				return Ok(None);
			}
			info!("Reached end of file list; re-begin file browse");
			self.rewind()?;
			wrapped = true;
		}
	}

	/// Get the filesystem back.
	pub fn into_inner(self) -> F {
		self.fs
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extension_match_ignores_dot_and_case() {
		let file = FileContext::new("CLIP.MPG", 10).unwrap();
		assert!(file.matches_extension(".MPG"));
		assert!(file.matches_extension("mpg"));
		assert!(!file.matches_extension(".TXT"));
		assert!(!file.matches_extension(""));
	}

	#[test]
	fn file_without_extension() {
		let file = FileContext::new("README", 10).unwrap();
		assert_eq!(file.extension(), "");
		assert!(!file.matches_extension("MPG"));
	}

	#[test]
	fn long_names_are_rejected() {
		assert!(FileContext::new("A_VERY_LONG_NAME.MPG", 1).is_none());
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
