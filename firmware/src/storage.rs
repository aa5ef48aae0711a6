//! # SD Card Storage for the Pico MPG Player
//!
//! Videos live in the root directory of a FAT volume on the SD card. There
//! is no MPEG decoder on board, so a video file is a plain run of frames,
//! each [`FRAME_BYTES`] long and in the format the display scans out.

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

use core::cell::{Cell, RefCell};
use core::fmt::Write as _;

use defmt::{debug, info, warn};
use embedded_sdmmc::{
	BlockDevice, Directory, File, Mode, TimeSource, Timestamp, Volume, VolumeIdx, VolumeManager,
};
use pico_mpg_playback::{FileContext, Filesystem, InitializationFault, VideoInfo, VideoSource};

use crate::vga::FRAME_BYTES;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// We have no real-time clock, so every timestamp is the same.
pub struct FixedTime;

/// The mounted card, shared by the directory browser and the frame reader.
pub struct SdStore<D>
where
	D: BlockDevice,
{
	volume_mgr: RefCell<VolumeManager<D, FixedTime>>,
	volume: Volume,
	root: Cell<Option<Directory>>,
}

/// Walks the root directory of an [`SdStore`].
pub struct SdDirectory<'a, D>
where
	D: BlockDevice,
{
	store: &'a SdStore<D>,
	position: usize,
}

/// Reads raw video frames from files in the root directory.
pub struct RawFrameSource<'a, D>
where
	D: BlockDevice,
{
	store: &'a SdStore<D>,
	file: Option<File>,
	frame_count: u32,
}

/// Things that go wrong reading a video.
#[derive(Debug)]
pub enum SourceError<E>
where
	E: core::fmt::Debug,
{
	/// The card or filesystem reported an error.
	Storage(embedded_sdmmc::Error<E>),
	/// The root directory is not open.
	NoDirectory,
	/// No file is open.
	NotOpen,
	/// The file ended part-way through a frame.
	ShortRead,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl TimeSource for FixedTime {
	fn get_timestamp(&self) -> Timestamp {
		Timestamp {
			year_since_1970: 56,
			zero_indexed_month: 0,
			zero_indexed_day: 0,
			hours: 0,
			minutes: 0,
			seconds: 0,
		}
	}
}

impl<D> SdStore<D>
where
	D: BlockDevice,
{
	/// Mount the first volume on the card.
	pub fn mount(device: D) -> Result<SdStore<D>, InitializationFault> {
		let mut volume_mgr = VolumeManager::new(device, FixedTime);
		let volume = match volume_mgr.open_volume(VolumeIdx(0)) {
			Ok(volume) => volume,
			Err(e) => {
				warn!("Could not open volume 0: {:?}", defmt::Debug2Format(&e));
				return Err(InitializationFault::Mount);
			}
		};
		info!("Mounted volume 0");
		Ok(SdStore {
			volume_mgr: RefCell::new(volume_mgr),
			volume,
			root: Cell::new(None),
		})
	}

	/// Close the root directory (if open) and open it again.
	fn reopen_root(&self) -> Result<Directory, embedded_sdmmc::Error<D::Error>> {
		let mut volume_mgr = self.volume_mgr.borrow_mut();
		if let Some(old) = self.root.take() {
			volume_mgr.close_dir(old)?;
		}
		let root = volume_mgr.open_root_dir(self.volume)?;
		self.root.set(Some(root));
		Ok(root)
	}
}

impl<'a, D> SdDirectory<'a, D>
where
	D: BlockDevice,
{
	/// Browse the root directory of `store`.
	pub fn new(store: &'a SdStore<D>) -> SdDirectory<'a, D> {
		SdDirectory { store, position: 0 }
	}
}

impl<'a, D> Filesystem for SdDirectory<'a, D>
where
	D: BlockDevice,
{
	type Error = embedded_sdmmc::Error<D::Error>;

	fn begin_browse(&mut self) -> Result<(), Self::Error> {
		self.store.reopen_root()?;
		self.position = 0;
		Ok(())
	}

	fn browse_next(&mut self) -> Option<FileContext> {
		let root = self.store.root.get()?;
		let mut seen = 0;
		let mut found = None;
		// The volume manager only walks a whole directory, so skip the
		// entries we have already handed out.
		let result = self
			.store
			.volume_mgr
			.borrow_mut()
			.iterate_dir(root, |entry| {
				if found.is_some() || entry.attributes.is_directory() || entry.attributes.is_volume() {
					return;
				}
				if seen == self.position {
					let mut name: heapless::String<12> = heapless::String::new();
					if write!(name, "{}", entry.name).is_ok() {
						found = FileContext::new(name.as_str(), entry.size);
					}
				}
				seen += 1;
			});
		if let Err(e) = result {
			warn!("Directory read failed: {:?}", defmt::Debug2Format(&e));
			return None;
		}
		if found.is_some() {
			self.position += 1;
		}
		found
	}
}

impl<'a, D> RawFrameSource<'a, D>
where
	D: BlockDevice,
{
	/// Read videos from the root directory of `store`.
	pub fn new(store: &'a SdStore<D>) -> RawFrameSource<'a, D> {
		RawFrameSource {
			store,
			file: None,
			frame_count: 0,
		}
	}
}

impl<'a, D> VideoSource for RawFrameSource<'a, D>
where
	D: BlockDevice,
{
	type Error = SourceError<D::Error>;

	fn open(&mut self, file: &FileContext) -> Result<VideoInfo, Self::Error> {
		self.close();
		let root = self.store.root.get().ok_or(SourceError::NoDirectory)?;
		let mut volume_mgr = self.store.volume_mgr.borrow_mut();
		let handle = volume_mgr
			.open_file_in_dir(root, file.name(), Mode::ReadOnly)
			.map_err(SourceError::Storage)?;
		let length = match volume_mgr.file_length(handle) {
			Ok(length) => length,
			Err(e) => {
				if let Err(close) = volume_mgr.close_file(handle) {
					warn!("Close failed: {:?}", defmt::Debug2Format(&close));
				}
				return Err(SourceError::Storage(e));
			}
		};
		self.frame_count = length / FRAME_BYTES as u32;
		self.file = Some(handle);
		debug!("{=str}: {=u32} frames", file.name(), self.frame_count);
		Ok(VideoInfo {
			frame_count: self.frame_count,
		})
	}

	fn decode_frame(&mut self, index: u32, buffer: &mut [u8]) -> Result<(), Self::Error> {
		let file = self.file.ok_or(SourceError::NotOpen)?;
		if index >= self.frame_count {
			return Err(SourceError::ShortRead);
		}
		let mut volume_mgr = self.store.volume_mgr.borrow_mut();
		volume_mgr
			.file_seek_from_start(file, index * FRAME_BYTES as u32)
			.map_err(SourceError::Storage)?;
		let wanted = buffer.len().min(FRAME_BYTES);
		let mut filled = 0;
		while filled < wanted {
			let count = volume_mgr
				.read(file, &mut buffer[filled..wanted])
				.map_err(SourceError::Storage)?;
			if count == 0 {
				return Err(SourceError::ShortRead);
			}
			filled += count;
		}
		Ok(())
	}

	fn close(&mut self) {
		if let Some(file) = self.file.take() {
			if let Err(e) = self.store.volume_mgr.borrow_mut().close_file(file) {
				warn!("Close failed: {:?}", defmt::Debug2Format(&e));
			}
		}
		self.frame_count = 0;
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
