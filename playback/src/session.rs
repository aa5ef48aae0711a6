//! # Session Controller
//!
//! The player's main loop. Finds the next playable file, loads it, and then
//! turns button presses into engine calls until the file ends or the user
//! asks for the next one. It never returns unless the playlist itself
//! breaks.

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

use core::convert::Infallible;

use crate::buttons::{ButtonEvent, ButtonLatch};
use crate::cursor::{FileCursor, Filesystem};
use crate::engine::{FrameStore, PlayOutcome, PlaybackEngine, VideoSource};
use crate::error::FilesystemFault;
use crate::fmt::{debug, info, warn};
use crate::profile::{TickSource, TimingRegion};
use crate::Idle;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// How one pass through [`Session::play_next_file`] ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileOutcome {
	/// Played to the end (or the decoder gave up).
	Finished,
	/// The user pressed Load Next.
	Skipped,
	/// Fast Forward would have gone past the end.
	OutOfBounds,
	/// The file would not open.
	OpenFailed,
	/// The directory has nothing to play.
	NoPlayableFile,
}

/// Everything the main loop needs.
pub struct Session<'a, F, V, S, T, I, const N: usize> {
	cursor: FileCursor<F>,
	engine: PlaybackEngine<'a, V, S, T, N>,
	buttons: &'a ButtonLatch,
	idle: I,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<'a, F, V, S, T, I, const N: usize> Session<'a, F, V, S, T, I, N>
where
	F: Filesystem,
	V: VideoSource,
	S: FrameStore,
	T: TickSource,
	I: Idle,
{
	/// Bundle up the collaborators.
	pub fn new(
		cursor: FileCursor<F>,
		engine: PlaybackEngine<'a, V, S, T, N>,
		buttons: &'a ButtonLatch,
		idle: I,
	) -> Session<'a, F, V, S, T, I, N> {
		Session {
			cursor,
			engine,
			buttons,
			idle,
		}
	}

	/// Play files forever.
	///
	/// Only returns if the directory cannot be re-read.
	pub fn run(&mut self) -> Result<Infallible, FilesystemFault> {
		loop {
			let outcome = self.play_next_file()?;
			debug!("File done: {:?}", outcome);
		}
	}

	/// Find the next playable file and stay with it until it is done.
	pub fn play_next_file(&mut self) -> Result<FileOutcome, FilesystemFault> {
		let span = self.engine.profiler().begin(TimingRegion::FileSearch);
		let found = self.cursor.find_next();
		self.engine.profiler_mut().end(span);
		let Some(file) = found? else {
			warn!("No {} files found; press a button to look again", self.cursor.extension());
			let mask = self.buttons.wait(&mut self.idle);
			debug!("Rescan after {:?}", mask);
			return Ok(FileOutcome::NoPlayableFile);
		};
		info!("Found {} file {}", self.cursor.extension(), file.name());

		if self.engine.load(&file, &mut self.idle).is_err() {
			return Ok(FileOutcome::OpenFailed);
		}

		let outcome = self.control_loop();
		self.engine.stop();
		self.engine.profiler().report();
		self.engine.profiler_mut().reset();
		Ok(outcome)
	}

	/// Wait for buttons and act on them until the loaded file is done.
	fn control_loop(&mut self) -> FileOutcome {
		loop {
			info!("Press Push Button 0 to play video");
			let mask = self.buttons.wait(&mut self.idle);
			let was_playing = self.engine.is_playing();
			debug!("Buttons {:?}, playing {}", mask, was_playing);

			match mask.highest_priority() {
				Some(ButtonEvent::PlayPause) => {
					if was_playing {
						self.engine.pause();
						continue;
					}
				}
				Some(ButtonEvent::LoadNext) => {
					self.engine.stop();
					return FileOutcome::Skipped;
				}
				Some(ButtonEvent::FastForward) => {
					if !self.engine.fast_forward() {
						self.engine.stop();
						return FileOutcome::OutOfBounds;
					}
					self.engine.preview(&mut self.idle);
					if !was_playing {
						continue;
					}
				}
				Some(ButtonEvent::Rewind) => {
					self.engine.rewind();
					self.engine.preview(&mut self.idle);
					if !was_playing {
						continue;
					}
				}
				None => continue,
			}

			let buttons = self.buttons;
			match self.engine.play(&mut self.idle, || buttons.is_pending()) {
				PlayOutcome::EndOfStream => return FileOutcome::Finished,
				PlayOutcome::Interrupted => {}
			}
		}
	}

	/// The engine, for inspection.
	pub fn engine(&self) -> &PlaybackEngine<'a, V, S, T, N> {
		&self.engine
	}

	/// The file cursor, for inspection.
	pub fn cursor(&self) -> &FileCursor<F> {
		&self.cursor
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
