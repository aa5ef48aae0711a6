//! # Playback Engine
//!
//! Drives one open video: decodes frames by index into buffers taken from
//! the [`FramePipeline`], and implements the transport controls.
//!
//! ```text
//!   Idle/Stopped --load--> Previewing --play--> Playing --pause--> Paused
//!                              ^                  |  ^               |
//!                              +----rewind--------+  +-----play------+
//!   any loaded state --stop / end of stream--> Stopped
//! ```
//!
//! The engine owns the decode cursor. The video source is random access, so
//! seeking is just moving that cursor.

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

use crate::config::PlayerConfig;
use crate::cursor::FileContext;
use crate::fmt::{debug, debug_format, info, warn};
use crate::pipeline::{FramePipeline, FrameSlot};
use crate::profile::{Profiler, TickSource, TimingRegion};
use crate::Idle;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// What we learn about a video when we open it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VideoInfo {
	/// How many frames the video holds.
	pub frame_count: u32,
}

/// The decoder.
pub trait VideoSource {
	/// Whatever the decoder reports when it fails.
	type Error: core::fmt::Debug;

	/// Open `file` for decoding.
	fn open(&mut self, file: &FileContext) -> Result<VideoInfo, Self::Error>;

	/// Decode frame `index` of the open file into `buffer`.
	fn decode_frame(&mut self, index: u32, buffer: &mut [u8]) -> Result<(), Self::Error>;

	/// Close the open file. Does nothing if no file is open.
	fn close(&mut self);
}

/// Access to the memory behind the pipeline's buffers.
pub trait FrameStore {
	/// The bytes of the buffer `slot` names. Holding the slot means nobody
	/// else is touching them.
	fn frame_mut(&mut self, slot: &FrameSlot) -> &mut [u8];
}

/// Where the engine is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
	/// Nothing loaded yet.
	Idle,
	/// A still frame is on screen, waiting for Play.
	Previewing,
	/// Frames are being decoded and queued.
	Playing,
	/// Playback is suspended; the last frame stays on screen.
	Paused,
	/// The file has been closed and its buffers returned.
	Stopped,
}

/// Why [`PlaybackEngine::play`] returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayOutcome {
	/// The last frame went out, or the decoder failed. The engine is
	/// `Stopped`.
	EndOfStream,
	/// The cancel check fired. The engine is still `Playing` and will carry
	/// on from the next frame.
	Interrupted,
}

/// Decodes one video into the frame pipeline.
pub struct PlaybackEngine<'p, V, S, T, const N: usize> {
	source: V,
	store: S,
	pipeline: &'p FramePipeline<N>,
	profiler: Profiler<T>,
	config: PlayerConfig,
	state: PlaybackState,
	loaded: bool,
	position: u32,
	frame_count: u32,
	/// The frame at `position` is already queued as a preview.
	previewed: bool,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<'p, V, S, T, const N: usize> PlaybackEngine<'p, V, S, T, N>
where
	V: VideoSource,
	S: FrameStore,
	T: TickSource,
{
	/// Create an idle engine.
	pub fn new(
		source: V,
		store: S,
		pipeline: &'p FramePipeline<N>,
		profiler: Profiler<T>,
		config: PlayerConfig,
	) -> PlaybackEngine<'p, V, S, T, N> {
		PlaybackEngine {
			source,
			store,
			pipeline,
			profiler,
			config,
			state: PlaybackState::Idle,
			loaded: false,
			position: 0,
			frame_count: 0,
			previewed: false,
		}
	}

	/// Open `file` and put its first frame on screen.
	///
	/// Anything already loaded is stopped first. On failure the engine is
	/// left with nothing loaded.
	pub fn load<I>(&mut self, file: &FileContext, idle: &mut I) -> Result<VideoInfo, V::Error>
	where
		I: Idle,
	{
		self.stop();
		let span = self.profiler.begin(TimingRegion::Load);
		let info = match self.source.open(file) {
			Ok(info) => info,
			Err(e) => {
				warn!("Could not open {}: {:?}", file.name(), debug_format(&e));
				self.profiler.end(span);
				return Err(e);
			}
		};
		info!("Loaded {} ({} frames)", file.name(), info.frame_count);
		self.loaded = true;
		self.position = 0;
		self.previewed = false;
		self.frame_count = info.frame_count;
		self.preview(idle);
		self.profiler.end(span);
		Ok(info)
	}

	/// Show the frame at the decode cursor as a still, without moving the
	/// cursor. The next [`play`](Self::play) starts after it. Returns
	/// `false` if there was no frame to show.
	pub fn preview<I>(&mut self, idle: &mut I) -> bool
	where
		I: Idle,
	{
		if !self.loaded {
			return false;
		}
		self.state = PlaybackState::Previewing;
		if self.position >= self.frame_count {
			return false;
		}
		let span = self.profiler.begin(TimingRegion::Preview);
		let shown = self.emit_frame(idle).is_ok();
		self.profiler.end(span);
		self.previewed = shown;
		shown
	}

	/// Decode and queue frames until the video ends or `cancel` returns
	/// `true`.
	///
	/// `cancel` is checked before each frame, never half-way through one.
	pub fn play<I, C>(&mut self, idle: &mut I, cancel: C) -> PlayOutcome
	where
		I: Idle,
		C: Fn() -> bool,
	{
		if !self.loaded {
			return PlayOutcome::EndOfStream;
		}
		if self.previewed {
			self.previewed = false;
			self.position += 1;
		}
		debug!("Play from frame {}", self.position);
		self.state = PlaybackState::Playing;
		loop {
			if cancel() {
				debug!("Play interrupted at frame {}", self.position);
				return PlayOutcome::Interrupted;
			}
			if self.position >= self.frame_count {
				info!("End of stream");
				self.stop();
				return PlayOutcome::EndOfStream;
			}
			if self.emit_frame(idle).is_err() {
				self.stop();
				return PlayOutcome::EndOfStream;
			}
			self.position += 1;
		}
	}

	/// Suspend playback. Only has an effect while playing.
	pub fn pause(&mut self) {
		if self.state == PlaybackState::Playing {
			debug!("Pause at frame {}", self.position);
			self.state = PlaybackState::Paused;
		}
	}

	/// Skip forward one stride.
	///
	/// Returns `false`, without moving, if that would land on or past the
	/// end of the video.
	pub fn fast_forward(&mut self) -> bool {
		if !self.loaded {
			return false;
		}
		match self.position.checked_add(self.config.fast_forward_frames) {
			Some(target) if target < self.frame_count => {
				debug!("Fast forward {} -> {}", self.position, target);
				self.position = target;
				self.previewed = false;
				true
			}
			_ => {
				debug!("Fast forward from {} is out of bounds", self.position);
				false
			}
		}
	}

	/// Skip back one stride, stopping at the first frame. The caller
	/// re-primes the preview.
	pub fn rewind(&mut self) {
		if !self.loaded {
			return;
		}
		let target = self.position.saturating_sub(self.config.rewind_frames);
		debug!("Rewind {} -> {}", self.position, target);
		self.position = target;
		self.previewed = false;
		self.state = PlaybackState::Previewing;
	}

	/// Close the file and give every queued buffer back. Safe to call more
	/// than once.
	pub fn stop(&mut self) {
		if !self.loaded {
			return;
		}
		let reclaimed = self.pipeline.reclaim();
		self.source.close();
		self.loaded = false;
		self.previewed = false;
		self.state = PlaybackState::Stopped;
		debug!("Stopped, reclaimed {} buffers", reclaimed);
	}

	/// Acquire a buffer, decode the frame at the cursor into it and submit
	/// it. A buffer that fails to decode is handed back unsubmitted.
	fn emit_frame<I>(&mut self, idle: &mut I) -> Result<(), ()>
	where
		I: Idle,
	{
		let pipeline = self.pipeline;
		let slot = self
			.profiler
			.measure(TimingRegion::AcquireWait, || pipeline.acquire_free(idle));
		let index = self.position;
		let decoded = self.profiler.measure(TimingRegion::Decode, || {
			let buffer = self.store.frame_mut(&slot);
			self.source.decode_frame(index, buffer)
		});
		if let Err(e) = decoded {
			warn!("Decode of frame {} failed: {:?}", index, debug_format(&e));
			if let Err(e) = pipeline.release_unsubmitted(slot) {
				warn!("Could not release buffer: {:?}", e);
			}
			return Err(());
		}
		let submitted = self
			.profiler
			.measure(TimingRegion::Submit, || pipeline.submit(slot));
		submitted.map_err(|e| {
			warn!("Could not submit buffer: {:?}", e);
		})
	}

	/// Where we are.
	pub fn state(&self) -> PlaybackState {
		self.state
	}

	/// Is the decode loop meant to be running?
	pub fn is_playing(&self) -> bool {
		self.state == PlaybackState::Playing
	}

	/// Index of the next frame to decode, or of the frame being previewed.
	pub fn position(&self) -> u32 {
		self.position
	}

	/// Frames in the loaded video, or in the last one loaded.
	pub fn frame_count(&self) -> u32 {
		self.frame_count
	}

	/// The pipeline this engine feeds.
	pub fn pipeline(&self) -> &'p FramePipeline<N> {
		self.pipeline
	}

	/// The profiler this engine records into.
	pub fn profiler(&self) -> &Profiler<T> {
		&self.profiler
	}

	/// Mutable access to the profiler, for reports and resets.
	pub fn profiler_mut(&mut self) -> &mut Profiler<T> {
		&mut self.profiler
	}

	/// The decoder.
	pub fn source(&self) -> &V {
		&self.source
	}

	/// The frame memory.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// The seek strides and file filter in use.
	pub fn config(&self) -> &PlayerConfig {
		&self.config
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
