//! # Pico MPG Player playback logic
//!
//! Everything the player does between "a button was pressed" and "a frame
//! went to the display" lives here, with no hardware attached. The firmware
//! supplies the collaborators:
//!
//! * a [`cursor::Filesystem`] to enumerate the SD card,
//! * an [`engine::VideoSource`] that decodes frames by index,
//! * an [`engine::FrameStore`] giving access to the output buffer memory,
//! * a [`profile::TickSource`] for timing, and
//! * an [`Idle`] hook the blocking calls use while they wait for an
//!   interrupt.
//!
//! The buffers shared with the display DMA are tracked by a
//! [`pipeline::FramePipeline`], and button interrupts post into a
//! [`buttons::ButtonLatch`].

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

mod fmt;

pub mod buttons;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod session;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

pub use buttons::{ButtonEvent, ButtonLatch, ButtonMask, Debouncer, Edge};
pub use config::PlayerConfig;
pub use cursor::{FileContext, FileCursor, Filesystem};
pub use engine::{FrameStore, PlayOutcome, PlaybackEngine, PlaybackState, VideoInfo, VideoSource};
pub use error::{FilesystemFault, InitializationFault};
pub use pipeline::{FramePipeline, FrameSlot, PipelineError, PoolCounts};
pub use profile::{Profiler, RegionStats, TickSource, TimingRegion};
pub use session::{FileOutcome, Session};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Something to do while a blocking call waits for an interrupt.
///
/// On the Pico this is a `wfi`. Host tests use it to play the part of the
/// interrupt handlers (flip the display, press a button).
pub trait Idle {
	/// Wait a little. Must return so the caller can re-check its condition.
	fn idle(&mut self);
}

impl<F> Idle for F
where
	F: FnMut(),
{
	fn idle(&mut self) {
		self()
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
