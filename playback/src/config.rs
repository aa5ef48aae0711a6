//! Player tuning knobs.

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

/// Frames per second the stride defaults assume.
pub const NOMINAL_FRAME_RATE: u32 = 30;

/// How the session finds files and how far the seek buttons jump.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayerConfig {
	/// Only files with this extension are played. Compared without regard
	/// to case, with or without a leading dot.
	pub extension: &'static str,
	/// How many frames one press of Fast Forward skips.
	pub fast_forward_frames: u32,
	/// How many frames one press of Rewind goes back.
	pub rewind_frames: u32,
}

impl PlayerConfig {
	/// MPEG files, five seconds per seek press.
	pub const DEFAULT: PlayerConfig = PlayerConfig {
		extension: "MPG",
		fast_forward_frames: 5 * NOMINAL_FRAME_RATE,
		rewind_frames: 5 * NOMINAL_FRAME_RATE,
	};

	/// Change the seek distances, keeping everything else.
	pub const fn with_strides(self, fast_forward_frames: u32, rewind_frames: u32) -> PlayerConfig {
		PlayerConfig {
			fast_forward_frames,
			rewind_frames,
			..self
		}
	}
}

impl Default for PlayerConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
