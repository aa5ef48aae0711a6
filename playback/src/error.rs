//! The two ways the player can fail for good.
//!
//! Everything else (no file yet, end of a video, seeking off the end) is
//! ordinary control flow and never shows up here.

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

/// A collaborator failed to come up at boot. There is no second storage card
/// or display to fall back to, so the firmware halts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitializationFault {
	/// The SD card did not respond.
	Storage,
	/// No FAT volume could be mounted.
	Mount,
	/// The root directory could not be opened for browsing.
	Browse,
	/// The video output could not be started.
	Display,
	/// The push-button interrupts could not be registered.
	ButtonIrq,
}

/// The playlist could not be restarted after reaching the end of the
/// directory. Raised at run time; also unrecoverable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilesystemFault;

impl core::fmt::Display for InitializationFault {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let what = match self {
			InitializationFault::Storage => "SD card init failed",
			InitializationFault::Mount => "FAT mount failed",
			InitializationFault::Browse => "directory browse failed",
			InitializationFault::Display => "video display init failed",
			InitializationFault::ButtonIrq => "button interrupt init failed",
		};
		f.write_str(what)
	}
}

impl core::fmt::Display for FilesystemFault {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str("could not restart directory browse")
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
