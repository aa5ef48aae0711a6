//! Logging back-end selection.
//!
//! The firmware logs over RTT with `defmt`; the host build goes through the
//! `log` facade. Exactly one of the two features must be enabled.

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

#![allow(unused_imports)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("The `defmt` and `log` features are mutually exclusive");

#[cfg(not(any(feature = "defmt", feature = "log")))]
compile_error!("Enable one of the `defmt` or `log` features");

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, trace, warn};

#[cfg(feature = "log")]
pub(crate) use log::{debug, error, info, trace, warn};

/// Wrap a collaborator's error so either back-end can print it with `{:?}`.
#[cfg(feature = "defmt")]
pub(crate) fn debug_format<T: core::fmt::Debug>(value: &T) -> defmt::Debug2Format<'_, T> {
	defmt::Debug2Format(value)
}

/// Wrap a collaborator's error so either back-end can print it with `{:?}`.
#[cfg(not(feature = "defmt"))]
pub(crate) fn debug_format<T: core::fmt::Debug>(value: &T) -> &T {
	value
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
