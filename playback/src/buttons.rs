//! # Push-button events
//!
//! The four push-buttons arrive as GPIO edge interrupts. The interrupt
//! handler runs each edge through a [`Debouncer`] and posts accepted presses
//! into a [`ButtonLatch`]. The main loop takes the whole latched
//! [`ButtonMask`] at once, so presses that land between two polls are
//! coalesced rather than queued.

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

use atomic_polyfill::{AtomicU8, Ordering};

use crate::Idle;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Which buttons have been pressed since the last poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMask(u8);

/// One button, by what it does.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
	/// Push Button 0
	PlayPause,
	/// Push Button 1
	LoadNext,
	/// Push Button 2
	FastForward,
	/// Push Button 3
	Rewind,
}

/// What a GPIO edge means for a button wired active-low.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
	/// The contacts closed.
	Pressed,
	/// The contacts opened.
	Released,
}

/// Single-producer, single-consumer hand-off from the button interrupt to
/// the main loop.
///
/// The interrupt side only ever ORs bits in (`Release`), the main loop only
/// ever swaps the whole value out (`Acquire`). Neither side blocks.
pub struct ButtonLatch {
	pending: AtomicU8,
}

/// Debounce state for `N` buttons.
///
/// A press is accepted when the button has been released since the last
/// accepted press and the line has been quiet for at least `window` ticks.
/// Any edge restarts the quiet period, so contact chatter on the way down or
/// on the way up never yields a second press.
pub struct Debouncer<const N: usize> {
	window: u64,
	buttons: [ButtonTrack; N],
}

#[derive(Copy, Clone)]
struct ButtonTrack {
	armed: bool,
	last_edge: Option<u64>,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// How many buttons the player has.
pub const NUM_BUTTONS: usize = 4;

/// All valid mask bits.
const ALL_BITS: u8 = 0x0F;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl ButtonMask {
	/// No buttons
	pub const NONE: ButtonMask = ButtonMask(0);
	/// Push Button 0
	pub const PLAY_PAUSE: ButtonMask = ButtonMask(1 << 0);
	/// Push Button 1
	pub const LOAD_NEXT: ButtonMask = ButtonMask(1 << 1);
	/// Push Button 2
	pub const FAST_FORWARD: ButtonMask = ButtonMask(1 << 2);
	/// Push Button 3
	pub const REWIND: ButtonMask = ButtonMask(1 << 3);

	/// Build a mask from raw bits. Bits above the four buttons are dropped.
	pub const fn from_bits(bits: u8) -> ButtonMask {
		ButtonMask(bits & ALL_BITS)
	}

	/// Get the raw bits.
	pub const fn bits(self) -> u8 {
		self.0
	}

	/// No button is set.
	pub const fn is_empty(self) -> bool {
		self.0 == 0
	}

	/// Every bit of `other` is also set in `self`.
	pub const fn contains(self, other: ButtonMask) -> bool {
		(self.0 & other.0) == other.0
	}

	/// The one event to act on when several buttons are set.
	///
	/// Play/Pause wins over Load Next, which wins over Fast Forward, which
	/// wins over Rewind. The others are dropped.
	pub fn highest_priority(self) -> Option<ButtonEvent> {
		ButtonEvent::PRIORITY
			.iter()
			.copied()
			.find(|event| self.contains(event.mask()))
	}
}

impl core::ops::BitOr for ButtonMask {
	type Output = ButtonMask;

	fn bitor(self, rhs: ButtonMask) -> ButtonMask {
		ButtonMask(self.0 | rhs.0)
	}
}

impl core::ops::BitOrAssign for ButtonMask {
	fn bitor_assign(&mut self, rhs: ButtonMask) {
		self.0 |= rhs.0;
	}
}

impl From<ButtonEvent> for ButtonMask {
	fn from(event: ButtonEvent) -> ButtonMask {
		event.mask()
	}
}

impl ButtonEvent {
	/// Dispatch order, most important first.
	pub const PRIORITY: [ButtonEvent; NUM_BUTTONS] = [
		ButtonEvent::PlayPause,
		ButtonEvent::LoadNext,
		ButtonEvent::FastForward,
		ButtonEvent::Rewind,
	];

	/// Map a push-button number (0..=3) to its event.
	pub const fn from_index(index: usize) -> Option<ButtonEvent> {
		match index {
			0 => Some(ButtonEvent::PlayPause),
			1 => Some(ButtonEvent::LoadNext),
			2 => Some(ButtonEvent::FastForward),
			3 => Some(ButtonEvent::Rewind),
			_ => None,
		}
	}

	/// The push-button number for this event.
	pub const fn index(self) -> usize {
		match self {
			ButtonEvent::PlayPause => 0,
			ButtonEvent::LoadNext => 1,
			ButtonEvent::FastForward => 2,
			ButtonEvent::Rewind => 3,
		}
	}

	/// The mask bit for this event.
	pub const fn mask(self) -> ButtonMask {
		ButtonMask(1 << self.index())
	}
}

impl ButtonLatch {
	/// Create an empty latch. Usually lives in a `static`.
	pub const fn new() -> ButtonLatch {
		ButtonLatch {
			pending: AtomicU8::new(0),
		}
	}

	/// Post a press. Safe to call from interrupt context.
	pub fn raise(&self, mask: ButtonMask) {
		self.pending.fetch_or(mask.bits(), Ordering::Release);
	}

	/// Take everything posted so far and clear the latch.
	pub fn take(&self) -> ButtonMask {
		ButtonMask::from_bits(self.pending.swap(0, Ordering::Acquire))
	}

	/// Has anything been posted since the last [`take`](Self::take)?
	///
	/// Does not clear the latch; the decode loop uses this as its "stop
	/// requested" flag and leaves the mask for the session to dispatch.
	pub fn is_pending(&self) -> bool {
		self.pending.load(Ordering::Acquire) != 0
	}

	/// Block until at least one button has been pressed, then take the mask.
	pub fn wait<I>(&self, idle: &mut I) -> ButtonMask
	where
		I: Idle,
	{
		loop {
			let mask = self.take();
			if !mask.is_empty() {
				return mask;
			}
			idle.idle();
		}
	}
}

impl Default for ButtonLatch {
	fn default() -> Self {
		Self::new()
	}
}

impl<const N: usize> Debouncer<N> {
	/// Create a debouncer. `window` is in the same ticks as the timestamps
	/// later passed to [`update`](Self::update).
	pub const fn new(window: u64) -> Debouncer<N> {
		Debouncer {
			window,
			buttons: [ButtonTrack {
				armed: true,
				last_edge: None,
			}; N],
		}
	}

	/// Feed one edge seen on `button` at time `now`.
	///
	/// Returns `true` if this edge is a new, accepted press.
	pub fn update(&mut self, button: usize, edge: Edge, now: u64) -> bool {
		let window = self.window;
		let Some(track) = self.buttons.get_mut(button) else {
			return false;
		};
		let quiet = match track.last_edge {
			Some(last) => now.wrapping_sub(last) >= window,
			None => true,
		};
		track.last_edge = Some(now);
		match edge {
			Edge::Released => {
				track.armed = true;
				false
			}
			Edge::Pressed if track.armed && quiet => {
				track.armed = false;
				true
			}
			Edge::Pressed => false,
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mask_drops_unknown_bits() {
		assert_eq!(ButtonMask::from_bits(0xF3).bits(), 0x03);
	}

	#[test]
	fn event_index_round_trips() {
		for event in ButtonEvent::PRIORITY {
			assert_eq!(ButtonEvent::from_index(event.index()), Some(event));
		}
		assert_eq!(ButtonEvent::from_index(4), None);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
