//! # Frame Buffer Pipeline
//!
//! A fixed pool of `N` output buffers shared between the decoder (the
//! producer, on the main thread) and the display (the consumer, in
//! interrupt context or on the other core).
//!
//! Every buffer is owned by exactly one party at a time:
//!
//! ```text
//!            try_acquire / acquire_free          submit
//!   Free ----------------------------> Producer ---------> Queued
//!    ^                                    |                  |
//!    |         release_unsubmitted        |                  | consumer_take / flip
//!    +------------------------------------+                  v
//!    +------------------ consumer_release / flip -------- Consumer
//! ```
//!
//! `Queued` and `Consumer` both count as "owned by the consumer". Queued
//! buffers are handed over strictly in submission order.
//!
//! The ledger is only ever touched inside a `critical_section`, so the
//! producer and consumer can live in different execution contexts.

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

use core::cell::RefCell;

use critical_section::Mutex;

use crate::Idle;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The buffer pool and who owns which buffer.
pub struct FramePipeline<const N: usize> {
	ledger: Mutex<RefCell<Ledger<N>>>,
}

/// Proof of ownership of one buffer.
///
/// Deliberately neither `Clone` nor `Copy`: handing it back to the pipeline
/// gives the buffer away, so a buffer cannot be submitted or released twice
/// through the same handle.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a frame slot must be submitted or released"]
pub struct FrameSlot {
	index: u8,
	generation: u32,
}

/// How many buffers each party holds right now.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoolCounts {
	/// In the free pool.
	pub free: usize,
	/// Held by the decoder.
	pub producer: usize,
	/// Queued for, or held by, the display.
	pub consumer: usize,
}

/// A slot handed back to the pipeline did not match its ledger entry.
///
/// The ledger is left untouched when one of these is returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
	/// The buffer has been reclaimed and handed out again since this
	/// handle was issued.
	StaleSlot,
	/// The buffer is not in the state this call expects (for example a
	/// release of a buffer the consumer never took).
	WrongOwner,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SlotState {
	Free,
	Producer,
	/// Waiting for the consumer, with its submission sequence number.
	Queued(u32),
	Consumer,
	/// Given back while still on screen. Not handed out until the display
	/// has moved off it at the next flip.
	Draining,
}

struct Ledger<const N: usize> {
	slots: [SlotState; N],
	generation: [u32; N],
	next_seq: u32,
	on_screen: Option<u8>,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl FrameSlot {
	/// Which buffer this is, `0..N`.
	pub fn index(&self) -> usize {
		usize::from(self.index)
	}
}

impl PoolCounts {
	/// Should always equal `N`.
	pub fn total(&self) -> usize {
		self.free + self.producer + self.consumer
	}
}

impl core::fmt::Display for PipelineError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			PipelineError::StaleSlot => f.write_str("stale frame slot"),
			PipelineError::WrongOwner => f.write_str("frame slot not held by caller"),
		}
	}
}

impl<const N: usize> Ledger<N> {
	/// Does `slot` still name the buffer it was issued for, and is that
	/// buffer in `expected` state?
	fn check(&self, slot: &FrameSlot, expected: fn(SlotState) -> bool) -> Result<usize, PipelineError> {
		let index = slot.index();
		let state = *self.slots.get(index).ok_or(PipelineError::WrongOwner)?;
		if self.generation[index] != slot.generation {
			return Err(PipelineError::StaleSlot);
		}
		if !expected(state) {
			return Err(PipelineError::WrongOwner);
		}
		Ok(index)
	}

	/// The queued buffer with the lowest sequence number.
	fn oldest_queued(&self) -> Option<usize> {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(index, state)| match state {
				SlotState::Queued(seq) => Some((index, *seq)),
				_ => None,
			})
			.min_by_key(|(_, seq)| *seq)
			.map(|(index, _)| index)
	}

	fn free(&mut self, index: usize) {
		self.slots[index] = SlotState::Free;
		if self.on_screen == Some(index as u8) {
			self.on_screen = None;
		}
	}
}

impl<const N: usize> FramePipeline<N> {
	/// Create a pipeline with every buffer free. `N` must fit in a `u8`.
	pub const fn new() -> FramePipeline<N> {
		assert!(N > 0 && N <= u8::MAX as usize);
		FramePipeline {
			ledger: Mutex::new(RefCell::new(Ledger {
				slots: [SlotState::Free; N],
				generation: [0; N],
				next_seq: 0,
				on_screen: None,
			})),
		}
	}

	fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger<N>) -> R) -> R {
		critical_section::with(|cs| {
			let mut ledger = self.ledger.borrow(cs).borrow_mut();
			f(&mut ledger)
		})
	}

	/// Take the lowest-numbered free buffer, if there is one.
	pub fn try_acquire(&self) -> Option<FrameSlot> {
		self.with_ledger(|ledger| {
			let index = ledger.slots.iter().position(|s| *s == SlotState::Free)?;
			ledger.slots[index] = SlotState::Producer;
			ledger.generation[index] = ledger.generation[index].wrapping_add(1);
			Some(FrameSlot {
				index: index as u8,
				generation: ledger.generation[index],
			})
		})
	}

	/// Take a free buffer, calling `idle` until the consumer gives one back.
	pub fn acquire_free<I>(&self, idle: &mut I) -> FrameSlot
	where
		I: Idle,
	{
		loop {
			if let Some(slot) = self.try_acquire() {
				return slot;
			}
			idle.idle();
		}
	}

	/// Hand a filled buffer to the consumer queue.
	pub fn submit(&self, slot: FrameSlot) -> Result<(), PipelineError> {
		self.with_ledger(|ledger| {
			let index = ledger.check(&slot, |s| s == SlotState::Producer)?;
			ledger.slots[index] = SlotState::Queued(ledger.next_seq);
			ledger.next_seq = ledger.next_seq.wrapping_add(1);
			Ok(())
		})
	}

	/// Give back a buffer the producer acquired but never filled.
	pub fn release_unsubmitted(&self, slot: FrameSlot) -> Result<(), PipelineError> {
		self.with_ledger(|ledger| {
			let index = ledger.check(&slot, |s| s == SlotState::Producer)?;
			ledger.free(index);
			Ok(())
		})
	}

	/// Take the oldest queued buffer for display.
	pub fn consumer_take(&self) -> Option<FrameSlot> {
		self.with_ledger(|ledger| {
			let index = ledger.oldest_queued()?;
			ledger.slots[index] = SlotState::Consumer;
			Some(FrameSlot {
				index: index as u8,
				generation: ledger.generation[index],
			})
		})
	}

	/// The consumer has finished with a buffer; return it to the free pool.
	pub fn consumer_release(&self, slot: FrameSlot) -> Result<(), PipelineError> {
		self.with_ledger(|ledger| {
			let index = ledger.check(&slot, |s| s == SlotState::Consumer)?;
			ledger.free(index);
			Ok(())
		})
	}

	/// Called by the display at the end of every frame.
	///
	/// If a buffer is queued, it goes on screen and the buffer that was on
	/// screen goes back to the free pool. Otherwise the current buffer stays
	/// up. Returns the buffer to show next, if any.
	pub fn flip(&self) -> Option<usize> {
		self.with_ledger(|ledger| {
			for state in ledger.slots.iter_mut() {
				if *state == SlotState::Draining {
					*state = SlotState::Free;
				}
			}
			if let Some(next) = ledger.oldest_queued() {
				if let Some(old) = ledger.on_screen {
					ledger.free(usize::from(old));
				}
				ledger.slots[next] = SlotState::Consumer;
				ledger.on_screen = Some(next as u8);
			}
			ledger.on_screen.map(usize::from)
		})
	}

	/// The buffer on screen right now, if any.
	pub fn displayed(&self) -> Option<usize> {
		self.with_ledger(|ledger| ledger.on_screen.map(usize::from))
	}

	/// Return every buffer the consumer holds or has queued to the free
	/// pool, blanking the display. Buffers the producer holds are left
	/// alone. Returns how many buffers were reclaimed.
	///
	/// The buffer on screen may still be mid-scan, so it is counted as free
	/// but not handed out again until the next [`flip`](Self::flip).
	pub fn reclaim(&self) -> usize {
		self.with_ledger(|ledger| {
			let mut reclaimed = 0;
			let on_screen = ledger.on_screen.take().map(usize::from);
			for index in 0..N {
				if matches!(ledger.slots[index], SlotState::Queued(_) | SlotState::Consumer) {
					ledger.slots[index] = if on_screen == Some(index) {
						SlotState::Draining
					} else {
						SlotState::Free
					};
					reclaimed += 1;
				}
			}
			reclaimed
		})
	}

	/// Count the buffers by owner.
	pub fn counts(&self) -> PoolCounts {
		self.with_ledger(|ledger| {
			let mut counts = PoolCounts::default();
			for state in ledger.slots.iter() {
				match state {
					SlotState::Free | SlotState::Draining => counts.free += 1,
					SlotState::Producer => counts.producer += 1,
					SlotState::Queued(_) | SlotState::Consumer => counts.consumer += 1,
				}
			}
			counts
		})
	}
}

impl<const N: usize> Default for FramePipeline<N> {
	fn default() -> Self {
		Self::new()
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
