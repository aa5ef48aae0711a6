//! # Push Buttons for the Pico MPG Player
//!
//! Four active-low push buttons, each with an edge interrupt. The interrupt
//! debounces the edges and raises accepted presses on [`LATCH`], where the
//! session controller finds them.
//!
//! | Button | GPIO | Action       |
//! |--------|------|--------------|
//! | 0      | 20   | Play / Pause |
//! | 1      | 21   | Load Next    |
//! | 2      | 22   | Fast Forward |
//! | 3      | 26   | Rewind       |

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
use defmt::{debug, trace};
use pico_mpg_playback::{ButtonEvent, ButtonLatch, Debouncer, Edge, InitializationFault};
use rp_pico::hal::{
	self,
	gpio::{DynPinId, FunctionSioInput, Interrupt, Pin, PullUp},
};

use crate::pac::{self, interrupt};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A button pin, with its pull-up enabled.
pub type ButtonPin = Pin<DynPinId, FunctionSioInput, PullUp>;

/// Everything the GPIO interrupt needs.
struct ButtonInputs {
	pins: [ButtonPin; NUM_BUTTONS],
	debouncer: Debouncer<NUM_BUTTONS>,
	timer: hal::Timer,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// How many buttons we have.
const NUM_BUTTONS: usize = 4;

/// Bounces closer together than this are ignored. The timer counts in
/// microseconds, so this is 20 ms.
const DEBOUNCE_TICKS: u64 = 20_000;

/// Accepted presses, waiting for the session controller.
pub static LATCH: ButtonLatch = ButtonLatch::new();

/// Handed to the interrupt by [`init`].
static BUTTONS: Mutex<RefCell<Option<ButtonInputs>>> = Mutex::new(RefCell::new(None));

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Enable the edge interrupts on the button pins and start listening.
///
/// The pins are given in button order. Fails if called twice.
pub fn init(pins: [ButtonPin; NUM_BUTTONS], timer: hal::Timer) -> Result<(), InitializationFault> {
	for pin in pins.iter() {
		pin.set_interrupt_enabled(Interrupt::EdgeLow, true);
		pin.set_interrupt_enabled(Interrupt::EdgeHigh, true);
	}

	let installed = critical_section::with(|cs| {
		let mut slot = BUTTONS.borrow(cs).borrow_mut();
		if slot.is_some() {
			return false;
		}
		*slot = Some(ButtonInputs {
			pins,
			debouncer: Debouncer::new(DEBOUNCE_TICKS),
			timer,
		});
		true
	});
	if !installed {
		return Err(InitializationFault::ButtonIrq);
	}

	unsafe {
		pac::NVIC::unpend(pac::Interrupt::IO_IRQ_BANK0);
		pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
	}

	debug!("Button IRQs enabled");
	Ok(())
}

impl ButtonInputs {
	/// Deal with every edge that has been seen since we last looked.
	fn service(&mut self) {
		let now = self.timer.get_counter().ticks();
		for (index, pin) in self.pins.iter_mut().enumerate() {
			for (interrupt, edge) in [
				(Interrupt::EdgeLow, Edge::Pressed),
				(Interrupt::EdgeHigh, Edge::Released),
			] {
				if !pin.interrupt_status(interrupt) {
					continue;
				}
				pin.clear_interrupt(interrupt);
				if self.debouncer.update(index, edge, now) {
					if let Some(event) = ButtonEvent::from_index(index) {
						trace!("Button {=usize} pressed", index);
						LATCH.raise(event.mask());
					}
				}
			}
		}
	}
}

/// Called when any GPIO in bank 0 changes.
#[interrupt]
fn IO_IRQ_BANK0() {
	critical_section::with(|cs| {
		if let Some(inputs) = BUTTONS.borrow(cs).borrow_mut().as_mut() {
			inputs.service();
		}
	});
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
