//! # VGA Driver for the Pico MPG Player
//!
//! VGA output uses 14 GPIO pins and two PIO state machines.
//!
//! It generates 640x480@60Hz standard VGA video, with a 25.2 MHz pixel clock
//! (the standard is 25.175 MHz, so we are 0.1% off). The assumption is that the
//! CPU is clocked at 126 MHz, i.e. 5x the pixel clock. All of the PIO code
//! relies on this assumption!
//!
//! Video frames are 160x120 pixels of 12-bit colour, and each pixel is drawn
//! as a 4x4 block. The frames live in [`NUM_OUTPUT_BUFFERS`] buffers whose
//! ownership is tracked by [`PIPELINE`]: the decoder fills a buffer and
//! submits it, and at the end of each displayed frame the DMA interrupt
//! flips the oldest submitted buffer onto the screen and hands the previous
//! one back. Core 1 renders scan-lines from whichever buffer is on screen, or
//! black if there isn't one.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2021
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

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use defmt::debug;
use pico_mpg_playback::{FramePipeline, FrameSlot, FrameStore, InitializationFault};
use rp_pico::hal::{
	self,
	multicore::{Multicore, Stack},
	pio::PIOExt,
};

use crate::pac;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Write access to the video frame buffers.
///
/// Only [`init`] makes one of these, and it holds no data: the buffers are
/// statics, and which one may be written is decided by the [`FrameSlot`]
/// handed out by [`PIPELINE`].
pub struct FrameMemory {
	_private: (),
}

/// One video frame, as little-endian [`RGBColour`] values in row order.
#[repr(C, align(4))]
#[derive(Copy, Clone)]
struct FrameBuffer([u8; FRAME_BYTES]);

/// Describes one scan-line's worth of pixels, including the length word required by the Pixel FIFO.
#[repr(C, align(16))]
struct LineBuffer {
	/// Must be one less than the number of pixel-pairs in `pixels`. This value
	/// is DMA'd to the FIFO, so `repr(C)` is important to ensure it isn't
	/// re-ordered.
	length: u32,
	/// Pixels to be displayed, grouped into pairs (to save FIFO space and reduce DMA bandwidth)
	pixels: [RGBColour; MAX_NUM_PIXEL_PAIRS_PER_LINE * 2],
	/// Set to `true` when the the main loop can fill this buffer with pixels.
	ready_for_drawing: AtomicBool,
	/// Which line number should the main loop draw here.
	line_number: AtomicU16,
}

/// Describes the polarity of a sync pulse.
///
/// Some pulses are positive (active-high), some are negative (active-low).
pub enum SyncPolarity {
	/// An active-high pulse
	Positive,
	/// An active-low pulse
	Negative,
}

/// Holds the four scan-line timing FIFO words we need for one scan-line.
///
/// See `make_timing` for a function which can generate these words. We DMA
/// them into the timing FIFO, so they must sit on a 16-byte boundary.
#[repr(C, align(16))]
struct ScanlineTimingBuffer {
	data: [u32; 4],
}

/// Holds the different kinds of scan-line timing buffers we need for various
/// portions of the screen.
struct TimingBuffer {
	/// We use this when there are visible pixels on screen
	visible_line: ScanlineTimingBuffer,
	/// We use this during the v-sync front-porch and v-sync back-porch
	vblank_porch_buffer: ScanlineTimingBuffer,
	/// We use this during the v-sync sync pulse
	vblank_sync_buffer: ScanlineTimingBuffer,
	/// The last visible scan-line,
	visible_lines_ends_at: u16,
	/// The last scan-line of the front porch
	front_porch_end_at: u16,
	/// The last scan-line of the sync pulse
	sync_pulse_ends_at: u16,
	/// The last scan-line of the back-porch (and the frame)
	back_porch_ends_at: u16,
}

/// Represents a 12-bit colour value.
///
/// Each channel has four-bits, and they are packed in `GBR` format. This is
/// so the PIO can shift them out right-first, and we have RED0 assigned to
/// the lowest GPIO pin.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct RGBColour(u16);

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// How many frame buffers the decoder and the display share.
pub const NUM_OUTPUT_BUFFERS: usize = 2;

/// Width of a video frame, in pixels.
pub const FRAME_WIDTH: usize = 160;

/// Height of a video frame, in pixels.
pub const FRAME_HEIGHT: usize = 120;

/// Bytes in one video frame.
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * 2;

/// Each frame pixel becomes a `SCALE` x `SCALE` block on screen.
const SCALE: usize = MAX_NUM_PIXELS_PER_LINE / FRAME_WIDTH;

/// How many pixels per scan-line.
///
/// Adjust the pixel PIO program to run at the right speed to the screen is
/// filled. For example, if this is only 320 but you are aiming at 640x480,
/// make the pixel PIO take twice as long per pixel.
const MAX_NUM_PIXELS_PER_LINE: usize = 640;

/// Maximum number of lines on screen.
const MAX_NUM_LINES: usize = 480;

/// How many pixel pairs we send out.
///
/// Each pixel is two 12-bit values packed into one 32-bit word. This is to
/// make more efficient use of DMA and FIFO resources.
const MAX_NUM_PIXEL_PAIRS_PER_LINE: usize = MAX_NUM_PIXELS_PER_LINE / 2;

/// Marks "no frame on screen" in [`DISPLAYED_FRAME`].
const NO_FRAME: u8 = u8::MAX;

/// Ownership of the frame buffers, shared by the decoder and the display.
pub static PIPELINE: FramePipeline<NUM_OUTPUT_BUFFERS> = FramePipeline::new();

/// The buffer Core 1 should scan out, or [`NO_FRAME`].
///
/// A copy of [`FramePipeline::displayed`] taken at each flip, so Core 1 can
/// read it without a critical section.
static DISPLAYED_FRAME: AtomicU8 = AtomicU8::new(NO_FRAME);

/// The video frame buffers.
///
/// Written by Core 0 through [`FrameMemory`], and read by Core 1 while a
/// buffer is on screen.
static mut FRAMES: [FrameBuffer; NUM_OUTPUT_BUFFERS] =
	[FrameBuffer([0; FRAME_BYTES]); NUM_OUTPUT_BUFFERS];

/// Core 1's stack.
static mut CORE1_STACK: Stack<1024> = Stack::new();

/// Stores our timing data which we DMA into the timing PIO State Machine
static TIMING_BUFFER: TimingBuffer = TimingBuffer::make_640x480();

/// Tracks which scan-line we are currently on (for timing purposes => it goes 0..`TIMING_BUFFER.back_porch_ends_at`)
static CURRENT_TIMING_LINE: AtomicU16 = AtomicU16::new(0);

/// Tracks which scan-line we are currently rendering (for pixel purposes => it goes 0..NUM_LINES)
static CURRENT_PLAYOUT_LINE: AtomicU16 = AtomicU16::new(0);

/// Somewhere to stash the DMA controller object, so the IRQ can find it
static mut DMA_PERIPH: Option<pac::DMA> = None;

/// DMA channel for the timing FIFO
const TIMING_DMA_CHAN: usize = 0;

/// DMA channel for the pixel FIFO
const PIXEL_DMA_CHAN: usize = 1;

/// One scan-line's worth of 12-bit pixels, used for the even scan-lines (0, 2, 4 ... NUM_LINES-2).
///
/// Gets read by DMA, which pushes them into the pixel state machine's FIFO.
///
/// Gets written to by `render_scanline()` running on Core 1.
static mut PIXEL_DATA_BUFFER_EVEN: LineBuffer = LineBuffer {
	length: 0,
	pixels: [colours::BLACK; MAX_NUM_PIXEL_PAIRS_PER_LINE * 2],
	ready_for_drawing: AtomicBool::new(false),
	line_number: AtomicU16::new(0),
};

/// One scan-line's worth of 12-bit pixels, used for the odd scan-lines (1, 3, 5 ... NUM_LINES-1).
///
/// Gets read by DMA, which pushes them into the pixel state machine's FIFO.
///
/// Gets written to by `render_scanline()` running on Core 1.
static mut PIXEL_DATA_BUFFER_ODD: LineBuffer = LineBuffer {
	length: 0,
	pixels: [colours::BLACK; MAX_NUM_PIXEL_PAIRS_PER_LINE * 2],
	ready_for_drawing: AtomicBool::new(false),
	line_number: AtomicU16::new(0),
};

/// A set of useful constants representing common RGB colours.
pub mod colours {
	/// The colour black
	pub const BLACK: super::RGBColour = super::RGBColour::new(0, 0, 0);
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Initialise all the static data and peripherals we need for our video display.
///
/// We need to keep `pio` and `dma` to run the video. We need `resets` to set
/// things up, so we only borrow that. The screen is black until the first
/// frame is submitted to [`PIPELINE`].
pub fn init(
	pio: pac::PIO0,
	dma: pac::DMA,
	resets: &mut pac::RESETS,
	psm: &mut pac::PSM,
	ppb: &mut pac::PPB,
	fifo: &mut hal::sio::SioFifo,
) -> Result<FrameMemory, InitializationFault> {
	// Grab PIO0 and the state machines it contains
	let (mut pio, sm0, sm1, _sm2, _sm3) = pio.split(resets);

	// This program runs the timing loop. We post timing data (i.e. the length
	// of each period, along with what the H-Sync and V-Sync pins should do)
	// and it sets the GPIO pins and busy-waits the appropriate amount of
	// time. It also takes an extra 'instruction' which we can use to trigger
	// the appropriate interrupts.
	//
	// Post <value:32> where value: <clock_cycles:14> <hsync:1> <vsync:1>
	// <instruction:16>
	//
	// The SM will execute the instruction (typically either a NOP or an IRQ),
	// set the H-Sync and V-Sync pins as desired, then wait the given number
	// of clock cycles.
	//
	// Note: autopull should be set to 32-bits, OSR is set to shift right.
	let timing_program = pio_proc::pio_asm!(
		".wrap_target"
		// Step 1. Push next 2 bits of OSR into `pins`, to set H-Sync and V-Sync
		"out pins, 2"
		// Step 2. Push last 14 bits of OSR into X for the timing loop.
		"out x, 14"
		// Step 3. Execute bottom 16-bits of OSR as an instruction. This take two cycles.
		"out exec, 16"
		// Spin until X is zero
		"loop0:"
			"jmp x-- loop0"
		".wrap"
	);

	// This is the video pixels program. It waits for an IRQ
	// (posted by the timing loop) then pulls pixel data from the FIFO. We post
	// the number of pixel pairs for that line, then the pixel data.
	//
	// Each pixel maps to the 12 RGB output pins (4 Red, 4 Green and 4
	// Blue) and is held for five clocks, i.e. one 25.2 MHz pixel clock.
	//
	// Note autopull should be set to 32-bits, OSR is set to shift right.
	let pixel_program = pio_proc::pio_asm!(
		".wrap_target"
		// Wait for timing state machine to start visible line
		"wait 1 irq 0"
		// Read the line length (in pixel-pairs)
		"out x, 32"
		"loop1:"
			// Write out first pixel - takes 5 clocks per pixel
			"out pins, 16 [4]"
			// Write out second pixel - takes 5 clocks per pixel (allowing one clock for the jump)
			"out pins, 16 [3]"
			// Repeat until all pixel pairs sent
			"jmp x-- loop1"
		// Clear all pins after visible section
		"mov pins null"
		".wrap"
	);

	// Note: Credit to
	// https://gregchadwick.co.uk/blog/playing-with-the-pico-pt5/ who had a
	// very similar idea to me, but wrote it up far better than I ever could.

	let timing_installed = pio
		.install(&timing_program.program)
		.map_err(|_| InitializationFault::Display)?;
	let (mut timing_sm, _, timing_fifo) =
		hal::pio::PIOBuilder::from_installed_program(timing_installed)
			.buffers(hal::pio::Buffers::OnlyTx)
			.out_pins(0, 2) // H-Sync is GPIO0, V-Sync is GPIO1
			.autopull(true)
			.out_shift_direction(hal::pio::ShiftDirection::Right)
			.pull_threshold(32)
			.build(sm0);
	timing_sm.set_pindirs([
		(0, hal::pio::PinDir::Output),
		(1, hal::pio::PinDir::Output),
	]);

	// Important notes!
	//
	// You must not set a clock_divider (other than 1.0) on the pixel state
	// machine. You might want the pixels to be twice as wide (or mode), but
	// enabling a clock divider adds a lot of jitter (i.e. the start each
	// each line differs by some number of 126 MHz clock cycles).

	let pixels_installed = pio
		.install(&pixel_program.program)
		.map_err(|_| InitializationFault::Display)?;
	let (mut pixel_sm, _, pixel_fifo) =
		hal::pio::PIOBuilder::from_installed_program(pixels_installed)
			.buffers(hal::pio::Buffers::OnlyTx)
			.out_pins(2, 12) // Red0 is GPIO2, Blue3 is GPIO13
			.autopull(true)
			.out_shift_direction(hal::pio::ShiftDirection::Right)
			.pull_threshold(32) // We read all 32-bits in each FIFO word
			.build(sm1);
	pixel_sm.set_pindirs((2..=13).map(|x| (x, hal::pio::PinDir::Output)));

	// Read from the timing buffer and write to the timing FIFO. We get an
	// IRQ when the transfer is complete (i.e. when line has been fully
	// loaded).
	dma.ch(TIMING_DMA_CHAN).ch_ctrl_trig().write(|w| {
		w.data_size().size_word();
		w.incr_read().set_bit();
		w.incr_write().clear_bit();
		unsafe { w.treq_sel().bits(timing_fifo.dreq_value()) };
		unsafe { w.chain_to().bits(TIMING_DMA_CHAN as u8) };
		unsafe { w.ring_size().bits(0) };
		w.ring_sel().clear_bit();
		w.bswap().clear_bit();
		w.irq_quiet().clear_bit();
		w.en().set_bit();
		w.sniff_en().clear_bit();
		w
	});
	dma.ch(TIMING_DMA_CHAN)
		.ch_read_addr()
		.write(|w| unsafe { w.bits(TIMING_BUFFER.visible_line.data.as_ptr() as usize as u32) });
	dma.ch(TIMING_DMA_CHAN)
		.ch_write_addr()
		.write(|w| unsafe { w.bits(timing_fifo.fifo_address() as usize as u32) });
	dma.ch(TIMING_DMA_CHAN)
		.ch_trans_count()
		.write(|w| unsafe { w.bits(TIMING_BUFFER.visible_line.data.len() as u32) });

	// Read from the pixel buffer (even first) and write to the pixel FIFO
	dma.ch(PIXEL_DMA_CHAN).ch_ctrl_trig().write(|w| {
		w.data_size().size_word();
		w.incr_read().set_bit();
		w.incr_write().clear_bit();
		unsafe { w.treq_sel().bits(pixel_fifo.dreq_value()) };
		unsafe { w.chain_to().bits(PIXEL_DMA_CHAN as u8) };
		unsafe { w.ring_size().bits(0) };
		w.ring_sel().clear_bit();
		w.bswap().clear_bit();
		w.irq_quiet().clear_bit();
		w.en().set_bit();
		w.sniff_en().clear_bit();
		w
	});

	// Note (unsafe): Core 1 is not running yet and the DMA IRQ is masked,
	// so nothing else is looking at the line buffers.
	let (even, odd) = unsafe {
		(
			&mut *core::ptr::addr_of_mut!(PIXEL_DATA_BUFFER_EVEN),
			&mut *core::ptr::addr_of_mut!(PIXEL_DATA_BUFFER_ODD),
		)
	};

	// This is where the data is coming from (the scan-line buffer)
	dma.ch(PIXEL_DMA_CHAN)
		.ch_read_addr()
		.write(|w| unsafe { w.bits(even.as_ptr()) });
	// This is where the data is going (the PIO FIFO)
	dma.ch(PIXEL_DMA_CHAN)
		.ch_write_addr()
		.write(|w| unsafe { w.bits(pixel_fifo.fifo_address() as usize as u32) });
	// This is the count of words to send, which is the size of the array plus one for the length field.
	dma.ch(PIXEL_DMA_CHAN)
		.ch_trans_count()
		.write(|w| unsafe { w.bits(MAX_NUM_PIXEL_PAIRS_PER_LINE as u32 + 1) });
	// Enable the DMA interrupts
	dma.inte0().write(|w| unsafe {
		w.inte0()
			.bits((1 << PIXEL_DMA_CHAN) | (1 << TIMING_DMA_CHAN))
	});

	// These are the length value given to the PIO FSMs. They must be one
	// less than the number of pixels we actually have, because of how the
	// PIO FSM loop works.
	even.length = (MAX_NUM_PIXEL_PAIRS_PER_LINE as u32) - 1;
	odd.length = (MAX_NUM_PIXEL_PAIRS_PER_LINE as u32) - 1;
	// Mark both buffers as ready for playing out, so the DMA gets going
	// before Core 1 starts rendering. They start out black.
	even.mark_rendering_done();
	odd.mark_rendering_done();

	// Start Core 1 before the DMA, so it is ready to render the first line.
	let mut mc = Multicore::new(psm, ppb, fifo);
	let cores = mc.cores();
	let core1 = &mut cores[1];
	// Note (unsafe): the stack is only handed out here, and `init` is only
	// called once.
	let stack = unsafe { &mut (*core::ptr::addr_of_mut!(CORE1_STACK)).mem };
	if core1.spawn(stack, || core1_main()).is_err() {
		defmt::error!("Could not start Core 1");
		return Err(InitializationFault::Display);
	}

	debug!("Core 1 running");

	// Enable the DMA
	dma.multi_chan_trigger()
		.write(|w| unsafe { w.bits((1 << PIXEL_DMA_CHAN) | (1 << TIMING_DMA_CHAN)) });

	debug!("DMA enabled");

	unsafe {
		// Hand off the DMA peripheral to the interrupt
		DMA_PERIPH = Some(dma);

		// Enable the interrupts (DMA_PERIPH has to be set first)
		cortex_m::interrupt::enable();
		pac::NVIC::unpend(pac::Interrupt::DMA_IRQ_0);
		pac::NVIC::unmask(pac::Interrupt::DMA_IRQ_0);
	}

	debug!("IRQs enabled");

	// We drop our state-machine and PIO objects here - this means the video
	// cannot be reconfigured at a later time, but they do keep on running
	// as-is.
	timing_sm.start();
	pixel_sm.start();

	debug!("State Machines running");

	Ok(FrameMemory { _private: () })
}

/// This function runs the video processing loop on Core 1.
///
/// It keeps the odd/even scan-line buffers updated, as per the contents of
/// the frame on screen.
fn core1_main() -> ! {
	loop {
		// Note (unsafe): Core 0 only touches these buffers' atomics once
		// `init` has finished.
		unsafe {
			render_scanline(&mut *core::ptr::addr_of_mut!(PIXEL_DATA_BUFFER_ODD));
			render_scanline(&mut *core::ptr::addr_of_mut!(PIXEL_DATA_BUFFER_EVEN));
		}
	}
}

/// Call this function whenever the DMA reports that it has completed a transfer.
///
/// We use this as a prompt to either start a transfer or more Timing words,
/// or a transfer or more pixel words.
///
/// # Safety
///
/// Only call this from the DMA IRQ handler.
#[link_section = ".data"]
#[inline(always)]
pub unsafe fn irq() {
	let dma: &mut pac::DMA = match (*core::ptr::addr_of_mut!(DMA_PERIPH)).as_mut() {
		Some(dma) => dma,
		None => {
			return;
		}
	};
	let status = dma.ints0().read().bits();

	// Check if this is a DMA interrupt for the sync DMA channel
	let timing_dma_chan_irq = (status & (1 << TIMING_DMA_CHAN)) != 0;

	// Check if this is a DMA interrupt for the line DMA channel
	let pixel_dma_chan_irq = (status & (1 << PIXEL_DMA_CHAN)) != 0;

	if timing_dma_chan_irq {
		// clear timing_dma_chan bit in DMA interrupt bitfield
		dma.ints0().write(|w| w.bits(1 << TIMING_DMA_CHAN));

		let old_timing_line = CURRENT_TIMING_LINE.load(Ordering::Relaxed);
		let next_timing_line = if old_timing_line == TIMING_BUFFER.back_porch_ends_at {
			// Wrap around
			0
		} else {
			// Keep going
			old_timing_line + 1
		};
		CURRENT_TIMING_LINE.store(next_timing_line, Ordering::Relaxed);

		let buffer = if next_timing_line <= TIMING_BUFFER.visible_lines_ends_at {
			// Visible lines
			&TIMING_BUFFER.visible_line
		} else if next_timing_line <= TIMING_BUFFER.front_porch_end_at {
			// VGA front porch before VGA sync pulse
			&TIMING_BUFFER.vblank_porch_buffer
		} else if next_timing_line <= TIMING_BUFFER.sync_pulse_ends_at {
			// Sync pulse
			&TIMING_BUFFER.vblank_sync_buffer
		} else {
			// VGA back porch following VGA sync pulse
			&TIMING_BUFFER.vblank_porch_buffer
		};
		dma.ch(TIMING_DMA_CHAN)
			.ch_al3_read_addr_trig()
			.write(|w| w.bits(buffer.data.as_ptr() as usize as u32))
	}

	if pixel_dma_chan_irq {
		dma.ints0().write(|w| w.bits(1 << PIXEL_DMA_CHAN));

		// A pixel DMA transfer is now complete. This only fires on visible
		// lines. We now need to queue the next DMA transfer.

		let last_playout_line = CURRENT_PLAYOUT_LINE.load(Ordering::Relaxed);

		let next_playout_line = if last_playout_line < TIMING_BUFFER.visible_lines_ends_at {
			last_playout_line + 1
		} else {
			0
		};

		let next_draw_line = if next_playout_line < TIMING_BUFFER.visible_lines_ends_at {
			next_playout_line + 1
		} else {
			0
		};

		// Core 1 has rendered the last line of this frame, and is about to
		// start on the first line of the next one.
		if next_draw_line == 0 {
			flip_frame();
		}

		let even = &*core::ptr::addr_of!(PIXEL_DATA_BUFFER_EVEN);
		let odd = &*core::ptr::addr_of!(PIXEL_DATA_BUFFER_ODD);

		// Set the DMA load address according to which line we are on. We use
		// the 'trigger' alias to restart the DMA at the same time as we write
		// the new read address. The DMA had stopped because the previous line
		// was transferred completely. The DMA will continue as and when the pixel
		// PIO FIFO needs more data.
		let (play_next, draw_next) = if (last_playout_line & 1) == 0 {
			// Just played an even line, so queue the odd buffer and render
			// into the even buffer.
			(odd, even)
		} else {
			(even, odd)
		};
		dma.ch(PIXEL_DMA_CHAN)
			.ch_al3_read_addr_trig()
			.write(|w| w.bits(play_next.as_ptr()));
		draw_next.set_ready(next_draw_line);

		CURRENT_PLAYOUT_LINE.store(next_playout_line, Ordering::Relaxed);
	}
}

/// Put the oldest submitted frame on screen, releasing the one it replaces.
///
/// Core 1 is pointed away from the old buffer before the pipeline can hand
/// it back to the decoder.
#[inline(always)]
fn flip_frame() {
	DISPLAYED_FRAME.store(NO_FRAME, Ordering::SeqCst);
	let shown = match PIPELINE.flip() {
		Some(index) => index as u8,
		None => NO_FRAME,
	};
	DISPLAYED_FRAME.store(shown, Ordering::SeqCst);
}

/// Performs the VGA rendering.
#[link_section = ".data"]
fn render_scanline(scan_line_buffer: &mut LineBuffer) {
	while !scan_line_buffer.is_ready_for_rendering() {
		// Wait for this buffer to be ready for us
		core::hint::spin_loop();
	}

	// Which line do we want?
	let current_line_num = scan_line_buffer.line_number.load(Ordering::SeqCst) as usize;
	let frame_row = current_line_num / SCALE;
	let shown = usize::from(DISPLAYED_FRAME.load(Ordering::SeqCst));

	if shown < NUM_OUTPUT_BUFFERS && frame_row < FRAME_HEIGHT {
		// Note (unsafe): the buffer on screen is not handed back to the
		// decoder until the flip after it leaves the screen, and we only
		// read it.
		let frame = unsafe { &*core::ptr::addr_of!(FRAMES[shown]) };
		let row_bytes = FRAME_WIDTH * 2;
		let row = &frame.0[frame_row * row_bytes..(frame_row + 1) * row_bytes];
		render_row(row, &mut scan_line_buffer.pixels);
	} else {
		scan_line_buffer.pixels.fill(colours::BLACK);
	}

	scan_line_buffer.mark_rendering_done();
}

/// Scale one row of frame pixels up to a full scan-line.
///
/// We bring this out into a function as making the loop run over fixed-size
/// chunks greatly speeds up the generated code.
#[link_section = ".data"]
fn render_row(row: &[u8], pixels: &mut [RGBColour; MAX_NUM_PIXELS_PER_LINE]) {
	for (source, block) in row.chunks_exact(2).zip(pixels.chunks_exact_mut(SCALE)) {
		let colour = RGBColour::from_raw(u16::from_le_bytes([source[0], source[1]]));
		block.fill(colour);
	}
}

impl FrameStore for FrameMemory {
	fn frame_mut(&mut self, slot: &FrameSlot) -> &mut [u8] {
		// Note (unsafe): holding `slot` means the display is not reading this
		// buffer, and `&mut self` means nobody else on this core is writing it.
		unsafe { &mut (*core::ptr::addr_of_mut!(FRAMES))[slot.index()].0 }
	}
}

impl LineBuffer {
	/// Convert the line buffer to a 32-bit address that the DMA engine understands.
	fn as_ptr(&self) -> u32 {
		self as *const _ as usize as u32
	}

	/// Mark that this buffer is ready to be rendered into.
	fn set_ready(&self, line_number: u16) {
		self.line_number.store(line_number, Ordering::SeqCst);
		self.ready_for_drawing.store(true, Ordering::SeqCst);
	}

	/// Mark that this buffer has been rendered into and is ready for playout.
	fn mark_rendering_done(&self) {
		self.ready_for_drawing.store(false, Ordering::SeqCst);
	}

	/// Report whether DMA is using this line
	fn is_ready_for_rendering(&self) -> bool {
		self.ready_for_drawing.load(Ordering::Relaxed)
	}
}

impl SyncPolarity {
	const fn enabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => true,
			SyncPolarity::Negative => false,
		}
	}

	const fn disabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => false,
			SyncPolarity::Negative => true,
		}
	}
}

impl ScanlineTimingBuffer {
	/// Create a timing buffer for each scan-line in the V-Sync visible portion.
	///
	/// The timings are in the order (front-porch, sync, back-porch, visible) and are in pixel clocks.
	const fn new_v_visible(
		hsync: SyncPolarity,
		vsync: SyncPolarity,
		timings: (u32, u32, u32, u32),
	) -> ScanlineTimingBuffer {
		ScanlineTimingBuffer {
			data: [
				// Front porch (as per the VGA timing standard)
				Self::make_timing(timings.0 * 5, hsync.disabled(), vsync.disabled(), false),
				// Sync pulse (as per the VGA timing standard)
				Self::make_timing(timings.1 * 5, hsync.enabled(), vsync.disabled(), false),
				// Back porch. Adjusted by a few clocks to account for interrupt +
				// PIO SM start latency.
				Self::make_timing(
					(timings.2 * 5) - 5,
					hsync.disabled(),
					vsync.disabled(),
					false,
				),
				// Visible portion. It also triggers the IRQ to start pixels
				// moving. Adjusted to compensate for changes made to previous
				// period to ensure scan-line remains at correct length.
				Self::make_timing(
					(timings.3 * 5) + 5,
					hsync.disabled(),
					vsync.disabled(),
					true,
				),
			],
		}
	}

	/// Create a timing buffer for each scan-line in the V-Sync front-porch and back-porch
	const fn new_v_porch(
		hsync: SyncPolarity,
		vsync: SyncPolarity,
		timings: (u32, u32, u32, u32),
	) -> ScanlineTimingBuffer {
		ScanlineTimingBuffer {
			data: [
				// Front porch (as per the VGA timing standard)
				Self::make_timing(timings.0 * 5, hsync.disabled(), vsync.disabled(), false),
				// Sync pulse (as per the VGA timing standard)
				Self::make_timing(timings.1 * 5, hsync.enabled(), vsync.disabled(), false),
				// Back porch.
				Self::make_timing(timings.2 * 5, hsync.disabled(), vsync.disabled(), false),
				// Visible portion.
				Self::make_timing(timings.3 * 5, hsync.disabled(), vsync.disabled(), false),
			],
		}
	}

	/// Create a timing buffer for each scan-line in the V-Sync pulse
	const fn new_v_pulse(
		hsync: SyncPolarity,
		vsync: SyncPolarity,
		timings: (u32, u32, u32, u32),
	) -> ScanlineTimingBuffer {
		ScanlineTimingBuffer {
			data: [
				// Front porch (as per the VGA timing standard)
				Self::make_timing(timings.0 * 5, hsync.disabled(), vsync.enabled(), false),
				// Sync pulse (as per the VGA timing standard)
				Self::make_timing(timings.1 * 5, hsync.enabled(), vsync.enabled(), false),
				// Back porch.
				Self::make_timing(timings.2 * 5, hsync.disabled(), vsync.enabled(), false),
				// Visible portion.
				Self::make_timing(timings.3 * 5, hsync.disabled(), vsync.enabled(), false),
			],
		}
	}

	/// Generate a 32-bit value we can send to the Timing FIFO.
	///
	/// * `period` - The length of this portion of the scan-line, in system clock ticks
	/// * `hsync` - true if the H-Sync pin should be high during this period, else false
	/// * `vsync` - true if the H-Sync pin should be high during this period, else false
	/// * `raise_irq` - true the timing statemachine should raise an IRQ at the start of this period
	///
	/// Returns a 32-bit value you can post to the Timing FIFO.
	const fn make_timing(period: u32, hsync: bool, vsync: bool, raise_irq: bool) -> u32 {
		let command = if raise_irq {
			// This command sets IRQ 0. It is the same as:
			//
			// ```
			// pio::InstructionOperands::IRQ {
			// 	clear: false,
			// 	wait: false,
			// 	index: 0,
			// 	relative: false,
			// }.encode()
			// ```
			//
			// Unfortunately encoding this isn't a const-fn, so we cheat:
			0xc000
		} else {
			// This command is a no-op (it moves Y into Y)
			//
			// ```
			// pio::InstructionOperands::MOV {
			// 	destination: pio::MovDestination::Y,
			// 	op: pio::MovOperation::None,
			// 	source: pio::MovSource::Y,
			// }.encode()
			// ```
			//
			// Unfortunately encoding this isn't a const-fn, so we cheat:
			0xa042
		};
		let mut value: u32 = 0;
		if hsync {
			value |= 1 << 0;
		}
		if vsync {
			value |= 1 << 1;
		}
		value |= (period - 6) << 2;
		value | command << 16
	}
}

impl TimingBuffer {
	/// Make a timing buffer suitable for 640 x 480 @ 60 Hz
	pub const fn make_640x480() -> TimingBuffer {
		TimingBuffer {
			visible_line: ScanlineTimingBuffer::new_v_visible(
				SyncPolarity::Negative,
				SyncPolarity::Negative,
				(16, 96, 48, 640),
			),
			vblank_porch_buffer: ScanlineTimingBuffer::new_v_porch(
				SyncPolarity::Negative,
				SyncPolarity::Negative,
				(16, 96, 48, 640),
			),
			vblank_sync_buffer: ScanlineTimingBuffer::new_v_pulse(
				SyncPolarity::Negative,
				SyncPolarity::Negative,
				(16, 96, 48, 640),
			),
			visible_lines_ends_at: 479,
			front_porch_end_at: 479 + 10,
			sync_pulse_ends_at: 479 + 10 + 2,
			back_porch_ends_at: 479 + 10 + 2 + 33,
		}
	}
}

impl RGBColour {
	/// Make a 12-bit RGB Colour from 8-bit red, green and blue values.
	pub const fn new(red: u8, green: u8, blue: u8) -> RGBColour {
		let red = (red >> 4) as u16;
		let green = (green >> 4) as u16;
		let blue = (blue >> 4) as u16;
		RGBColour((blue << 8) | (green << 4) | red)
	}

	/// Make a colour from a packed `GBR` value, as stored in a video frame.
	///
	/// The top four bits are ignored.
	pub const fn from_raw(value: u16) -> RGBColour {
		RGBColour(value & 0x0FFF)
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
