//! # Pico MPG Player
//!
//! This is the firmware for the Pico MPG Player. It:
//!
//! * initialises the SD card, the VGA output and the push buttons,
//! * walks the root directory of the card for video files, and
//! * plays them one after another, under control of the four buttons.
//!
//! The firmware is started by having standard Cortex-M Interrupt Vector Table
//! at address `0x1000_0100`. This IVT is found and jumped to by the RP2040
//! boot block (`0x1000_0000` to `0x1000_00FF`).

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

#![no_std]
#![no_main]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

pub mod buttons;
pub mod storage;
pub mod vga;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::convert::Infallible;

use cortex_m_rt::entry;
use defmt::{error, info, unwrap};
use defmt_rtt as _;
use embedded_hal::digital::v2::OutputPin;
use fugit::RateExtU32;
use panic_probe as _;
use pico_mpg_playback::{
	FileCursor, FilesystemFault, InitializationFault, PlaybackEngine, PlayerConfig, Profiler,
	Session, TickSource,
};
use rp_pico::hal::{
	self,
	clocks::Clock,
	pac::{self, interrupt},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The SD card, on SPI0.
type SdCard = embedded_sdmmc::SdCard<
	hal::spi::Spi<
		hal::spi::Enabled,
		pac::SPI0,
		(
			hal::gpio::Pin<hal::gpio::bank0::Gpio19, hal::gpio::FunctionSpi, hal::gpio::PullDown>,
			hal::gpio::Pin<hal::gpio::bank0::Gpio16, hal::gpio::FunctionSpi, hal::gpio::PullDown>,
			hal::gpio::Pin<hal::gpio::bank0::Gpio18, hal::gpio::FunctionSpi, hal::gpio::PullDown>,
		),
		8,
	>,
	hal::gpio::Pin<hal::gpio::bank0::Gpio17, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>,
	cortex_m::delay::Delay,
>;

/// Why we stopped.
#[derive(Debug, defmt::Format)]
enum Fault {
	/// Something didn't come up at boot.
	Init(InitializationFault),
	/// The playlist could not be restarted.
	Filesystem(FilesystemFault),
}

/// The RP2040's 1 MHz timer, as a tick source for the profiler.
struct PicoTicks(hal::Timer);

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// This is the standard RP2040 bootloader. It must be stored in the first 256
/// bytes of the external SPI Flash chip. It will map the external SPI flash
/// chip to address `0x1000_0000` and jump to an Interrupt Vector Table at
/// address `0x1000_0100` (i.e. immediately after the bootloader).
///
/// See `memory.x` for a definition of the `.boot2` section.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// Firmware version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SPI clock while the card is being identified.
const SD_INIT_HZ: u32 = 400_000;

/// SPI clock once the card is up.
const SD_RUN_HZ: u32 = 16_000_000;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// This is the entry-point to the firmware. It is called by cortex-m-rt once
/// the `.bss` and `.data` sections have been initialised.
#[entry]
fn main() -> ! {
	cortex_m::interrupt::disable();

	info!("Pico MPG Player {=str} starting...", VERSION);

	match start() {
		Ok(never) => match never {},
		Err(fault) => halt(fault),
	}
}

/// Bring up the hardware, then play videos forever.
fn start() -> Result<Infallible, Fault> {
	// Grab the singleton containing all the RP2040 peripherals
	let mut pac = unwrap!(pac::Peripherals::take());
	// Grab the singleton containing all the generic Cortex-M peripherals
	let core = unwrap!(pac::CorePeripherals::take());

	// Reset the DMA engine. If we don't do this, starting from probe-run
	// (as opposed to a cold-start) is unreliable.
	pac.RESETS.reset().modify(|_r, w| w.dma().set_bit());
	cortex_m::asm::nop();
	pac.RESETS.reset().modify(|_r, w| w.dma().clear_bit());
	while pac.RESETS.reset_done().read().dma().bit_is_clear() {}

	// Needed by the clock setup
	let mut watchdog = hal::watchdog::Watchdog::new(pac.WATCHDOG);

	// Run at 126 MHz SYS_PLL, 48 MHz, USB_PLL

	let xosc = unwrap!(
		hal::xosc::setup_xosc_blocking(pac.XOSC, rp_pico::XOSC_CRYSTAL_FREQ.Hz()).map_err(|_x| false)
	);

	// Configure watchdog tick generation to tick over every microsecond
	watchdog.enable_tick_generation((rp_pico::XOSC_CRYSTAL_FREQ / 1_000_000) as u8);

	let mut clocks = hal::clocks::ClocksManager::new(pac.CLOCKS);

	let pll_sys = unwrap!(hal::pll::setup_pll_blocking(
		pac.PLL_SYS,
		xosc.operating_frequency(),
		hal::pll::PLLConfig {
			vco_freq: 1512.MHz(),
			refdiv: 1,
			post_div1: 6,
			post_div2: 2,
		},
		&mut clocks,
		&mut pac.RESETS,
	)
	.map_err(|_x| false));

	let pll_usb = unwrap!(hal::pll::setup_pll_blocking(
		pac.PLL_USB,
		xosc.operating_frequency(),
		hal::pll::common_configs::PLL_USB_48MHZ,
		&mut clocks,
		&mut pac.RESETS,
	)
	.map_err(|_x| false));

	unwrap!(clocks
		.init_default(&xosc, &pll_sys, &pll_usb)
		.map_err(|_x| false));

	info!("Clocks OK");

	let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
	let delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());

	// sio is the *Single-cycle Input/Output* peripheral. It has all our GPIO
	// pins, as well as some mailboxes and other useful things for inter-core
	// communications.
	let mut sio = hal::sio::Sio::new(pac.SIO);

	// Configure and grab all the RP2040 pins the Pico exposes.
	let pins = rp_pico::Pins::new(
		pac.IO_BANK0,
		pac.PADS_BANK0,
		sio.gpio_bank0,
		&mut pac.RESETS,
	);

	// Disable power save mode to force SMPS into low-efficiency, low-noise mode.
	let mut b_power_save = pins.b_power_save.into_push_pull_output();
	let _ = b_power_save.set_high();

	// Give H-Sync, V-Sync and 12 RGB colour pins to PIO0 to output video
	let _h_sync = pins.gpio0.into_function::<hal::gpio::FunctionPio0>();
	let _v_sync = pins.gpio1.into_function::<hal::gpio::FunctionPio0>();
	let _red0 = pins.gpio2.into_function::<hal::gpio::FunctionPio0>();
	let _red1 = pins.gpio3.into_function::<hal::gpio::FunctionPio0>();
	let _red2 = pins.gpio4.into_function::<hal::gpio::FunctionPio0>();
	let _red3 = pins.gpio5.into_function::<hal::gpio::FunctionPio0>();
	let _green0 = pins.gpio6.into_function::<hal::gpio::FunctionPio0>();
	let _green1 = pins.gpio7.into_function::<hal::gpio::FunctionPio0>();
	let _green2 = pins.gpio8.into_function::<hal::gpio::FunctionPio0>();
	let _green3 = pins.gpio9.into_function::<hal::gpio::FunctionPio0>();
	let _blue0 = pins.gpio10.into_function::<hal::gpio::FunctionPio0>();
	let _blue1 = pins.gpio11.into_function::<hal::gpio::FunctionPio0>();
	let _blue2 = pins.gpio12.into_function::<hal::gpio::FunctionPio0>();
	let _blue3 = pins.gpio13.into_function::<hal::gpio::FunctionPio0>();

	// SD card on SPI0
	let sd_miso = pins.gpio16.into_function::<hal::gpio::FunctionSpi>();
	let sd_cs = pins.gpio17.into_push_pull_output();
	let sd_sck = pins.gpio18.into_function::<hal::gpio::FunctionSpi>();
	let sd_mosi = pins.gpio19.into_function::<hal::gpio::FunctionSpi>();

	// Push buttons, active low
	let button_pins = [
		pins.gpio20.into_pull_up_input().into_dyn_pin(),
		pins.gpio21.into_pull_up_input().into_dyn_pin(),
		pins.gpio22.into_pull_up_input().into_dyn_pin(),
		pins.gpio26.into_pull_up_input().into_dyn_pin(),
	];

	info!("Pins OK");

	let spi = hal::spi::Spi::<_, _, _, 8>::new(pac.SPI0, (sd_mosi, sd_miso, sd_sck)).init(
		&mut pac.RESETS,
		clocks.peripheral_clock.freq(),
		SD_INIT_HZ.Hz(),
		embedded_hal::spi::MODE_0,
	);
	let card: SdCard = embedded_sdmmc::SdCard::new(spi, sd_cs, delay);
	match card.num_bytes() {
		Ok(size) => info!("SD card is {=u64} bytes", size),
		Err(e) => {
			error!("SD card did not respond: {:?}", e);
			return Err(InitializationFault::Storage.into());
		}
	}
	let peripheral_freq = clocks.peripheral_clock.freq();
	card.spi(|spi| spi.set_baudrate(peripheral_freq, SD_RUN_HZ.Hz()));

	let store = storage::SdStore::mount(card)?;
	let config = PlayerConfig::DEFAULT;
	let cursor = FileCursor::begin(storage::SdDirectory::new(&store), config.extension)?;

	info!("Storage OK");

	let frames = vga::init(
		pac.PIO0,
		pac.DMA,
		&mut pac.RESETS,
		&mut pac.PSM,
		&mut pac.PPB,
		&mut sio.fifo,
	)?;

	info!("VGA initialised");

	buttons::init(button_pins, timer)?;

	info!("Buttons OK");

	let engine = PlaybackEngine::new(
		storage::RawFrameSource::new(&store),
		frames,
		&vga::PIPELINE,
		Profiler::new(PicoTicks(timer)),
		config,
	);
	let mut session = Session::new(cursor, engine, &buttons::LATCH, cortex_m::asm::wfi);
	Ok(session.run()?)
}

/// Report the fault and stop.
fn halt(fault: Fault) -> ! {
	error!("Halted: {}", fault);
	loop {
		cortex_m::asm::wfi();
	}
}

impl From<InitializationFault> for Fault {
	fn from(fault: InitializationFault) -> Fault {
		Fault::Init(fault)
	}
}

impl From<FilesystemFault> for Fault {
	fn from(fault: FilesystemFault) -> Fault {
		Fault::Filesystem(fault)
	}
}

impl TickSource for PicoTicks {
	fn now(&self) -> u64 {
		self.0.get_counter().ticks()
	}
}

/// Called when DMA raises IRQ0; i.e. when a DMA transfer to the pixel FIFO or
/// the timing FIFO has completed.
#[interrupt]
fn DMA_IRQ_0() {
	unsafe {
		vga::irq();
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
