//! # Profiler
//!
//! Accumulates how long the interesting parts of playback take. One
//! [`Profiler`] is built at start-up and handed to the playback engine, which
//! times each file search, load, preview, frame decode, buffer wait and
//! submit.

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

use crate::fmt::info;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A free-running clock.
pub trait TickSource {
	/// The current time in ticks. May wrap.
	fn now(&self) -> u64;
}

/// The things we time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingRegion {
	/// Searching the directory for the next playable file.
	FileSearch,
	/// Opening a file and showing its first frame.
	Load,
	/// Decoding and submitting a preview frame.
	Preview,
	/// Decoding one frame during playback.
	Decode,
	/// Waiting for the display to free a buffer.
	AcquireWait,
	/// Handing a decoded buffer to the display.
	Submit,
}

/// Totals for one [`TimingRegion`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionStats {
	/// Sum of all measured durations.
	pub total: u64,
	/// Number of measurements.
	pub count: u32,
	/// Longest single measurement.
	pub max: u64,
	/// Shortest single measurement; `u64::MAX` until something is measured.
	pub min: u64,
}

/// An open measurement. Hand it back to [`Profiler::end`].
#[derive(Debug)]
#[must_use]
pub struct Span {
	region: TimingRegion,
	started: u64,
}

/// Per-region timing statistics.
pub struct Profiler<T> {
	ticks: T,
	stats: [RegionStats; TimingRegion::COUNT],
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl TimingRegion {
	/// How many regions there are.
	pub const COUNT: usize = 6;

	/// Every region, in report order.
	pub const ALL: [TimingRegion; TimingRegion::COUNT] = [
		TimingRegion::FileSearch,
		TimingRegion::Load,
		TimingRegion::Preview,
		TimingRegion::Decode,
		TimingRegion::AcquireWait,
		TimingRegion::Submit,
	];

	/// Short label for reports.
	pub const fn name(self) -> &'static str {
		match self {
			TimingRegion::FileSearch => "file search",
			TimingRegion::Load => "load",
			TimingRegion::Preview => "preview",
			TimingRegion::Decode => "decode",
			TimingRegion::AcquireWait => "acquire wait",
			TimingRegion::Submit => "submit",
		}
	}

	const fn index(self) -> usize {
		self as usize
	}
}

impl RegionStats {
	/// Nothing measured yet.
	pub const EMPTY: RegionStats = RegionStats {
		total: 0,
		count: 0,
		max: 0,
		min: u64::MAX,
	};

	/// Mean duration, or `None` if nothing was measured.
	pub fn average(&self) -> Option<u64> {
		if self.count == 0 {
			None
		} else {
			Some(self.total / u64::from(self.count))
		}
	}

	fn record(&mut self, elapsed: u64) {
		self.total = self.total.saturating_add(elapsed);
		self.count = self.count.saturating_add(1);
		self.max = self.max.max(elapsed);
		self.min = self.min.min(elapsed);
	}
}

impl Default for RegionStats {
	fn default() -> Self {
		Self::EMPTY
	}
}

impl<T> Profiler<T>
where
	T: TickSource,
{
	/// Create a profiler with every region empty.
	pub fn new(ticks: T) -> Profiler<T> {
		Profiler {
			ticks,
			stats: [RegionStats::EMPTY; TimingRegion::COUNT],
		}
	}

	/// Forget everything measured so far.
	pub fn reset(&mut self) {
		self.stats = [RegionStats::EMPTY; TimingRegion::COUNT];
	}

	/// Start timing `region`.
	pub fn begin(&self, region: TimingRegion) -> Span {
		Span {
			region,
			started: self.ticks.now(),
		}
	}

	/// Stop timing and record the duration. Returns the elapsed ticks.
	pub fn end(&mut self, span: Span) -> u64 {
		let elapsed = self.ticks.now().wrapping_sub(span.started);
		self.stats[span.region.index()].record(elapsed);
		elapsed
	}

	/// Time `f` as one measurement of `region`.
	pub fn measure<R>(&mut self, region: TimingRegion, f: impl FnOnce() -> R) -> R {
		let span = self.begin(region);
		let result = f();
		self.end(span);
		result
	}

	/// Statistics for one region.
	pub fn stats(&self, region: TimingRegion) -> RegionStats {
		self.stats[region.index()]
	}

	/// Log every region that has at least one measurement.
	pub fn report(&self) {
		for region in TimingRegion::ALL {
			let stats = self.stats(region);
			if let Some(average) = stats.average() {
				info!(
					"{}: {} calls, total {}, avg {}, min {}, max {}",
					region.name(),
					stats.count,
					stats.total,
					average,
					stats.min,
					stats.max
				);
			}
		}
	}

	/// The clock this profiler reads.
	pub fn ticks(&self) -> &T {
		&self.ticks
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn region_table_is_in_index_order() {
		for (i, region) in TimingRegion::ALL.iter().enumerate() {
			assert_eq!(region.index(), i);
		}
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
