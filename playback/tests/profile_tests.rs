//! Integration tests for the timing statistics.

mod common;

use common::ManualClock;
use pico_mpg_playback::{Profiler, RegionStats, TimingRegion};

#[test]
fn empty_regions_start_at_max_min() {
	let profiler = Profiler::new(ManualClock::default());
	for region in TimingRegion::ALL {
		assert_eq!(profiler.stats(region), RegionStats::EMPTY);
	}
	assert_eq!(RegionStats::EMPTY.min, u64::MAX);
	assert_eq!(RegionStats::EMPTY.average(), None);
}

#[test]
fn spans_accumulate() {
	let clock = ManualClock::default();
	let mut profiler = Profiler::new(clock.clone());

	clock.set(10);
	let span = profiler.begin(TimingRegion::Decode);
	clock.set(25);
	assert_eq!(profiler.end(span), 15);

	let span = profiler.begin(TimingRegion::Decode);
	clock.advance(5);
	profiler.end(span);

	let stats = profiler.stats(TimingRegion::Decode);
	assert_eq!(stats.count, 2);
	assert_eq!(stats.total, 20);
	assert_eq!(stats.min, 5);
	assert_eq!(stats.max, 15);
	assert_eq!(stats.average(), Some(10));
	assert_eq!(profiler.stats(TimingRegion::Submit), RegionStats::EMPTY);
}

#[test]
fn measure_times_the_closure() {
	let clock = ManualClock::default();
	let mut profiler = Profiler::new(clock.clone());
	let value = profiler.measure(TimingRegion::FileSearch, || {
		clock.advance(7);
		42
	});
	assert_eq!(value, 42);
	assert_eq!(profiler.stats(TimingRegion::FileSearch).total, 7);
}

#[test]
fn wrapping_clock_still_measures() {
	let clock = ManualClock::default();
	let mut profiler = Profiler::new(clock.clone());
	clock.set(u64::MAX - 1);
	let span = profiler.begin(TimingRegion::AcquireWait);
	clock.set(3);
	assert_eq!(profiler.end(span), 5);
}

#[test]
fn reset_clears_everything() {
	common::init_logging();
	let clock = ManualClock::default();
	let mut profiler = Profiler::new(clock.clone());
	for region in TimingRegion::ALL {
		profiler.measure(region, || clock.advance(1));
	}
	profiler.report();
	profiler.reset();
	for region in TimingRegion::ALL {
		assert_eq!(profiler.stats(region), RegionStats::EMPTY);
	}
}
