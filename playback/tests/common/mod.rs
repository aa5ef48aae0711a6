//! Mock collaborators shared by the integration tests.
//!
//! Each mock keeps its state behind an `Rc<RefCell<..>>` so a test can hand
//! one clone to the code under test and keep another to look at afterwards.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use pico_mpg_playback::{
	ButtonLatch, ButtonMask, FileContext, FileCursor, Filesystem, FramePipeline, FrameSlot,
	FrameStore, Idle, PlaybackEngine, PlayerConfig, Profiler, Session, TickSource, VideoInfo,
	VideoSource,
};

/// Bytes in one mock frame buffer.
pub const FRAME_LEN: usize = 8;

/// How many idle calls a test may make before we decide it has hung.
pub const IDLE_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError;

/// Turn on `log` output for a test run when `RUST_LOG` is set.
pub fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

// -----------------------------------------------------------------------------
// Filesystem
// -----------------------------------------------------------------------------

#[derive(Default)]
struct FsState {
	entries: Vec<FileContext>,
	position: usize,
	begins: usize,
	fail_begin: bool,
}

/// A directory listing held in memory.
#[derive(Clone, Default)]
pub struct MockFilesystem {
	state: Rc<RefCell<FsState>>,
}

impl MockFilesystem {
	pub fn new(entries: &[(&str, u32)]) -> Self {
		let fs = Self::default();
		fs.state.borrow_mut().entries = entries
			.iter()
			.map(|(name, size)| FileContext::new(name, *size).unwrap())
			.collect();
		fs
	}

	/// Make every later `begin_browse` fail.
	pub fn fail_begin(&self, fail: bool) {
		self.state.borrow_mut().fail_begin = fail;
	}

	/// How many times browsing was (re)started.
	pub fn begins(&self) -> usize {
		self.state.borrow().begins
	}
}

impl Filesystem for MockFilesystem {
	type Error = MockError;

	fn begin_browse(&mut self) -> Result<(), Self::Error> {
		let mut state = self.state.borrow_mut();
		state.begins += 1;
		if state.fail_begin {
			return Err(MockError);
		}
		state.position = 0;
		Ok(())
	}

	fn browse_next(&mut self) -> Option<FileContext> {
		let mut state = self.state.borrow_mut();
		let entry = state.entries.get(state.position).cloned();
		if entry.is_some() {
			state.position += 1;
		}
		entry
	}
}

// -----------------------------------------------------------------------------
// Video source
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct VideoState {
	pub frame_counts: HashMap<String, u32>,
	pub default_frames: u32,
	pub fail_open: HashSet<String>,
	pub fail_frame: Option<u32>,
	pub open_now: Option<String>,
	pub opened: Vec<String>,
	pub decoded: Vec<u32>,
	pub closes: usize,
}

/// A decoder whose frames are just their own index.
#[derive(Clone, Default)]
pub struct MockVideo {
	pub state: Rc<RefCell<VideoState>>,
}

impl MockVideo {
	/// Every file has `frames` frames unless told otherwise.
	pub fn new(frames: u32) -> Self {
		let video = Self::default();
		video.state.borrow_mut().default_frames = frames;
		video
	}

	pub fn with_frames(self, name: &str, frames: u32) -> Self {
		self.state.borrow_mut().frame_counts.insert(name.to_string(), frames);
		self
	}

	pub fn failing_open(self, name: &str) -> Self {
		self.state.borrow_mut().fail_open.insert(name.to_string());
		self
	}

	pub fn failing_frame(self, index: u32) -> Self {
		self.state.borrow_mut().fail_frame = Some(index);
		self
	}

	pub fn decoded(&self) -> Vec<u32> {
		self.state.borrow().decoded.clone()
	}

	pub fn opened(&self) -> Vec<String> {
		self.state.borrow().opened.clone()
	}

	pub fn closes(&self) -> usize {
		self.state.borrow().closes
	}

	pub fn is_open(&self) -> bool {
		self.state.borrow().open_now.is_some()
	}
}

impl VideoSource for MockVideo {
	type Error = MockError;

	fn open(&mut self, file: &FileContext) -> Result<VideoInfo, Self::Error> {
		let mut state = self.state.borrow_mut();
		assert!(state.open_now.is_none(), "open while another file is open");
		if state.fail_open.contains(file.name()) {
			return Err(MockError);
		}
		let frame_count = state
			.frame_counts
			.get(file.name())
			.copied()
			.unwrap_or(state.default_frames);
		state.open_now = Some(file.name().to_string());
		state.opened.push(file.name().to_string());
		Ok(VideoInfo { frame_count })
	}

	fn decode_frame(&mut self, index: u32, buffer: &mut [u8]) -> Result<(), Self::Error> {
		let mut state = self.state.borrow_mut();
		assert!(state.open_now.is_some(), "decode with no file open");
		if state.fail_frame == Some(index) {
			return Err(MockError);
		}
		buffer[..4].copy_from_slice(&index.to_le_bytes());
		state.decoded.push(index);
		Ok(())
	}

	fn close(&mut self) {
		let mut state = self.state.borrow_mut();
		if state.open_now.take().is_some() {
			state.closes += 1;
		}
	}
}

// -----------------------------------------------------------------------------
// Frame memory
// -----------------------------------------------------------------------------

/// `N` small heap buffers.
pub struct VecStore {
	frames: Vec<Vec<u8>>,
}

impl VecStore {
	pub fn new(buffers: usize) -> Self {
		Self {
			frames: vec![vec![0; FRAME_LEN]; buffers],
		}
	}

	/// The frame index last decoded into buffer `index`.
	pub fn frame_in(&self, index: usize) -> u32 {
		u32::from_le_bytes(self.frames[index][..4].try_into().unwrap())
	}
}

impl FrameStore for VecStore {
	fn frame_mut(&mut self, slot: &FrameSlot) -> &mut [u8] {
		&mut self.frames[slot.index()]
	}
}

// -----------------------------------------------------------------------------
// Clock
// -----------------------------------------------------------------------------

/// A clock the test moves by hand.
#[derive(Clone, Default)]
pub struct ManualClock {
	now: Rc<Cell<u64>>,
}

impl ManualClock {
	pub fn set(&self, now: u64) {
		self.now.set(now);
	}

	pub fn advance(&self, ticks: u64) {
		self.now.set(self.now.get() + ticks);
	}
}

impl TickSource for ManualClock {
	fn now(&self) -> u64 {
		self.now.get()
	}
}

// -----------------------------------------------------------------------------
// Idle hook
// -----------------------------------------------------------------------------

/// Plays the part of the interrupt handlers while the code under test waits.
///
/// Every call flips the display (as the end-of-frame interrupt would) and,
/// if no press is waiting, counts down to the next scripted button press.
pub struct ScriptedIdle<'a, const N: usize> {
	pipeline: &'a FramePipeline<N>,
	latch: &'a ButtonLatch,
	script: VecDeque<(usize, ButtonMask)>,
	calls: Rc<Cell<usize>>,
}

impl<'a, const N: usize> ScriptedIdle<'a, N> {
	pub fn new(pipeline: &'a FramePipeline<N>, latch: &'a ButtonLatch) -> Self {
		Self {
			pipeline,
			latch,
			script: VecDeque::new(),
			calls: Rc::new(Cell::new(0)),
		}
	}

	/// Press `mask` as soon as the latch is empty and we are idle.
	pub fn press(self, mask: ButtonMask) -> Self {
		self.press_after(0, mask)
	}

	/// Press `mask` after `idles` further idle calls with an empty latch.
	pub fn press_after(mut self, idles: usize, mask: ButtonMask) -> Self {
		self.script.push_back((idles, mask));
		self
	}

	/// A counter of idle calls that stays readable after `self` is moved.
	pub fn calls(&self) -> Rc<Cell<usize>> {
		self.calls.clone()
	}
}

impl<'a, const N: usize> Idle for ScriptedIdle<'a, N> {
	fn idle(&mut self) {
		let calls = self.calls.get() + 1;
		self.calls.set(calls);
		assert!(calls < IDLE_LIMIT, "test appears to have hung");
		self.pipeline.flip();
		if self.latch.is_pending() {
			return;
		}
		if let Some((delay, mask)) = self.script.front_mut() {
			if *delay == 0 {
				self.latch.raise(*mask);
				self.script.pop_front();
			} else {
				*delay -= 1;
			}
		}
	}
}

// -----------------------------------------------------------------------------
// Assembly
// -----------------------------------------------------------------------------

pub type TestEngine<'p, const N: usize> = PlaybackEngine<'p, MockVideo, VecStore, ManualClock, N>;

pub type TestSession<'a, const N: usize> =
	Session<'a, MockFilesystem, MockVideo, VecStore, ManualClock, ScriptedIdle<'a, N>, N>;

pub fn engine<'p, const N: usize>(
	video: &MockVideo,
	pipeline: &'p FramePipeline<N>,
	config: PlayerConfig,
) -> TestEngine<'p, N> {
	PlaybackEngine::new(
		video.clone(),
		VecStore::new(N),
		pipeline,
		Profiler::new(ManualClock::default()),
		config,
	)
}

pub fn session<'a, const N: usize>(
	fs: &MockFilesystem,
	video: &MockVideo,
	pipeline: &'a FramePipeline<N>,
	latch: &'a ButtonLatch,
	idle: ScriptedIdle<'a, N>,
	config: PlayerConfig,
) -> TestSession<'a, N> {
	let cursor = FileCursor::begin(fs.clone(), config.extension).unwrap();
	Session::new(cursor, engine(video, pipeline, config), latch, idle)
}
