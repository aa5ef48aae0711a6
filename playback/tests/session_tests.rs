//! Integration tests for the session controller: button presses are scripted
//! through the idle hook, which also plays the display interrupt.

mod common;

use common::{session, MockFilesystem, MockVideo, ScriptedIdle};
use pico_mpg_playback::{
	ButtonLatch, ButtonMask, FileOutcome, FilesystemFault, FramePipeline, PlaybackState,
	PlayerConfig, TimingRegion,
};

fn playlist() -> MockFilesystem {
	MockFilesystem::new(&[("A.MPG", 10), ("B.TXT", 20), ("C.MPG", 30)])
}

#[test]
fn play_to_end_then_next_file() {
	common::init_logging();
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(5);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(20, ButtonMask::PLAY_PAUSE);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	assert_eq!(video.opened(), ["A.MPG"]);
	// The preview was frame 0, so playing starts at frame 1.
	assert_eq!(video.decoded(), [0, 1, 2, 3, 4]);
	assert_eq!(session.engine().state(), PlaybackState::Stopped);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	assert_eq!(video.opened(), ["A.MPG", "C.MPG"]);
	assert_eq!(video.closes(), 2);
}

#[test]
fn pause_and_resume_continue_from_the_same_frame() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(40);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(5, ButtonMask::PLAY_PAUSE)
		.press_after(3, ButtonMask::PLAY_PAUSE);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));

	// Every frame once: nothing lost or repeated across the pause.
	assert_eq!(video.decoded(), (0..40).collect::<Vec<u32>>());
}

#[test]
fn paused_engine_waits_for_play() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(40);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(5, ButtonMask::PLAY_PAUSE)
		.press_after(10, ButtonMask::LOAD_NEXT);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	// Paused part-way through; nothing decoded after the pause.
	let decoded = video.decoded();
	assert!(decoded.len() < 12, "decoded {:?}", decoded);
	assert_eq!(decoded, (0..decoded.len() as u32).collect::<Vec<u32>>());
}

#[test]
fn load_next_while_playing_stops_and_frees_buffers() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(1000);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(10, ButtonMask::LOAD_NEXT);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	assert_eq!(session.engine().state(), PlaybackState::Stopped);
	assert_eq!(pipeline.counts().free, 2);
	assert_eq!(pipeline.displayed(), None);
	assert_eq!(video.closes(), 1);
	assert!(!video.is_open());
}

#[test]
fn fast_forward_near_end_moves_to_next_file() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(200);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(60, ButtonMask::FAST_FORWARD);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::OutOfBounds));
	assert_eq!(session.engine().state(), PlaybackState::Stopped);
	assert_eq!(video.closes(), 1);
	assert_eq!(pipeline.counts().free, 2);
}

#[test]
fn fast_forward_while_previewing_shows_new_position() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(1000);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::FAST_FORWARD)
		.press(ButtonMask::REWIND)
		.press(ButtonMask::LOAD_NEXT);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	// Preview at 0, at 150 after Fast Forward, back at 0 after Rewind; no
	// playback in between.
	assert_eq!(video.decoded(), [0, 150, 0]);
}

#[test]
fn seeking_while_playing_keeps_playing() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(400);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE)
		.press_after(3, ButtonMask::FAST_FORWARD)
		.press_after(3, ButtonMask::REWIND);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	let decoded = video.decoded();
	// One jump forward by the stride, one jump back, then played out.
	assert!(decoded.windows(2).any(|w| w[1] >= w[0] + 150));
	assert!(decoded.windows(2).any(|w| w[1] + 100 < w[0]));
	assert_eq!(decoded.last(), Some(&399));
	assert!(decoded.len() < 400 + 20);
}

#[test]
fn play_pause_outranks_other_buttons() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(8);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::PLAY_PAUSE | ButtonMask::LOAD_NEXT | ButtonMask::FAST_FORWARD);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	// Load Next was dropped; the file played out.
	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	assert_eq!(video.decoded().len(), 8);
}

#[test]
fn load_next_outranks_seeking() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(1000);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press(ButtonMask::LOAD_NEXT | ButtonMask::FAST_FORWARD | ButtonMask::REWIND);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	assert_eq!(video.decoded(), [0]);
}

#[test]
fn unopenable_file_is_skipped() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(10).failing_open("A.MPG");
	let idle = ScriptedIdle::new(&pipeline, &latch).press(ButtonMask::LOAD_NEXT);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::OpenFailed));
	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	assert_eq!(video.opened(), ["C.MPG"]);
}

#[test]
fn decode_failure_finishes_the_file() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(10).failing_frame(4);
	let idle = ScriptedIdle::new(&pipeline, &latch).press(ButtonMask::PLAY_PAUSE);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	assert_eq!(video.decoded(), [0, 1, 2, 3]);
	assert_eq!(pipeline.counts().free, 2);
}

#[test]
fn empty_playlist_waits_for_a_button_before_rescanning() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(10);
	let fs = MockFilesystem::new(&[("B.TXT", 20)]);
	let idle = ScriptedIdle::new(&pipeline, &latch)
		.press_after(3, ButtonMask::PLAY_PAUSE)
		.press_after(3, ButtonMask::LOAD_NEXT);
	let calls = idle.calls();
	let mut session = session(&fs, &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	// Each empty scan sleeps until the next press, however many wakes
	// come first.
	assert_eq!(session.play_next_file(), Ok(FileOutcome::NoPlayableFile));
	assert_eq!(calls.get(), 4);
	assert_eq!(session.play_next_file(), Ok(FileOutcome::NoPlayableFile));
	assert_eq!(calls.get(), 8);
	assert!(!latch.is_pending());
	assert!(video.opened().is_empty());
}

#[test]
fn broken_directory_ends_the_run() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(10);
	let fs = MockFilesystem::new(&[("A.MPG", 10)]);
	let idle = ScriptedIdle::new(&pipeline, &latch).press(ButtonMask::LOAD_NEXT);
	let mut session = session(&fs, &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Skipped));
	fs.fail_begin(true);
	assert_eq!(session.run(), Err(FilesystemFault));
}

#[test]
fn profiler_is_reset_after_each_file() {
	let pipeline = FramePipeline::<2>::new();
	let latch = ButtonLatch::new();
	let video = MockVideo::new(3);
	let idle = ScriptedIdle::new(&pipeline, &latch).press(ButtonMask::PLAY_PAUSE);
	let mut session = session(&playlist(), &video, &pipeline, &latch, idle, PlayerConfig::DEFAULT);

	assert_eq!(session.play_next_file(), Ok(FileOutcome::Finished));
	let profiler = session.engine().profiler();
	for region in TimingRegion::ALL {
		assert_eq!(profiler.stats(region).count, 0, "{:?} not reset", region);
	}
}
