//! Integration tests for the button latch and debouncer.

use pico_mpg_playback::{ButtonEvent, ButtonLatch, ButtonMask, Debouncer, Edge};

const WINDOW: u64 = 20_000;

#[test]
fn presses_between_polls_are_coalesced() {
	let latch = ButtonLatch::new();
	assert!(!latch.is_pending());
	latch.raise(ButtonMask::PLAY_PAUSE);
	latch.raise(ButtonMask::PLAY_PAUSE);
	latch.raise(ButtonMask::FAST_FORWARD);
	assert!(latch.is_pending());

	assert_eq!(latch.take(), ButtonMask::PLAY_PAUSE | ButtonMask::FAST_FORWARD);
	assert!(!latch.is_pending());
	assert!(latch.take().is_empty());
}

#[test]
fn wait_idles_until_a_press_arrives() {
	let latch = ButtonLatch::new();
	let mut idles = 0;
	let mask = latch.wait(&mut || {
		idles += 1;
		if idles == 3 {
			latch.raise(ButtonMask::REWIND);
		}
	});
	assert_eq!(mask, ButtonMask::REWIND);
	assert_eq!(idles, 3);
	assert!(!latch.is_pending());
}

#[test]
fn wait_returns_at_once_if_already_pressed() {
	let latch = ButtonLatch::new();
	latch.raise(ButtonMask::LOAD_NEXT);
	let mask = latch.wait(&mut || panic!("should not idle"));
	assert_eq!(mask, ButtonMask::LOAD_NEXT);
}

#[test]
fn priority_order() {
	let all = ButtonMask::from_bits(0x0F);
	assert_eq!(all.highest_priority(), Some(ButtonEvent::PlayPause));
	assert_eq!(
		(ButtonMask::LOAD_NEXT | ButtonMask::REWIND).highest_priority(),
		Some(ButtonEvent::LoadNext)
	);
	assert_eq!(
		(ButtonMask::FAST_FORWARD | ButtonMask::REWIND).highest_priority(),
		Some(ButtonEvent::FastForward)
	);
	assert_eq!(ButtonMask::REWIND.highest_priority(), Some(ButtonEvent::Rewind));
	assert_eq!(ButtonMask::NONE.highest_priority(), None);
}

#[test]
fn event_masks_match_button_numbers() {
	assert_eq!(ButtonMask::from(ButtonEvent::PlayPause), ButtonMask::PLAY_PAUSE);
	assert_eq!(ButtonMask::from(ButtonEvent::LoadNext).bits(), 0b0010);
	assert_eq!(ButtonMask::from(ButtonEvent::FastForward).bits(), 0b0100);
	assert_eq!(ButtonMask::from(ButtonEvent::Rewind).bits(), 0b1000);
}

#[test]
fn chatter_is_one_press() {
	let mut debouncer = Debouncer::<4>::new(WINDOW);
	// Contacts bounce on the way down.
	assert!(debouncer.update(0, Edge::Pressed, 1_000));
	assert!(!debouncer.update(0, Edge::Released, 1_200));
	assert!(!debouncer.update(0, Edge::Pressed, 1_400));
	assert!(!debouncer.update(0, Edge::Released, 1_600));
	assert!(!debouncer.update(0, Edge::Pressed, 1_800));
	// And on the way up.
	assert!(!debouncer.update(0, Edge::Released, 150_000));
	assert!(!debouncer.update(0, Edge::Pressed, 150_100));
	assert!(!debouncer.update(0, Edge::Released, 150_200));
}

#[test]
fn separate_presses_are_each_accepted() {
	let mut debouncer = Debouncer::<4>::new(WINDOW);
	assert!(debouncer.update(2, Edge::Pressed, 0));
	debouncer.update(2, Edge::Released, 100_000);
	assert!(debouncer.update(2, Edge::Pressed, 300_000));
}

#[test]
fn press_without_release_is_ignored() {
	let mut debouncer = Debouncer::<4>::new(WINDOW);
	assert!(debouncer.update(1, Edge::Pressed, 0));
	assert!(!debouncer.update(1, Edge::Pressed, 10 * WINDOW));
}

#[test]
fn buttons_are_independent() {
	let mut debouncer = Debouncer::<4>::new(WINDOW);
	assert!(debouncer.update(0, Edge::Pressed, 500));
	assert!(debouncer.update(3, Edge::Pressed, 510));
	assert!(!debouncer.update(4, Edge::Pressed, 520));
}

#[test]
fn tick_counter_wrap_does_not_lock_out() {
	let mut debouncer = Debouncer::<1>::new(WINDOW);
	assert!(debouncer.update(0, Edge::Pressed, u64::MAX - 10));
	debouncer.update(0, Edge::Released, u64::MAX - 5);
	assert!(debouncer.update(0, Edge::Pressed, WINDOW));
}
