use super::{FrameRing, SlotState, FRAMES_IN_FLIGHT};

fn run_one_frame(ring: &mut FrameRing) -> (usize, bool) {
    let (slot, must_wait) = ring.acquire();
    ring.begin_recording(slot);
    ring.submit(slot);
    ring.advance();
    (slot, must_wait)
}

#[test]
fn slots_cycle_in_order() {
    let mut ring = FrameRing::new(FRAMES_IN_FLIGHT);

    let mut slots = Vec::new();
    for _ in 0..3 {
        let (slot, _) = run_one_frame(&mut ring);
        slots.push(slot);
    }

    assert_eq!(slots, vec![0, 1, 0]);
    assert_eq!(ring.counter(), 3);
}

#[test]
fn first_use_of_a_slot_needs_no_wait() {
    let mut ring = FrameRing::new(2);

    let (slot, must_wait) = ring.acquire();
    assert_eq!(slot, 0);
    assert!(!must_wait);
}

#[test]
fn reusing_an_in_flight_slot_requires_a_wait() {
    let mut ring = FrameRing::new(2);

    assert_eq!(run_one_frame(&mut ring), (0, false));
    assert_eq!(run_one_frame(&mut ring), (1, false));

    // Slot 0's submission has not retired yet
    let (slot, must_wait) = ring.acquire();
    assert_eq!(slot, 0);
    assert!(must_wait);
}

#[test]
fn single_slot_pool_waits_every_frame_after_the_first() {
    let mut ring = FrameRing::new(1);

    assert_eq!(run_one_frame(&mut ring), (0, false));
    assert_eq!(run_one_frame(&mut ring), (0, true));
    assert_eq!(run_one_frame(&mut ring), (0, true));
}

#[test]
fn aborted_frame_retries_the_same_slot_without_waiting() {
    let mut ring = FrameRing::new(2);

    // Acquire succeeds but the frame aborts before recording, e.g. the
    // swapchain went stale. No submit, no advance.
    let (slot, must_wait) = ring.acquire();
    assert_eq!((slot, must_wait), (0, false));

    // The retry lands on the same slot and does not need a wait
    let (slot, must_wait) = ring.acquire();
    assert_eq!((slot, must_wait), (0, false));
    assert_eq!(ring.counter(), 0);
}

#[test]
fn submitted_slot_is_marked_in_flight() {
    let mut ring = FrameRing::new(2);

    let (slot, _) = ring.acquire();
    ring.begin_recording(slot);
    assert_eq!(ring.slot_state(slot), SlotState::Recording);

    ring.submit(slot);
    assert_eq!(ring.slot_state(slot), SlotState::InFlight);

    ring.advance();
    assert_eq!(ring.slot_state(slot), SlotState::InFlight);
}

#[test]
fn acquire_retires_the_slot_it_returns() {
    let mut ring = FrameRing::new(2);

    run_one_frame(&mut ring);
    run_one_frame(&mut ring);

    let (slot, must_wait) = ring.acquire();
    assert!(must_wait);
    // After the caller's fence wait the slot is considered idle again
    assert_eq!(ring.slot_state(slot), SlotState::Idle);
}
