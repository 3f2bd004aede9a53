use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use nezha_core::frame::{self, Opcode};
use nezha_core::{
    DeviceProfile, MotorConnector, MotorHub, MovementMode, NezhaError, RotationDirection,
    RunFrameLayout, SeekOutcome, ServoMovementMode,
};
use nezha_hardware::SimulatedBoard;
use nezha_traits::Bus;
use nezha_traits::clock::test_clock::TestClock;
use rstest::rstest;

const M1: MotorConnector = MotorConnector::M1;
const M2: MotorConnector = MotorConnector::M2;

fn sim_hub() -> (MotorHub<SimulatedBoard>, SimulatedBoard, TestClock) {
    let board = SimulatedBoard::new();
    let clock = TestClock::new();
    let hub = MotorHub::builder()
        .with_bus(board.clone())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("hub build");
    (hub, board, clock)
}

fn opcodes(board: &SimulatedBoard) -> Vec<u8> {
    board.frames().iter().map(|f| f[4]).collect()
}

#[rstest]
fn run_continuous_maps_speed_and_direction() {
    let (hub, board, _) = sim_hub();
    hub.run_continuous(M2, -3).expect("run");
    hub.run_continuous(M2, 80).expect("run");
    assert_eq!(
        board.frames(),
        vec![
            [0xFF, 0xF9, 0x02, 0x02, 0x60, 0x00, 0x00, 5],
            [0xFF, 0xF9, 0x02, 0x01, 0x60, 0x00, 0x00, 80],
        ]
    );
}

#[rstest]
fn firmware_run_layout_from_device_profile() {
    let board = SimulatedBoard::new();
    let hub = MotorHub::builder()
        .with_bus(board.clone())
        .with_clock(Box::new(TestClock::new()))
        .with_device(DeviceProfile {
            run_layout: RunFrameLayout::Firmware,
            ..DeviceProfile::default()
        })
        .build()
        .expect("hub build");
    hub.run_continuous(M1, 50).expect("run");
    hub.stop(M1).expect("stop");
    assert_eq!(
        board.frames(),
        vec![
            [0xFF, 0xF9, 0x01, 0x01, 0x60, 50, 0xF5, 0x00],
            [0xFF, 0xF9, 0x01, 0x02, 0x60, 0x00, 0xF5, 0x00],
        ]
    );
}

#[rstest]
fn stop_sends_zero_speed_ccw() {
    let (hub, board, _) = sim_hub();
    hub.stop(MotorConnector::M3).expect("stop");
    assert_eq!(
        board.frames(),
        vec![[0xFF, 0xF9, 0x03, 0x02, 0x60, 0x00, 0x00, 0x00]]
    );
}

#[rstest]
fn run_for_sends_profile_then_move_without_waiting() {
    let (hub, board, clock) = sim_hub();
    hub.run_for(M2, -50, 180.0, MovementMode::Degrees, false)
        .expect("run_for");

    let frames = board.frames();
    assert_eq!(frames.len(), 2);
    // |unmapped speed| * gain 9
    assert_eq!(frames[0], frame::set_servo_speed(M2, 450));
    let parsed = frame::parse_run_for(&frames[1]).expect("run-for frame");
    assert_eq!(parsed.motor, M2);
    assert_eq!(parsed.direction, RotationDirection::Ccw);
    assert_eq!(parsed.value, 180);
    assert_eq!(parsed.mode, MovementMode::Degrees);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[rstest]
fn run_for_wait_polls_until_speed_reads_zero() {
    let (hub, board, clock) = sim_hub();
    board.script_speed(1, [100, 100, 0]);
    hub.run_for(M1, 50, 360.0, MovementMode::Degrees, true)
        .expect("run_for");

    assert_eq!(opcodes(&board), vec![0x77, 0x70, 0x47, 0x47, 0x47]);
    // settle 100 + three reads at 3 ms + two 100 ms poll gaps
    assert_eq!(clock.elapsed(), Duration::from_millis(309));
}

#[rstest]
fn run_for_wait_gives_up_after_estimate_plus_grace() {
    let (hub, board, clock) = sim_hub();
    board.script_speed(2, std::iter::repeat_n(100, 50));
    // estimate 600 ms + 100 ms grace
    hub.run_for(M2, 100, 90.0, MovementMode::Degrees, true)
        .expect("advisory timeout is not an error");
    let elapsed = clock.elapsed();
    assert!(
        elapsed >= Duration::from_millis(800) && elapsed < Duration::from_millis(900),
        "elapsed {elapsed:?}"
    );
}

#[rstest]
#[case(0.4, 0, 200)]
#[case(1.4, 1, 1200)]
#[case(1.6, 2, 2200)]
fn fractional_seconds_wait_matches_sent_value(
    #[case] seconds: f32,
    #[case] sent: u16,
    #[case] min_ms: u64,
) {
    let (hub, board, clock) = sim_hub();
    board.script_speed(1, std::iter::repeat_n(100, 60));
    hub.run_for(M1, 50, seconds, MovementMode::Seconds, true)
        .expect("run_for");

    let moves = board.frames_with_opcode(Opcode::RunFor as u8);
    let parsed = frame::parse_run_for(&moves[0]).expect("run-for frame");
    assert_eq!(parsed.value, sent);
    // settle 100 + sent seconds + 100 grace, then at most one more poll
    let elapsed = clock.elapsed();
    assert!(
        elapsed >= Duration::from_millis(min_ms)
            && elapsed < Duration::from_millis(min_ms + 100),
        "elapsed {elapsed:?}"
    );
}

#[rstest]
fn reads_inside_staleness_window_share_one_transaction() {
    let (hub, board, clock) = sim_hub();
    board.script_speed(1, [1000, 2000]);

    assert_eq!(hub.read_speed(M1), 170);
    clock.advance(Duration::from_millis(5));
    assert_eq!(hub.read_speed(M1), 170);
    assert_eq!(board.frames_with_opcode(Opcode::ReadSpeed as u8).len(), 1);

    clock.advance(Duration::from_millis(10));
    assert_eq!(hub.read_speed(M1), 340);
    assert_eq!(board.frames_with_opcode(Opcode::ReadSpeed as u8).len(), 2);
}

#[rstest]
fn speed_and_angle_are_cached_separately() {
    let (hub, board, _) = sim_hub();
    board.set_aggregate_tenths(1, 1234);
    hub.read_speed(M1);
    assert_eq!(hub.read_aggregate_angle(M1), 123);
    assert_eq!(board.frames_with_opcode(0x46).len(), 1);
    assert_eq!(board.frames_with_opcode(0x47).len(), 1);
}

#[rstest]
#[case(-4500, 270)]
#[case(7300, 10)]
#[case(3600, 0)]
#[case(-1, 0)]
#[case(-6, 359)]
fn absolute_angle_is_normalized(#[case] tenths: i32, #[case] expected: i32) {
    let (hub, board, _) = sim_hub();
    board.set_aggregate_tenths(1, tenths);
    assert_eq!(hub.read_absolute_angle(M1), expected);
}

#[rstest]
fn failed_read_degrades_to_cached_value() {
    let (hub, board, clock) = sim_hub();
    board.script_speed(1, [1000]);
    assert_eq!(hub.read_speed(M1), 170);

    clock.advance(Duration::from_millis(20));
    board.fail_next_reads(1);
    assert_eq!(hub.read_speed(M1), 170);

    clock.advance(Duration::from_millis(20));
    board.fail_next_writes(1);
    assert_eq!(hub.read_speed(M1), 170);

    // bus healthy again, script exhausted
    clock.advance(Duration::from_millis(20));
    assert_eq!(hub.read_speed(M1), 0);
}

#[rstest]
fn seek_inside_deadband_sends_no_move() {
    let (hub, board, _) = sim_hub();
    board.set_aggregate_tenths(1, 100);
    let outcome = hub
        .seek_absolute_angle(M1, 50, 8, ServoMovementMode::ShortestPath)
        .expect("seek");
    assert_eq!(outcome, SeekOutcome::NoOp);
    assert_eq!(opcodes(&board), vec![0x46]);
}

#[rstest]
fn seek_shortest_path_goes_ccw_and_lands_on_target() {
    let (hub, board, _) = sim_hub();
    let outcome = hub
        .seek_absolute_angle(M1, 50, -90, ServoMovementMode::ShortestPath)
        .expect("seek");
    assert_eq!(
        outcome,
        SeekOutcome::Moved {
            direction: RotationDirection::Ccw,
            degrees: 90
        }
    );
    let moves = board.frames_with_opcode(0x70);
    assert_eq!(moves.len(), 1);
    let parsed = frame::parse_run_for(&moves[0]).expect("run-for");
    assert_eq!(parsed.direction, RotationDirection::Ccw);
    assert_eq!(parsed.value, 90);
    assert_eq!(board.frames_with_opcode(0x77)[0], frame::set_servo_speed(M1, 450));
    assert_eq!(hub.read_absolute_angle(M1), 270);
}

#[rstest]
fn seek_forced_cw_takes_long_way() {
    let (hub, board, _) = sim_hub();
    board.set_aggregate_tenths(1, 900);
    let outcome = hub
        .seek_absolute_angle(M1, -40, 0, ServoMovementMode::Cw)
        .expect("seek");
    assert_eq!(
        outcome,
        SeekOutcome::Moved {
            direction: RotationDirection::Cw,
            degrees: 270
        }
    );
    assert_eq!(hub.read_absolute_angle(M1), 0);
}

#[rstest]
fn firmware_seek_sends_5d_and_keeps_turns() {
    let (hub, board, _) = sim_hub();
    board.set_aggregate_tenths(1, 7300);
    hub.go_to_absolute_position(M1, 450, ServoMovementMode::Ccw)
        .expect("goto");
    assert_eq!(
        board.frames_with_opcode(0x5D),
        vec![[0xFF, 0xF9, 0x01, 0x00, 0x5D, 0x00, 0x03, 0x5A]]
    );
    assert_eq!(board.aggregate_tenths(1), 8100);
}

#[rstest]
fn stop_all_attempts_every_motor_and_reports_first_failure() {
    let (hub, board, _) = sim_hub();
    board.fail_next_writes(1);
    let err = hub.stop_all().expect_err("M1 write fails");

    assert_eq!(board.writes_attempted(), 4);
    let connectors: Vec<u8> = board.frames().iter().map(|f| f[2]).collect();
    assert_eq!(connectors, vec![2, 3, 4]);
    assert!(matches!(
        err.downcast_ref::<NezhaError>(),
        Some(NezhaError::Transport(_))
    ));
    assert!(format!("{err:#}").contains("stop M1"));
}

#[rstest]
fn firmware_version_reads_three_bytes() {
    let (hub, board, _) = sim_hub();
    board.set_version([2, 5, 1]);
    let v = hub.read_firmware_version().expect("version");
    assert_eq!(v.to_string(), "2.5.1");
    assert_eq!(board.frames_with_opcode(0x88).len(), 1);

    board.fail_next_reads(1);
    assert!(hub.read_firmware_version().is_err());
}

/// Bus whose reads block until the test releases them.
struct GatedBus {
    wrote: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
    writes: Arc<AtomicUsize>,
}

impl Bus for GatedBus {
    fn write(&mut self, _addr: u8, _bytes: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _ = self.wrote.send(());
        Ok(())
    }

    fn read(&mut self, _addr: u8, buf: &mut [u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.release.recv()?;
        buf.fill(0);
        buf[0] = 100;
        Ok(())
    }
}

#[rstest]
fn concurrent_reader_gets_cached_value_while_read_in_flight() {
    let (wrote_tx, wrote_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let writes = Arc::new(AtomicUsize::new(0));
    let hub = Arc::new(
        MotorHub::builder()
            .with_bus(GatedBus {
                wrote: wrote_tx,
                release: release_rx,
                writes: Arc::clone(&writes),
            })
            .build()
            .expect("hub build"),
    );

    let h2 = Arc::clone(&hub);
    let first = thread::spawn(move || h2.read_speed(M1));
    wrote_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("first reader wrote its request");

    // no bus traffic, no blocking: last known value
    assert_eq!(hub.read_speed(M1), 0);

    release_tx.send(()).expect("release");
    assert_eq!(first.join().expect("reader thread"), 17);
    assert_eq!(writes.load(Ordering::SeqCst), 1);
}
