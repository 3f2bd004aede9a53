use std::sync::Arc;
use std::time::Duration;

use nezha_core::frame::{self, RunForFrame};
use nezha_core::{
    DistanceUnit, DriveConfig, LinearDirection, MotorConnector, MotorHub, MovementMode,
    NezhaError, RotationDirection, TankDrive, TurnDirection,
};
use nezha_hardware::SimulatedBoard;
use nezha_traits::clock::test_clock::TestClock;
use rstest::rstest;

fn sim_drive() -> (TankDrive<SimulatedBoard>, SimulatedBoard, TestClock) {
    let board = SimulatedBoard::new();
    let clock = TestClock::new();
    let hub = MotorHub::builder()
        .with_bus(board.clone())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("hub build");
    (TankDrive::new(Arc::new(hub)), board, clock)
}

fn run_fors(board: &SimulatedBoard) -> Vec<RunForFrame> {
    board
        .frames()
        .iter()
        .filter_map(frame::parse_run_for)
        .collect()
}

fn sign(d: RotationDirection) -> i32 {
    match d {
        RotationDirection::Cw => 1,
        RotationDirection::Ccw => -1,
    }
}

#[rstest]
fn drive_forward_applies_left_reversal() {
    let (drive, board, _) = sim_drive();
    drive.drive(LinearDirection::Forward, 50).expect("drive");
    assert_eq!(
        board.frames(),
        vec![
            [0xFF, 0xF9, 0x04, 0x02, 0x60, 0x00, 0x00, 50],
            [0xFF, 0xF9, 0x01, 0x01, 0x60, 0x00, 0x00, 50],
        ]
    );
    assert!(drive.take_movement_changed());
    assert!(!drive.take_movement_changed());
}

#[rstest]
fn drive_backward_after_rewiring() {
    let (drive, board, _) = sim_drive();
    drive.set_left_motor(MotorConnector::M2, false);
    drive.set_right_motor(MotorConnector::M3, true);
    drive.drive(LinearDirection::Backward, 30).expect("drive");
    let heads: Vec<(u8, u8)> = board.frames().iter().map(|f| (f[2], f[3])).collect();
    assert_eq!(heads, vec![(2, 2), (3, 1)]);
}

#[rstest]
fn drive_for_distance_converts_to_wheel_degrees() {
    let (drive, board, _) = sim_drive();
    drive
        .drive_for_distance(LinearDirection::Forward, 40, 10.0, DistanceUnit::Cm)
        .expect("drive distance");

    let moves = run_fors(&board);
    assert_eq!(moves.len(), 2);
    // 100 mm / (36π mm) * 360 ≈ 318.3
    assert!(moves.iter().all(|m| m.value == 318 && m.mode == MovementMode::Degrees));
    assert_eq!(moves[0].motor, MotorConnector::M4);
    assert_eq!(moves[0].direction, RotationDirection::Ccw);
    assert_eq!(moves[1].motor, MotorConnector::M1);
    assert_eq!(moves[1].direction, RotationDirection::Cw);
}

#[rstest]
fn drive_for_waits_on_left_then_right() {
    let (drive, board, clock) = sim_drive();
    drive
        .drive_for(LinearDirection::Forward, 50, 1.0, MovementMode::Turns, true)
        .expect("drive_for");
    let ops: Vec<(u8, u8)> = board.frames().iter().map(|f| (f[2], f[4])).collect();
    assert_eq!(
        ops,
        vec![
            (4, 0x77),
            (4, 0x70),
            (4, 0x47),
            (1, 0x77),
            (1, 0x70),
            (1, 0x47),
        ]
    );
    // one settle + one speed read per side
    assert_eq!(clock.elapsed(), Duration::from_millis(206));
}

#[rstest]
fn spot_turn_drives_wheels_in_opposite_senses() {
    let (drive, board, _) = sim_drive();
    drive
        .spot_turn(TurnDirection::Left, 20, 90.0)
        .expect("spot turn");

    let cfg = drive.config();
    let moves = run_fors(&board);
    assert_eq!(moves.len(), 2);
    // 90° of turn on a 100 mm wheelbase = 25π mm per wheel = 250° of a 36π mm wheel
    assert!(moves.iter().all(|m| m.value == 250));

    let left_sense = sign(moves[0].direction) * if cfg.left_reversed { -1 } else { 1 };
    let right_sense = sign(moves[1].direction) * if cfg.right_reversed { -1 } else { 1 };
    assert_eq!(left_sense, -1, "left wheel rolls backward on a left turn");
    assert_eq!(right_sense, 1);
}

#[rstest]
fn dual_speed_for_seconds_holds_then_stops() {
    let (drive, board, clock) = sim_drive();
    drive
        .drive_dual_speed(30, -30, Some(0.35))
        .expect("dual speed");

    assert_eq!(clock.elapsed(), Duration::from_millis(400));
    let frames = board.frames();
    assert_eq!(frames.len(), 4);
    // M4 reversed: logical +30 -> CCW; M1: logical -30 -> CCW
    assert_eq!((frames[0][2], frames[0][3], frames[0][5]), (4, 2, 30));
    assert_eq!((frames[1][2], frames[1][3], frames[1][5]), (1, 2, 30));
    assert_eq!((frames[2][2], frames[2][5]), (4, 0));
    assert_eq!((frames[3][2], frames[3][5]), (1, 0));
}

#[rstest]
fn dual_speed_without_seconds_leaves_motors_running() {
    let (drive, board, clock) = sim_drive();
    drive.drive_dual_speed(10, 20, None).expect("dual speed");
    assert_eq!(board.frames().len(), 2);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[rstest]
fn tank_stop_tries_right_even_if_left_fails() {
    let (drive, board, _) = sim_drive();
    board.fail_next_writes(1);
    let err = drive.stop().expect_err("left stop fails");
    assert!(matches!(
        err.downcast_ref::<NezhaError>(),
        Some(NezhaError::Transport(_))
    ));
    let frames = board.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0][2], 1);
}

#[rstest]
#[case(0.0, 10.0)]
#[case(3.6, 0.0)]
#[case(-1.0, 10.0)]
#[case(f32::NAN, 10.0)]
fn invalid_geometry_fails_fast_and_keeps_previous(#[case] diameter: f32, #[case] wheelbase: f32) {
    let (drive, _, _) = sim_drive();
    let before = drive.config();
    let err = drive
        .setup_geometry(diameter, wheelbase, DistanceUnit::Cm)
        .expect_err("reject");
    assert!(matches!(
        err.downcast_ref::<NezhaError>(),
        Some(NezhaError::Config(_))
    ));
    assert_eq!(drive.config(), before);
}

#[rstest]
fn geometry_setup_changes_distance_conversion() {
    let (drive, board, _) = sim_drive();
    drive
        .setup_geometry(1.0, 4.0, DistanceUnit::Inch)
        .expect("geometry");
    assert!((drive.wheelbase_constant() - 101.6 * std::f32::consts::PI / 360.0).abs() < 1e-4);
    // one circumference (25.4π mm) is exactly one wheel turn
    drive
        .drive_for_distance(
            LinearDirection::Forward,
            50,
            std::f32::consts::PI,
            DistanceUnit::Inch,
        )
        .expect("drive distance");
    assert!(run_fors(&board).iter().all(|m| m.value == 360));
}

#[rstest]
fn default_speed_is_clamped() {
    let (drive, _, _) = sim_drive();
    assert_eq!(drive.default_speed(), 30);
    drive.set_default_speed(0);
    assert_eq!(drive.default_speed(), 1);
    drive.set_default_speed(250);
    assert_eq!(drive.default_speed(), 100);
}

#[rstest]
fn custom_config_is_used_as_is() {
    let board = SimulatedBoard::new();
    let hub = MotorHub::builder()
        .with_bus(board.clone())
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("hub build");
    let cfg = DriveConfig {
        left: MotorConnector::M2,
        left_reversed: false,
        right: MotorConnector::M3,
        right_reversed: false,
        ..DriveConfig::default()
    };
    let drive = TankDrive::with_config(Arc::new(hub), cfg);
    drive.drive(LinearDirection::Forward, 20).expect("drive");
    let heads: Vec<(u8, u8)> = board.frames().iter().map(|f| (f[2], f[3])).collect();
    assert_eq!(heads, vec![(2, 1), (3, 1)]);
}
