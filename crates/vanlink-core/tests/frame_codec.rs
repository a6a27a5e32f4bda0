//! Integration tests for the vanlink-core wire codecs.
//!
//! These tests drive the public API the way the client crate does: a BMS
//! response is hand-assembled with every known tag, pushed through the frame
//! helpers, and turned into a battery snapshot; text lines go through the
//! per-module parsers and into their snapshots.

use vanlink_core::{
    domain::battery::BatteryAlarm,
    domain::tank::TankLevelSnapshot,
    protocol::{
        bms::{self, encode_frame, tag, CMD_READ_ALL},
        build_read_all_command, find_frame_start, has_complete_frame, parse_response,
        text::tank::{TankCommand, TankConfig, TankMessage},
    },
    BatterySnapshot,
};

/// A "read all" response carrying every tag the parser knows.
fn full_response() -> Vec<u8> {
    let payload: Vec<u8> = [
        &[tag::CELL_VOLTAGES, 9, 1, 0x0C, 0xE4, 2, 0x0C, 0xEE, 3, 0x0C, 0xF8][..],
        &[tag::MOS_TEMP, 0x00, 0x7D],
        &[tag::TEMP_SENSOR_1, 0x00, 0x78],
        &[tag::TEMP_SENSOR_2, 0x00, 0x5A],
        &[tag::TOTAL_VOLTAGE, 0x05, 0x28],
        &[tag::CURRENT, 0x83, 0xE8],
        &[tag::SOC, 87],
        &[tag::TEMP_SENSOR_COUNT, 2],
        &[tag::CYCLE_COUNT, 0x00, 0x2A],
        &[tag::TOTAL_CYCLE_CAPACITY, 0x00, 0x00, 0x10, 0x00],
        &[tag::CELL_COUNT, 0x00, 0x04],
        &[tag::BALANCE_CURRENT, 0x00, 0x32],
        &[tag::BALANCE_STATE, 0x05],
        &[tag::BATTERY_ERRORS, 0x00, 0x21],
        &[tag::CHARGE_MOSFET, 0x01],
        &[tag::DISCHARGE_MOSFET, 0x00],
        &[tag::CAPACITY_AH, 0x00, 0x03, 0x0D, 0x40],
    ]
    .concat();
    encode_frame(CMD_READ_ALL, 0x00, 0x01, &payload)
}

#[test]
fn test_request_then_full_response_decodes_every_field() {
    // Arrange
    let request = build_read_all_command();
    let response = full_response();

    // Act
    let t = parse_response(&response).expect("complete frame must parse");

    // Assert
    assert!(bms::checksum_matches(&request));
    assert!(bms::checksum_matches(&response));
    assert_eq!(t.cell_voltages, vec![3.3, 3.31, 3.32]);
    assert_eq!(t.temp_mos, 25);
    assert_eq!(t.temp_sensor_1, 20);
    assert_eq!(t.temp_sensor_2, -10);
    assert_eq!(t.total_voltage, 13.2);
    assert_eq!(t.current, -10.0);
    assert_eq!(t.soc, 87);
    assert_eq!(t.cycle_count, 42);
    assert_eq!(t.cell_count, 4);
    assert_eq!(t.balance_current, 0.05);
    assert_eq!(t.balance_state, 0x05);
    assert_eq!(t.errors, 0x21);
    assert!(t.charge_mosfet);
    assert!(!t.discharge_mosfet);
    assert_eq!(t.capacity_ah, 200.0);
}

#[test]
fn test_truncated_response_is_never_parsed() {
    let response = full_response();
    for len in 0..response.len() {
        assert!(!has_complete_frame(&response[..len]));
        assert!(parse_response(&response[..len]).is_none());
    }
}

#[test]
fn test_noise_before_frame_is_skipped_by_resync() {
    // Arrange
    let mut stream = vec![0x00, 0x4E, 0x12, 0x57];
    stream.extend(full_response());

    // Act
    let start = find_frame_start(&stream).expect("magic present");

    // Assert
    assert_eq!(start, 4);
    assert!(parse_response(&stream).is_none());
    assert_eq!(parse_response(&stream[start..]).map(|t| t.soc), Some(87));
}

#[test]
fn test_full_response_to_battery_snapshot() {
    // Arrange
    let t = parse_response(&full_response()).unwrap();

    // Act
    let s = BatterySnapshot::from_telemetry(&t, 42);

    // Assert
    assert_eq!(s.percentage, 87);
    assert_eq!(s.cell_count, 4);
    assert_eq!(s.remaining_ah, 174.0);
    assert!(s.charging, "charge MOSFET flag set");
    assert!(s.discharging, "current below -0.1 A");
    assert!(s.balancing);
    assert_eq!(s.alarms, vec![BatteryAlarm::Undervoltage, BatteryAlarm::Overtemp]);
    assert_eq!(s.remaining_time_hours(), Some(17.4));
}

#[test]
fn test_tank_config_round_trip_for_many_values() {
    for volume_liters in [1, 50, 120, 4_000] {
        for height_mm in [1, 300, 999, 65_535] {
            let config = TankConfig { volume_liters, height_mm };
            let line = TankCommand::SetConfig(config).encode();
            assert_eq!(TankMessage::parse(&line), Some(TankMessage::Config(config)));
        }
    }
}

#[test]
fn test_tank_lines_in_either_order_give_same_level() {
    // Arrange
    let lines_a = ["CFG:V=80 H=100", "20"];
    let lines_b = ["20", "CFG:V=80 H=100"];

    // Act
    let fold = |lines: [&str; 2]| {
        lines
            .iter()
            .filter_map(|l| TankMessage::parse(l))
            .fold(TankLevelSnapshot::default(), |s, m| s.apply(&m))
    };

    // Assert
    assert_eq!(fold(lines_a).percentage, 80.0);
    assert_eq!(fold(lines_a), fold(lines_b));
}
