//! Battery snapshot derived from BMS telemetry.
//!
//! The raw [`BmsTelemetry`] is turned into the figures a dashboard shows:
//! pack power, spread between the weakest and strongest cell, remaining
//! amp-hours, charge direction and the list of active alarms.

use serde::Serialize;

use crate::protocol::bms::BmsTelemetry;

/// Current (in amps) above which the pack counts as charging or discharging
/// even when the MOSFET flags say otherwise.
pub const CURRENT_DEADBAND_A: f64 = 0.1;

/// Named alarm conditions reported in the BMS error bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryAlarm {
    Undervoltage,
    Overvoltage,
    OvercurrentDischarge,
    OvercurrentCharge,
    Undertemp,
    Overtemp,
    CellImbalance,
}

impl BatteryAlarm {
    /// Every alarm, ordered by its bit position in the bitmask.
    pub const ALL: [BatteryAlarm; 7] = [
        BatteryAlarm::Undervoltage,
        BatteryAlarm::Overvoltage,
        BatteryAlarm::OvercurrentDischarge,
        BatteryAlarm::OvercurrentCharge,
        BatteryAlarm::Undertemp,
        BatteryAlarm::Overtemp,
        BatteryAlarm::CellImbalance,
    ];

    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Decodes the alarm bitmask; bits above 6 are ignored.
pub fn parse_alarms(error_bits: u16) -> Vec<BatteryAlarm> {
    BatteryAlarm::ALL
        .into_iter()
        .filter(|alarm| error_bits & alarm.bit() != 0)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatterySnapshot {
    /// State of charge, 0–100.
    pub percentage: u8,
    pub voltage: f64,
    /// Positive while charging.
    pub current: f64,
    /// Watts, positive while charging.
    pub power: f64,

    /// Reported cells only (zero slots removed).
    pub cell_voltages: Vec<f64>,
    pub cell_count: u16,
    pub min_cell_voltage: f64,
    pub max_cell_voltage: f64,
    pub cell_delta: f64,

    pub temp_mos: i32,
    pub temp_cell_1: i32,
    pub temp_cell_2: i32,

    pub capacity_ah: f64,
    pub remaining_ah: f64,
    pub cycle_count: u16,

    pub charging: bool,
    pub discharging: bool,
    pub balancing: bool,
    pub balance_current: f64,

    pub alarms: Vec<BatteryAlarm>,
    pub has_alarm: bool,

    /// Milliseconds since the Unix epoch of the frame this snapshot came
    /// from; `None` until the first frame.
    pub last_update_ms: Option<u64>,
}

impl BatterySnapshot {
    pub fn from_telemetry(t: &BmsTelemetry, received_at_ms: u64) -> Self {
        let cells: Vec<f64> = t.cell_voltages.iter().copied().filter(|v| *v > 0.0).collect();
        let (min, max) = if cells.is_empty() {
            (0.0, 0.0)
        } else {
            cells.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
        };
        let cell_count = match t.cell_count {
            0 => u16::try_from(cells.len()).unwrap_or(u16::MAX),
            n => n,
        };
        let alarms = parse_alarms(t.errors);

        Self {
            percentage: t.soc,
            voltage: t.total_voltage,
            current: t.current,
            power: t.total_voltage * t.current,
            cell_count,
            min_cell_voltage: min,
            max_cell_voltage: max,
            cell_delta: max - min,
            cell_voltages: cells,
            temp_mos: t.temp_mos,
            temp_cell_1: t.temp_sensor_1,
            temp_cell_2: t.temp_sensor_2,
            capacity_ah: t.capacity_ah,
            remaining_ah: f64::from(t.soc) / 100.0 * t.capacity_ah,
            cycle_count: t.cycle_count,
            charging: t.charge_mosfet || t.current > CURRENT_DEADBAND_A,
            discharging: t.discharge_mosfet || t.current < -CURRENT_DEADBAND_A,
            balancing: t.balance_state != 0,
            balance_current: t.balance_current,
            has_alarm: !alarms.is_empty(),
            alarms,
            last_update_ms: Some(received_at_ms),
        }
    }

    /// Hours until empty (discharging) or full (charging); see
    /// [`remaining_time_hours`].
    pub fn remaining_time_hours(&self) -> Option<f64> {
        remaining_time_hours(self.percentage, self.capacity_ah, self.current)
    }
}

/// Hours until the pack is empty (negative `current`) or full (positive
/// `current`).  `None` when the capacity is unknown or no current flows.
pub fn remaining_time_hours(soc: u8, capacity_ah: f64, current: f64) -> Option<f64> {
    if capacity_ah <= 0.0 || current == 0.0 {
        return None;
    }
    let remaining_ah = f64::from(soc) / 100.0 * capacity_ah;
    if current < 0.0 {
        Some(remaining_ah / current.abs())
    } else {
        Some((capacity_ah - remaining_ah) / current)
    }
}

/// Renders a duration in hours as `"45min"`, `"2h"` or `"2h 30m"`, or `"-"`
/// when unknown.
///
/// ```rust
/// use vanlink_core::domain::battery::format_remaining_time;
///
/// assert_eq!(format_remaining_time(Some(0.75)), "45min");
/// assert_eq!(format_remaining_time(Some(2.5)), "2h 30m");
/// assert_eq!(format_remaining_time(None), "-");
/// ```
pub fn format_remaining_time(hours: Option<f64>) -> String {
    let Some(hours) = hours.filter(|h| h.is_finite()) else {
        return "-".to_string();
    };
    if hours < 1.0 {
        return format!("{}min", (hours * 60.0).round() as i64);
    }

    let mut h = hours.floor() as i64;
    let mut m = ((hours - hours.floor()) * 60.0).round() as i64;
    // 1.999 h rounds to 60 minutes; carry it into the hour.
    if m == 60 {
        h += 1;
        m = 0;
    }
    if m == 0 {
        format!("{h}h")
    } else {
        format!("{h}h {m}m")
    }
}
