//! Tank level snapshot and the level-sensing formula.

use serde::Serialize;

use crate::protocol::text::tank::{TankConfig, TankMessage};

/// Latest known state of one tank.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TankLevelSnapshot {
    pub capacity_liters: u32,
    /// Distance from the sensor to the bottom of an empty tank.
    pub height_mm: u32,
    /// Fill level in `0.0..=100.0`.
    pub percentage: f64,
    pub last_distance_mm: Option<u32>,
    pub last_message: Option<String>,
}

pub fn clamp01(n: f64) -> f64 {
    n.clamp(0.0, 1.0)
}

/// Fill percentage for a sensor reading `distance_mm` on a tank `height_mm` deep.
///
/// Returns 0 when either input is not finite or the height is not positive;
/// otherwise `clamp01(1 - distance / height) * 100`.
///
/// ```rust
/// use vanlink_core::domain::tank::distance_to_percentage;
///
/// assert_eq!(distance_to_percentage(20.0, 100.0), 80.0);
/// assert_eq!(distance_to_percentage(150.0, 100.0), 0.0);
/// assert_eq!(distance_to_percentage(10.0, 0.0), 0.0);
/// ```
pub fn distance_to_percentage(distance_mm: f64, height_mm: f64) -> f64 {
    if !distance_mm.is_finite() || !height_mm.is_finite() || height_mm <= 0.0 {
        return 0.0;
    }
    clamp01(1.0 - distance_mm / height_mm) * 100.0
}

impl TankLevelSnapshot {
    /// New geometry; the percentage is recomputed from the last distance seen
    /// (or 0 mm when none has arrived yet).
    pub fn with_config(&self, config: TankConfig) -> Self {
        let distance = self.last_distance_mm.unwrap_or(0);
        Self {
            capacity_liters: config.volume_liters,
            height_mm: config.height_mm,
            percentage: distance_to_percentage(f64::from(distance), f64::from(config.height_mm)),
            ..self.clone()
        }
    }

    /// New distance reading, measured against the current height.
    pub fn with_distance(&self, distance_mm: u32) -> Self {
        Self {
            percentage: distance_to_percentage(f64::from(distance_mm), f64::from(self.height_mm)),
            last_distance_mm: Some(distance_mm),
            ..self.clone()
        }
    }

    pub fn apply(&self, message: &TankMessage) -> Self {
        match message {
            TankMessage::Config(config) => self.with_config(*config),
            TankMessage::Distance(d) => self.with_distance(*d),
            TankMessage::Ok => Self {
                last_message: Some("OK".to_string()),
                ..self.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(volume_liters: u32, height_mm: u32) -> TankConfig {
        TankConfig { volume_liters, height_mm }
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(distance_to_percentage(0.0, 100.0), 100.0);
        assert_eq!(distance_to_percentage(-20.0, 100.0), 100.0);
        assert_eq!(distance_to_percentage(100.0, 100.0), 0.0);
        assert_eq!(distance_to_percentage(f64::NAN, 100.0), 0.0);
        assert_eq!(distance_to_percentage(10.0, f64::INFINITY), 0.0);
        assert_eq!(distance_to_percentage(10.0, -1.0), 0.0);
    }

    #[test]
    fn test_percentage_is_non_increasing_in_distance() {
        let mut previous = f64::INFINITY;
        for d in -50..=250 {
            let p = distance_to_percentage(f64::from(d), 200.0);
            assert!(p <= previous, "distance {d}");
            assert!((0.0..=100.0).contains(&p));
            previous = p;
        }
    }

    #[test]
    fn test_config_then_distance_equals_distance_then_config() {
        // Arrange
        let start = TankLevelSnapshot::default();

        // Act
        let a = start.with_config(config(80, 100)).with_distance(20);
        let b = start.with_distance(20).with_config(config(80, 100));

        // Assert
        assert_eq!(a.percentage, 80.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_before_any_distance_assumes_zero() {
        let s = TankLevelSnapshot::default().with_config(config(80, 100));
        assert_eq!(s.percentage, 100.0);
        assert_eq!(s.last_distance_mm, None);
    }

    #[test]
    fn test_distance_without_height_is_zero_percent() {
        let s = TankLevelSnapshot::default().with_distance(40);
        assert_eq!(s.percentage, 0.0);
        assert_eq!(s.last_distance_mm, Some(40));
    }

    #[test]
    fn test_ok_sets_last_message() {
        let s = TankLevelSnapshot::default().apply(&TankMessage::Ok);
        assert_eq!(s.last_message.as_deref(), Some("OK"));
    }
}
