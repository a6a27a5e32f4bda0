//! WaterSystem: tanks and drain valve of the water module.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use vanlink_core::protocol::addressing::water;
use vanlink_core::{AdminSnapshot, Observable, TankLevelSnapshot, ValveState};

use super::{line_channel, Connection};
use crate::application::admin::AdminModule;
use crate::application::drain_valve::{DrainValve, DrainValveOptions};
use crate::application::tank_sensor::TankLevelSensor;
use crate::infrastructure::link::{PeripheralLink, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankKind {
    Clean,
    Grey,
}

impl FromStr for TankKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(Self::Clean),
            "grey" => Ok(Self::Grey),
            other => Err(format!("unknown tank {other:?} (expected clean or grey)")),
        }
    }
}

/// Every snapshot of the water module at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterSnapshot {
    pub admin: AdminSnapshot,
    pub clean_tank: TankLevelSnapshot,
    pub grey_tank: TankLevelSnapshot,
    pub grey_drain_valve: ValveState,
}

pub struct WaterSystem {
    pub admin: AdminModule,
    pub clean_tank: TankLevelSensor,
    pub grey_tank: TankLevelSensor,
    pub grey_drain_valve: DrainValve,
    connection: Connection,
}

impl WaterSystem {
    pub fn new(link: Arc<dyn PeripheralLink>) -> Self {
        Self::with_options(link, DrainValveOptions::default())
    }

    pub fn with_options(link: Arc<dyn PeripheralLink>, valve: DrainValveOptions) -> Self {
        let s = water::SERVICE;
        Self {
            admin: AdminModule::new(line_channel(&link, s, water::ADMIN, "water/admin")),
            clean_tank: TankLevelSensor::new(line_channel(&link, s, water::CLEAN_TANK, "water/clean_tank")),
            grey_tank: TankLevelSensor::new(line_channel(&link, s, water::GREY_TANK, "water/grey_tank")),
            grey_drain_valve: DrainValve::with_options(
                line_channel(&link, s, water::GREY_VALVE, "water/grey_valve"),
                valve,
            ),
            connection: Connection::new(link, "water"),
        }
    }

    pub fn tank(&self, kind: TankKind) -> &TankLevelSensor {
        match kind {
            TankKind::Clean => &self.clean_tank,
            TankKind::Grey => &self.grey_tank,
        }
    }

    pub fn snapshot(&self) -> WaterSnapshot {
        WaterSnapshot {
            admin: self.admin.get_value(),
            clean_tank: self.clean_tank.get_value(),
            grey_tank: self.grey_tank.get_value(),
            grey_drain_valve: self.grey_drain_valve.get_value(),
        }
    }

    /// Disposes every domain object.  Idempotent.
    pub fn dispose(&self) {
        if !self.connection.mark_disposed() {
            return;
        }
        self.admin.dispose();
        self.clean_tank.dispose();
        self.grey_tank.dispose();
        self.grey_drain_valve.dispose();
    }

    /// Disposes, then cancels the physical connection once.
    ///
    /// # Errors
    ///
    /// Returns the link's error if cancelling fails.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.dispose();
        self.connection.cancel().await
    }
}
