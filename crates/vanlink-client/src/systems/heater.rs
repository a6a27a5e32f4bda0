//! HeaterSystem: four heating zones plus the cabin environment sensor.

use std::sync::Arc;

use serde::Serialize;
use vanlink_core::protocol::addressing::heater;
use vanlink_core::{AdminSnapshot, EnvironmentSnapshot, HeaterZoneSnapshot, Observable};

use super::{line_channel, Connection};
use crate::application::admin::AdminModule;
use crate::application::environment::EnvironmentData;
use crate::application::heater_zone::{HeaterZone, HeaterZoneOptions};
use crate::infrastructure::link::{PeripheralLink, TransportError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaterSnapshot {
    pub admin: AdminSnapshot,
    pub zones: Vec<HeaterZoneSnapshot>,
    pub environment: EnvironmentSnapshot,
}

pub struct HeaterSystem {
    pub admin: AdminModule,
    /// Indexed by zone number, `0..ZONE_COUNT`.
    pub zones: Vec<HeaterZone>,
    pub environment: EnvironmentData,
    connection: Connection,
}

impl HeaterSystem {
    pub fn new(link: Arc<dyn PeripheralLink>) -> Self {
        Self::with_options(link, HeaterZoneOptions::default())
    }

    pub fn with_options(link: Arc<dyn PeripheralLink>, zone_options: HeaterZoneOptions) -> Self {
        let s = heater::SERVICE;
        let zones = (0..heater::ZONE_COUNT)
            .zip(heater::ZONE_BASE..)
            .map(|(index, channel)| {
                let label = format!("heater/zone{index}");
                HeaterZone::with_options(line_channel(&link, s, channel, &label), index, zone_options)
            })
            .collect();
        Self {
            admin: AdminModule::new(line_channel(&link, s, heater::ADMIN, "heater/admin")),
            zones,
            environment: EnvironmentData::new(line_channel(&link, s, heater::ENVIRONMENT, "heater/environment")),
            connection: Connection::new(link, "heater"),
        }
    }

    pub fn zone(&self, index: usize) -> Option<&HeaterZone> {
        self.zones.get(index)
    }

    pub fn snapshot(&self) -> HeaterSnapshot {
        HeaterSnapshot {
            admin: self.admin.get_value(),
            zones: self.zones.iter().map(Observable::get_value).collect(),
            environment: self.environment.get_value(),
        }
    }

    /// Disposes every domain object and stops the zone polls.  Idempotent.
    pub fn dispose(&self) {
        if !self.connection.mark_disposed() {
            return;
        }
        self.admin.dispose();
        for zone in &self.zones {
            zone.dispose();
        }
        self.environment.dispose();
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
