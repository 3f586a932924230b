//! Driver selection for the configured data source

use std::net::SocketAddr;

use flow_core::DataSource;

use crate::{DeviceUdpDriver, MeterDriver, SimulatorDriver};

/// Per-source settings needed to construct a meter driver
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Simulator poll interval, seconds
    pub poll_interval: u64,
    /// UDP bind address for live device reports
    pub udp_bind: SocketAddr,
}

/// Build the meter driver for the selected data source.
///
/// Demo mode gets the synthetic simulator; live mode listens for the
/// field device's UDP reports. The driver is returned stopped.
pub fn build_driver(source: DataSource, settings: &DriverSettings) -> Box<dyn MeterDriver> {
    match source {
        DataSource::Demo => Box::new(SimulatorDriver::new(settings.poll_interval)),
        DataSource::Live => Box::new(DeviceUdpDriver::new(settings.udp_bind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn settings() -> DriverSettings {
        DriverSettings {
            poll_interval: 300,
            udp_bind: SocketAddr::from_str("127.0.0.1:0").unwrap(),
        }
    }

    #[test]
    fn test_demo_source_selects_simulator() {
        let driver = build_driver(DataSource::Demo, &settings());
        assert_eq!(driver.name(), "simulator");
        assert!(!driver.is_active());
    }

    #[test]
    fn test_live_source_selects_device_udp() {
        let driver = build_driver(DataSource::Live, &settings());
        assert_eq!(driver.name(), "device-udp");
        assert!(!driver.is_active());
    }
}
