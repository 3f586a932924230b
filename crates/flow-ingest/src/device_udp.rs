//! UDP push driver: receives sensor report JSON from the field device

use crate::{IngestError, IngestResult, MeterDriver};
use flow_core::{Reading, SensorRecord, Source};
use std::net::SocketAddr;
use tokio::{
    net::UdpSocket,
    time::{timeout, Duration},
};

/// Driver for a device that pushes JSON reports over UDP.
///
/// Reports arrive in the device's raw shape (`total_ml`, float
/// timestamps); conversion to a typed `Reading` happens here, and a
/// malformed report is an `InvalidReport`, not a dropped datagram.
pub struct DeviceUdpDriver {
    bind: SocketAddr,
    socket: Option<UdpSocket>,
    active: bool,
    recv_timeout: Duration,
}

impl DeviceUdpDriver {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            socket: None,
            active: false,
            recv_timeout: Duration::from_secs(5),
        }
    }

    fn socket_ref(&self) -> Result<&UdpSocket, IngestError> {
        self.socket
            .as_ref()
            .ok_or_else(|| IngestError::DriverError("socket not active".into()))
    }

    /// Address the socket actually bound to (for port-0 binds in tests)
    pub fn local_addr(&self) -> IngestResult<SocketAddr> {
        self.socket_ref()?
            .local_addr()
            .map_err(|e| IngestError::CommunicationError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Source for DeviceUdpDriver {
    async fn next_reading(&mut self) -> anyhow::Result<Reading> {
        Ok(self.get_reading().await?)
    }
}

#[async_trait::async_trait]
impl MeterDriver for DeviceUdpDriver {
    fn name(&self) -> &str {
        "device-udp"
    }

    async fn start(&mut self) -> IngestResult<()> {
        if self.active {
            return Err(IngestError::DriverError("already started".into()));
        }
        let sock = UdpSocket::bind(self.bind)
            .await
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;
        self.socket = Some(sock);
        self.active = true;
        Ok(())
    }

    async fn stop(&mut self) -> IngestResult<()> {
        self.active = false;
        self.socket = None;
        Ok(())
    }

    async fn get_reading(&mut self) -> IngestResult<Reading> {
        if !self.active {
            return Err(IngestError::DriverError("not active".into()));
        }
        let sock = self.socket_ref()?;
        let mut buf = vec![0u8; 2048];
        let (n, _peer) = timeout(self.recv_timeout, sock.recv_from(&mut buf))
            .await
            .map_err(|_| IngestError::Timeout)?
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;
        let slice = &buf[..n];
        let record: SensorRecord = serde_json::from_slice(slice)
            .map_err(|e| IngestError::InvalidReport(e.to_string()))?;
        Reading::try_from(record).map_err(|e| IngestError::InvalidReport(e.to_string()))
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_device_udp_roundtrip() {
        let bind = SocketAddr::from_str("127.0.0.1:0").unwrap();
        let mut driver = DeviceUdpDriver::new(bind);
        driver.start().await.unwrap();
        let local = driver.local_addr().unwrap();

        // Send a report in the device's native shape
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let json = r#"{
            "timestamp": 1700000000,
            "flow_rate": 8.5,
            "pressure": 3.2,
            "total_ml": 512000,
            "battery_percentage": 85
        }"#;
        sock.send_to(json.as_bytes(), local).await.unwrap();

        let reading = driver.get_reading().await.unwrap();
        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.flow_rate, 8.5);
        assert_eq!(reading.total_volume, Some(512.0));

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_report_without_timestamp_is_invalid() {
        let bind = SocketAddr::from_str("127.0.0.1:0").unwrap();
        let mut driver = DeviceUdpDriver::new(bind);
        driver.start().await.unwrap();
        let local = driver.local_addr().unwrap();

        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sock.send_to(br#"{"flow_rate": 8.5}"#, local).await.unwrap();

        let err = driver.get_reading().await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidReport(_)));
    }
}
