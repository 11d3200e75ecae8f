//! USB access to physical iOS devices through usbmuxd.
//!
//! [`list_devices`] enumerates attached devices and [`connect`] opens a
//! tunneled TCP stream to a port on one of them. HTTP clients cannot dial a
//! tunnel directly, so [`UsbForwarder`] listens on a loopback port and pipes
//! every accepted connection through a fresh tunnel stream. A [`UsbLink`]
//! holds one forwarder for the agent port and one for the MJPEG port;
//! [`Client::usb`](crate::Client::usb) points a tunnel-bound HTTP client at
//! the agent side.
//!
//! # Example
//!
//! ```no_run
//! use wdakit::usb_tunnel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let devices = usb_tunnel::list_devices().await?;
//! let device = &devices[0];
//!
//! // Expose the device's agent port on 127.0.0.1.
//! let forwarder = usb_tunnel::UsbForwarder::bind(&device.udid, 8100).await?;
//! println!("agent reachable at http://{}", forwarder.local_addr());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use idevice::usbmuxd::{Connection, UsbmuxdConnection};
use idevice::ReadWrite;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::WdaConfig;

/// Label usbmuxd records for connections opened by this crate.
const USBMUXD_LABEL: &str = "wdakit";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during USB tunnel operations.
#[derive(Error, Debug)]
pub enum UsbTunnelError {
    /// Failed to connect to the local usbmuxd daemon.
    #[error("failed to connect to usbmuxd: {0}")]
    UsbmuxdUnavailable(String),

    /// No device with the given UDID was found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to establish a tunnel to the device port.
    #[error("tunnel connection failed: {0}")]
    ConnectionFailed(String),

    /// The tunnel connection returned no usable socket.
    #[error("tunnel socket unavailable")]
    NoSocket,

    /// The local forwarding listener could not be set up.
    #[error("local forwarder failed: {0}")]
    Forwarder(#[from] std::io::Error),
}

impl From<idevice::IdeviceError> for UsbTunnelError {
    fn from(err: idevice::IdeviceError) -> Self {
        UsbTunnelError::ConnectionFailed(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// A physical iOS device discovered via usbmuxd.
#[derive(Debug, Clone)]
pub struct Device {
    /// Unique Device Identifier (UDID), also used as the device's serial.
    pub udid: String,
    /// The usbmuxd-assigned numeric device ID.
    pub device_id: u32,
    /// How the device is connected.
    pub connection: DeviceConnection,
    /// Port WebDriverAgent listens on inside the device. `None` uses
    /// [`WdaConfig::agent_port`].
    pub agent_port: Option<u16>,
    /// Port of the agent's MJPEG screen stream inside the device. `None`
    /// uses [`WdaConfig::mjpeg_port`].
    pub mjpeg_port: Option<u16>,
}

impl Device {
    /// A USB device known only by its UDID.
    pub fn new(udid: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            device_id: 0,
            connection: DeviceConnection::Usb,
            agent_port: None,
            mjpeg_port: None,
        }
    }

    /// Overrides the device-side ports.
    pub fn with_ports(mut self, agent_port: u16, mjpeg_port: u16) -> Self {
        self.agent_port = Some(agent_port);
        self.mjpeg_port = Some(mjpeg_port);
        self
    }

    /// The agent and MJPEG ports to tunnel to, falling back to `config`.
    pub fn ports(&self, config: &WdaConfig) -> (u16, u16) {
        (
            self.agent_port.unwrap_or(config.agent_port),
            self.mjpeg_port.unwrap_or(config.mjpeg_port),
        )
    }
}

/// How a physical device is connected to the host.
#[derive(Debug, Clone)]
pub enum DeviceConnection {
    /// Connected via USB cable.
    Usb,
    /// Connected via the network (WiFi).
    Network(IpAddr),
    /// Unknown connection type.
    Unknown(String),
}

impl fmt::Display for DeviceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceConnection::Usb => write!(f, "USB"),
            DeviceConnection::Network(ip) => write!(f, "Network ({ip})"),
            DeviceConnection::Unknown(s) => write!(f, "Unknown ({s})"),
        }
    }
}

impl From<Connection> for DeviceConnection {
    fn from(conn: Connection) -> Self {
        match conn {
            Connection::Usb => DeviceConnection::Usb,
            Connection::Network(ip) => DeviceConnection::Network(ip),
            Connection::Unknown(s) => DeviceConnection::Unknown(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// List all physical iOS devices currently connected via usbmuxd.
///
/// Devices carry no port overrides; [`Device::ports`] resolves them
/// against the configuration.
pub async fn list_devices() -> Result<Vec<Device>, UsbTunnelError> {
    let mut muxd = UsbmuxdConnection::default()
        .await
        .map_err(|e| UsbTunnelError::UsbmuxdUnavailable(e.to_string()))?;

    let devices = muxd
        .get_devices()
        .await
        .map_err(|e| UsbTunnelError::UsbmuxdUnavailable(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| Device {
            udid: d.udid,
            device_id: d.device_id,
            connection: d.connection_type.into(),
            agent_port: None,
            mjpeg_port: None,
        })
        .collect())
}

/// Establish a USB tunnel to a device port and return a stream.
///
/// Connects to the usbmuxd daemon, finds the device by UDID, and creates a
/// tunneled connection to the given port on the device.
///
/// # Arguments
///
/// * `udid` - The UDID of the target device
/// * `port` - The TCP port on the device to tunnel to (e.g., 8100 for the agent)
pub async fn connect(udid: &str, port: u16) -> Result<Box<dyn ReadWrite>, UsbTunnelError> {
    let mut muxd = UsbmuxdConnection::default()
        .await
        .map_err(|e| UsbTunnelError::UsbmuxdUnavailable(e.to_string()))?;

    let device = muxd
        .get_device(udid)
        .await
        .map_err(|_| UsbTunnelError::DeviceNotFound(udid.to_string()))?;

    let idevice = muxd
        .connect_to_device(device.device_id, port, USBMUXD_LABEL)
        .await?;

    idevice.get_socket().ok_or(UsbTunnelError::NoSocket)
}

// ---------------------------------------------------------------------------
// UsbForwarder
// ---------------------------------------------------------------------------

/// A loopback listener that forwards each connection to a device port.
///
/// Every accepted connection gets its own tunnel stream; a tunnel that
/// cannot be opened closes the accepted connection. The listener stops when
/// the forwarder is dropped.
#[derive(Debug)]
pub struct UsbForwarder {
    udid: String,
    device_port: u16,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl UsbForwarder {
    /// Binds `127.0.0.1:0` and starts forwarding to `port` on `udid`.
    pub async fn bind(udid: &str, port: u16) -> Result<Self, UsbTunnelError> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let local_addr = listener.local_addr()?;
        debug!(udid, port, %local_addr, "usb forwarder listening");
        let task = tokio::spawn(accept_loop(listener, udid.to_string(), port));
        Ok(Self {
            udid: udid.to_string(),
            device_port: port,
            local_addr,
            task,
        })
    }

    /// The loopback address accepting connections.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn udid(&self) -> &str {
        &self.udid
    }

    pub fn device_port(&self) -> u16 {
        self.device_port
    }
}

impl Drop for UsbForwarder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// UsbLink
// ---------------------------------------------------------------------------

/// The agent and MJPEG forwarders for one device.
#[derive(Debug)]
pub struct UsbLink {
    agent: UsbForwarder,
    mjpeg: UsbForwarder,
}

impl UsbLink {
    /// Opens forwarders to the device's agent and MJPEG ports, as resolved
    /// by [`Device::ports`].
    pub async fn open(device: &Device, config: &WdaConfig) -> Result<Self, UsbTunnelError> {
        let (agent_port, mjpeg_port) = device.ports(config);
        Ok(Self {
            agent: UsbForwarder::bind(&device.udid, agent_port).await?,
            mjpeg: UsbForwarder::bind(&device.udid, mjpeg_port).await?,
        })
    }

    pub fn agent(&self) -> &UsbForwarder {
        &self.agent
    }

    pub fn mjpeg(&self) -> &UsbForwarder {
        &self.mjpeg
    }
}

async fn accept_loop(listener: TcpListener, udid: String, port: u16) {
    loop {
        let (mut inbound, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(udid = %udid, error = %e, "usb forwarder accept failed");
                return;
            }
        };
        let udid = udid.clone();
        tokio::spawn(async move {
            let mut tunnel = match connect(&udid, port).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(udid = %udid, port, %peer, error = %e, "usb tunnel unavailable");
                    return;
                }
            };
            match tokio::io::copy_bidirectional(&mut inbound, &mut tunnel).await {
                Ok((up, down)) => debug!(%peer, up, down, "usb tunnel closed"),
                Err(e) => debug!(%peer, error = %e, "usb tunnel aborted"),
            }
        });
    }
}
