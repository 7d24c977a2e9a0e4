//! Device bootstrap: identity, mode, device record and ports.

use tokio::net::UdpSocket;
use tracing::{debug, error, info};
use tollgate_core::{DeviceId, Mode};
use tollgate_hardware::Ports;
use tollgate_storage::{Database, DeviceRepository, SqliteDeviceRepository};

use crate::error::ResolveError;
use crate::mode::{self, RequestedMode};

/// A terminal ready to start its workers.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub device: DeviceId,
    pub mode: Mode,
    pub ports: Ports,
    pub db: Database,
}

/// Resolve the device and open the ports it needs.
///
/// On failure every port that was opened is closed again.
///
/// # Errors
///
/// Any [`ResolveError`]; the caller exits with
/// [`EXIT_RESOLUTION_FAILED`](tollgate_core::constants::EXIT_RESOLUTION_FAILED).
pub async fn bootstrap(
    device: Option<DeviceId>,
    requested: RequestedMode,
    ports: Ports,
    db: Database,
) -> Result<Terminal, ResolveError> {
    let device = device.ok_or(ResolveError::MissingDeviceId)?;

    let available = ports.available();
    debug!(?available, %requested, "Resolving device mode");
    let mode = mode::resolve(requested, &available)?;
    info!(device_id = %device, %mode, "Device mode resolved");

    let ip = local_ip().await;
    SqliteDeviceRepository::new(db.pool().clone())
        .touch(&device, mode, ip.as_deref())
        .await?;

    if let Err(e) = ports.open_roles(mode::dependencies(mode)).await {
        error!(error = %e, "Failed to open ports");
        ports.close_all().await;
        return Err(e.into());
    }

    Ok(Terminal {
        device,
        mode,
        ports,
        db,
    })
}

/// Address of the interface that routes outwards. No packet is sent.
async fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("192.0.2.1:9").await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then(|| ip.to_string())
}
