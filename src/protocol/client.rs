//! UDP client for the bulb control protocol.
//!
//! Every request opens its own socket, sends one datagram and waits for one
//! reply. There is no request id: with a single request in flight per socket,
//! whatever arrives on that socket is the answer. The socket is dropped on
//! every return path, including timeouts and decode failures.

use super::message::{Method, Pilot, PilotParams, Request, Response, WIZ_PORT};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{DeviceState, StateUpdate, DEFAULT_SCENE_SPEED};
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};

/// Default wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Large enough for any reply the firmware sends.
const MAX_DATAGRAM: usize = 4096;

/// Client for talking to bulbs.
#[derive(Debug, Clone)]
pub struct WizClient {
    port: u16,
    timeout: Duration,
}

impl Default for WizClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl WizClient {
    /// Create a client using the standard port.
    pub fn new(timeout: Duration) -> Self {
        Self {
            port: WIZ_PORT,
            timeout,
        }
    }

    /// Talk to devices on a non-standard port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Configured reply timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request and wait for one reply.
    ///
    /// Replies carrying an `error` object are returned as
    /// [`ProtocolError::Device`].
    pub async fn send_command(
        &self,
        ip: Ipv4Addr,
        request: &Request,
        wait: Duration,
    ) -> ProtocolResult<Response> {
        let payload = request.to_bytes().map_err(ProtocolError::Encode)?;
        let addr = SocketAddr::from((ip, self.port));

        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.connect(addr).await?;
        socket.send(&payload).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = match timeout(wait, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ProtocolError::Network(e)),
            Err(_) => return Err(ProtocolError::Timeout(wait.as_millis() as u64)),
        };

        let response: Response = serde_json::from_slice(&buf[..n])
            .map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(ProtocolError::Device {
                code: err.code,
                message: err.message,
            });
        }

        trace!(%ip, method = request.method(), bytes = n, "reply received");
        Ok(response)
    }

    /// Check whether a bulb answers at `ip`.
    ///
    /// Returns the pilot payload only when the reply carries a `result`.
    /// Silence and transport errors are the normal outcome for an empty
    /// address and are not reported above trace level.
    pub async fn probe(&self, ip: Ipv4Addr, wait: Option<Duration>) -> Option<Pilot> {
        let wait = wait.unwrap_or(self.timeout);
        match self.send_command(ip, &Request::get_pilot(), wait).await {
            Ok(response) => {
                let result = response.result?;
                match serde_json::from_value::<Pilot>(result) {
                    Ok(pilot) => Some(pilot),
                    Err(e) => {
                        debug!(%ip, error = %e, "probe reply has unexpected result shape");
                        None
                    }
                }
            }
            Err(e) if e.is_expected_absence() => {
                trace!(%ip, error = %e, "no device");
                None
            }
            Err(e) => {
                debug!(%ip, error = %e, "probe failed");
                None
            }
        }
    }

    /// Query the current state of a known device.
    pub async fn get_state(&self, ip: Ipv4Addr) -> Option<DeviceState> {
        match self.send_command(ip, &Request::get_pilot(), self.timeout).await {
            Ok(response) => {
                let result = response.result?;
                match serde_json::from_value::<Pilot>(result) {
                    Ok(pilot) => Some(pilot.to_state()),
                    Err(e) => {
                        warn!(%ip, error = %e, "state reply has unexpected result shape");
                        None
                    }
                }
            }
            Err(e) => {
                report_failure(ip, Method::GetPilot, &e);
                None
            }
        }
    }

    /// Fetch firmware and module details.
    pub async fn get_system_config(&self, ip: Ipv4Addr) -> Option<Value> {
        match self
            .send_command(ip, &Request::get_system_config(), self.timeout)
            .await
        {
            Ok(response) => response.result,
            Err(e) => {
                report_failure(ip, Method::GetSystemConfig, &e);
                None
            }
        }
    }

    /// Turn a device on or off.
    pub async fn set_power(&self, ip: Ipv4Addr, on: bool) -> bool {
        self.set_state(
            ip,
            &StateUpdate {
                power: Some(on),
                ..Default::default()
            },
        )
        .await
    }

    /// Apply a partial state.
    ///
    /// Only fields present in `update` are sent, after clamping. Success means
    /// a reply arrived without an error; it does not confirm the device
    /// applied the change.
    pub async fn set_state(&self, ip: Ipv4Addr, update: &StateUpdate) -> bool {
        if update.is_empty() {
            warn!(%ip, "empty state update, nothing sent");
            return false;
        }
        self.send_pilot(ip, &PilotParams::from(update)).await
    }

    /// Start a preset scene at the given speed (defaults to 100).
    pub async fn set_scene(&self, ip: Ipv4Addr, scene_id: u16, speed: Option<u8>) -> bool {
        let update = StateUpdate {
            scene_id: Some(scene_id),
            speed: Some(speed.unwrap_or(DEFAULT_SCENE_SPEED)),
            ..Default::default()
        };
        self.send_pilot(ip, &PilotParams::from(&update)).await
    }

    async fn send_pilot(&self, ip: Ipv4Addr, params: &PilotParams) -> bool {
        let request = match Request::set_pilot(params) {
            Ok(request) => request,
            Err(e) => {
                report_failure(ip, Method::SetPilot, &ProtocolError::Encode(e));
                return false;
            }
        };
        match self.send_command(ip, &request, self.timeout).await {
            Ok(_) => true,
            Err(e) => {
                report_failure(ip, Method::SetPilot, &e);
                false
            }
        }
    }
}

/// Outside of scanning, a transport failure against a known device is a
/// real fault and is logged as an error.
fn report_failure(ip: Ipv4Addr, method: Method, err: &ProtocolError) {
    match err {
        ProtocolError::Network(_) | ProtocolError::Encode(_) => {
            error!(%ip, %method, error = %err, "command failed")
        }
        _ => warn!(%ip, %method, error = %err, "command failed"),
    }
}
