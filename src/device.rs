//! Individual Tuya device control and cached state.
//! Composes the payload codec and the frame transport into `get`, `set` and
//! `toggle`, plus colour and white control for bulbs.

use crate::codec::{CommandEnvelope, Dps, PayloadCodec, StatusResponse};
use crate::color::rgb_to_hsv;
use crate::error::{ERR_SUCCESS, Result, TuyaError};
use crate::protocol::CommandType;
use crate::transport::{FrameTransport, TransportConfig};
use log::{debug, info};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_PORT: u16 = 6668;
pub const DEFAULT_VERSION: &str = "3.1";

/// Lowest brightness a bulb accepts in white mode.
pub const MIN_BRIGHTNESS: u8 = 25;

const DP_POWER: &str = "1";
const DP_MODE: &str = "2";
const DP_BRIGHTNESS: &str = "3";
const DP_TEMPERATURE: &str = "4";
const DP_COLOUR: &str = "5";

const MODE_COLOUR: &str = "colour";
const MODE_WHITE: &str = "white";

/// Cached power state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Off,
    On,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}

/// What a device can do beyond switching on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Plug,
    Bulb,
}

struct DeviceState {
    power: PowerState,
    last_error: Option<TuyaError>,
}

/// Builder for [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceBuilder {
    id: String,
    local_key: Vec<u8>,
    host: String,
    port: u16,
    version: String,
    kind: DeviceKind,
    config: TransportConfig,
}

impl DeviceBuilder {
    pub fn new<I, K>(id: I, local_key: K) -> Self
    where
        I: Into<String>,
        K: Into<Vec<u8>>,
    {
        Self {
            id: id.into(),
            local_key: local_key.into(),
            host: String::new(),
            port: DEFAULT_PORT,
            version: DEFAULT_VERSION.to_string(),
            kind: DeviceKind::Plug,
            config: TransportConfig::default(),
        }
    }

    pub fn host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn version<V: Into<String>>(mut self, version: V) -> Self {
        self.version = version.into();
        self
    }

    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the key and host and builds the device.
    pub fn build(self) -> Result<Device> {
        if self.host.is_empty() {
            return Err(TuyaError::Argument("device host is required".into()));
        }
        let codec = PayloadCodec::new(&self.local_key, &self.version)?;
        let transport = FrameTransport::new(self.host, self.port, self.config);

        Ok(Device {
            id: self.id,
            kind: self.kind,
            codec,
            transport,
            state: Arc::new(RwLock::new(DeviceState {
                power: PowerState::Off,
                last_error: Some(TuyaError::Uninitialized),
            })),
            in_flight: Arc::new(Mutex::new(())),
        })
    }
}

/// Represents a Tuya device and handles communication.
///
/// Clones share cached state and never have more than one exchange in flight.
#[derive(Clone)]
pub struct Device {
    id: String,
    kind: DeviceKind,
    codec: PayloadCodec,
    transport: FrameTransport,
    state: Arc<RwLock<DeviceState>>,
    in_flight: Arc<Mutex<()>>,
}

impl Device {
    // -------------------------------------------------------------------------
    // Public API
    // -------------------------------------------------------------------------

    /// Plug on the default port with protocol 3.1.
    pub fn new<I, K, H>(id: I, local_key: K, host: H) -> Result<Self>
    where
        I: Into<String>,
        K: Into<Vec<u8>>,
        H: Into<String>,
    {
        DeviceBuilder::new(id, local_key).host(host).build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        self.transport.host()
    }

    pub fn port(&self) -> u16 {
        self.transport.port()
    }

    pub fn version(&self) -> &str {
        self.codec.version()
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Power state as of the last successful `get` or `set`.
    pub fn state(&self) -> PowerState {
        self.state.read().power
    }

    /// Outcome of the last operation; `None` after a success.
    pub fn last_error(&self) -> Option<TuyaError> {
        self.state.read().last_error.clone()
    }

    /// Numeric form of [`last_error`](Self::last_error), `0` on success.
    pub fn error_code(&self) -> u32 {
        self.state
            .read()
            .last_error
            .as_ref()
            .map_or(ERR_SUCCESS, TuyaError::code)
    }

    /// Bulb controls, when this device was built as a bulb.
    pub fn as_bulb(&self) -> Option<Bulb<'_>> {
        (self.kind == DeviceKind::Bulb).then_some(Bulb { device: self })
    }
}

// -------------------------------------------------------------------------
// Device Control API
// -------------------------------------------------------------------------
impl Device {
    /// Queries the device and returns its power state (`dps["1"]`).
    pub async fn get(&self) -> Result<PowerState> {
        let result = self.query_power().await;
        if let Ok(power) = result {
            self.state.write().power = power;
        }
        self.finish(result)
    }

    /// Switches the device on or off.
    pub async fn set(&self, on: bool) -> Result<()> {
        let mut dps = Dps::new();
        dps.insert(DP_POWER.into(), Value::Bool(on));
        dps.insert(DP_MODE.into(), 0.into());
        self.set_dps(dps).await
    }

    /// Inverts the cached power state.
    pub async fn toggle(&self) -> Result<()> {
        self.set(!self.state().is_on()).await
    }

    /// Sends an arbitrary set of data points.
    ///
    /// This is a low-level API. For common operations, use [`set`](Self::set)
    /// or the [`Bulb`] controls. A boolean power data point updates the
    /// cached state once the device acknowledges.
    pub async fn set_dps(&self, dps: Dps) -> Result<()> {
        let power = dps.get(DP_POWER).and_then(Value::as_bool);
        let result = self.control(dps).await;
        if let (Ok(()), Some(on)) = (&result, power) {
            self.state.write().power = PowerState::from(on);
        }
        self.finish(result)
    }
}

// -------------------------------------------------------------------------
// Internal Communication Helpers
// -------------------------------------------------------------------------
impl Device {
    async fn query_power(&self) -> Result<PowerState> {
        let payload = self.codec.encode(&CommandEnvelope::get(&self.id), false)?;
        let response = self.send(&payload, CommandType::DpQuery).await?;

        let status: StatusResponse = self.codec.decode(&response)?;
        match status.dps.get(DP_POWER) {
            Some(Value::Bool(on)) => Ok(PowerState::from(*on)),
            Some(other) => Err(TuyaError::Parse(format!(
                "dps {} is not a boolean: {}",
                DP_POWER, other
            ))),
            None => Err(TuyaError::Parse(format!("dps {} missing", DP_POWER))),
        }
    }

    /// Encrypted control request; devices acknowledge with an empty body.
    async fn control(&self, dps: Dps) -> Result<()> {
        let payload = self
            .codec
            .encode(&CommandEnvelope::set(&self.id, dps), true)?;
        let response = self.send(&payload, CommandType::Control).await?;

        if !response.is_empty() {
            debug!(
                "Unexpected control response from {}: {}",
                self.id,
                String::from_utf8_lossy(&response)
            );
            return Err(TuyaError::LengthMismatch);
        }
        Ok(())
    }

    async fn send(&self, payload: &[u8], cmd: CommandType) -> Result<Vec<u8>> {
        let _guard = self.in_flight.lock().await;
        debug!("request: device={}, cmd={:?}", self.id, cmd);
        let response = self.transport.exchange(payload, cmd).await?;
        if !response.is_empty() {
            debug!("Response: {}", String::from_utf8_lossy(&response));
        }
        Ok(response)
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            info!("Operation on device {} failed: {}", self.id, e);
        }
        self.state.write().last_error = result.as_ref().err().cloned();
        result
    }
}

/// Colour and white-mode controls, available on devices built as bulbs.
#[derive(Clone, Copy)]
pub struct Bulb<'a> {
    device: &'a Device,
}

impl Bulb<'_> {
    /// Sets the colour from an HSV byte triple (sent as `hhssvv`).
    pub async fn set_color_hsv(&self, h: u8, s: u8, v: u8) -> Result<()> {
        let mut dps = Dps::new();
        dps.insert(DP_COLOUR.into(), hex::encode([h, s, v]).into());
        dps.insert(DP_MODE.into(), MODE_COLOUR.into());
        self.device.set_dps(dps).await
    }

    /// Sets the colour from RGB, converted to the bulb's HSV representation.
    pub async fn set_color_rgb(&self, r: u8, g: u8, b: u8) -> Result<()> {
        let (h, s, v) = rgb_to_hsv(r, g, b);
        self.set_color_hsv(h, s, v).await
    }

    /// Switches to white mode. `brightness` must be at least 25.
    pub async fn set_white(&self, brightness: u8, temp: u8) -> Result<()> {
        if brightness < MIN_BRIGHTNESS {
            let err = TuyaError::Argument(format!(
                "brightness must be between {} and 255, got {}",
                MIN_BRIGHTNESS, brightness
            ));
            return self.device.finish(Err(err));
        }

        let mut dps = Dps::new();
        dps.insert(DP_MODE.into(), MODE_WHITE.into());
        dps.insert(DP_BRIGHTNESS.into(), brightness.into());
        dps.insert(DP_TEMPERATURE.into(), temp.into());
        self.device.set_dps(dps).await
    }
}
