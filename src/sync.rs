//! Blocking wrappers around [`crate::Device`].
//!
//! Each call runs one exchange on the shared runtime and blocks the calling
//! thread until it completes or the retry budget is spent. Calls made from
//! inside a tokio runtime fail with [`TuyaError::Runtime`] instead of blocking.

use crate::codec::Dps;
use crate::device::{Device as AsyncDevice, DeviceBuilder, DeviceKind, PowerState};
use crate::error::{Result, TuyaError};
use crate::runtime;

/// Blocking handle to a Tuya device.
#[derive(Clone)]
pub struct Device {
    inner: AsyncDevice,
}

impl Device {
    /// Plug on the default port with protocol 3.1.
    pub fn new<I, K, H>(id: I, local_key: K, host: H) -> Result<Self>
    where
        I: Into<String>,
        K: Into<Vec<u8>>,
        H: Into<String>,
    {
        AsyncDevice::new(id, local_key, host).map(Self::from)
    }

    pub fn from_builder(builder: DeviceBuilder) -> Result<Self> {
        builder.build().map(Self::from)
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    pub fn kind(&self) -> DeviceKind {
        self.inner.kind()
    }

    pub fn state(&self) -> PowerState {
        self.inner.state()
    }

    pub fn last_error(&self) -> Option<TuyaError> {
        self.inner.last_error()
    }

    pub fn error_code(&self) -> u32 {
        self.inner.error_code()
    }

    /// The async device this handle drives.
    pub fn inner(&self) -> &AsyncDevice {
        &self.inner
    }

    pub fn get(&self) -> Result<PowerState> {
        runtime::block_on(self.inner.get())?
    }

    pub fn set(&self, on: bool) -> Result<()> {
        runtime::block_on(self.inner.set(on))?
    }

    pub fn toggle(&self) -> Result<()> {
        runtime::block_on(self.inner.toggle())?
    }

    pub fn set_dps(&self, dps: Dps) -> Result<()> {
        runtime::block_on(self.inner.set_dps(dps))?
    }

    pub fn as_bulb(&self) -> Option<Bulb<'_>> {
        self.inner.as_bulb().map(|_| Bulb { device: self })
    }
}

impl From<AsyncDevice> for Device {
    fn from(inner: AsyncDevice) -> Self {
        Self { inner }
    }
}

/// Blocking bulb controls.
#[derive(Clone, Copy)]
pub struct Bulb<'a> {
    device: &'a Device,
}

impl<'a> Bulb<'a> {
    fn bulb(&self) -> Result<crate::device::Bulb<'a>> {
        self.device
            .inner
            .as_bulb()
            .ok_or_else(|| TuyaError::Argument("device is not a bulb".into()))
    }

    pub fn set_color_hsv(&self, h: u8, s: u8, v: u8) -> Result<()> {
        let bulb = self.bulb()?;
        runtime::block_on(bulb.set_color_hsv(h, s, v))?
    }

    pub fn set_color_rgb(&self, r: u8, g: u8, b: u8) -> Result<()> {
        let bulb = self.bulb()?;
        runtime::block_on(bulb.set_color_rgb(r, g, b))?
    }

    pub fn set_white(&self, brightness: u8, temp: u8) -> Result<()> {
        let bulb = self.bulb()?;
        runtime::block_on(bulb.set_white(brightness, temp))?
    }
}
