//! # tuya31
//!
//! Tuya Local API (protocol 3.1) client for local control of Tuya-compatible
//! plugs and bulbs without cloud dependencies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tuya31::{Device, PowerState};
//!
//! # async fn run() -> tuya31::error::Result<()> {
//! let device = Device::new("DEVICE_ID", "DEVICE_KEY_16BYTE", "192.168.1.20")?;
//! if device.get().await? == PowerState::Off {
//!     device.set(true).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
#[macro_use]
mod macros;
pub mod codec;
pub mod color;
pub mod crypto;
pub mod device;
pub mod error;
pub mod protocol;
mod runtime;
pub mod sync;
pub mod transport;

pub use codec::{CommandEnvelope, Dps, PayloadCodec};
pub use color::rgb_to_hsv;
pub use device::{Bulb, Device, DeviceBuilder, DeviceKind, PowerState};
pub use error::TuyaError;
pub use protocol::CommandType;
pub use transport::{FrameTransport, TransportConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
