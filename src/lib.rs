//! # scs-rs - A Rust Crate for SCS Legacy Electricity Meter Communication
//!
//! The scs-rs crate implements the SCS upload/download protocol spoken by the
//! MT200, CENTRON, FULCRUM and VECTRON meter families over an optical probe or
//! direct serial link.
//!
//! ## Features
//!
//! - Log on to a meter over a serial port and read or write its basepage
//! - Decode the BCD, floating BCD and byte-reversed float registers meters use
//! - Read the programmed display lists and show values the way the meter does
//! - Read and rewrite the TOU calendar, seasons and switchpoints
//! - Adjust the meter clock without corrupting load profile data
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! scs-rs = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use scs_rs::{MeterModel, ScsDevice, ScsDeviceHandle, SecurityCode, SerialConfig};
//!
//! # async fn run() -> Result<(), scs_rs::ScsError> {
//! let mut handle = ScsDeviceHandle::open("/dev/ttyUSB0", SerialConfig::default()).await?;
//! handle.log_on(&SecurityCode::parse("0000")?).await?;
//! let mut device = ScsDevice::new(handle, MeterModel::Centron);
//! println!("{}", device.read_clock().await?);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod device;
pub mod display;
pub mod error;
pub mod logging;
pub mod payload;
pub mod scs;
pub mod tou;
pub mod util;
pub mod vendors;

pub use crate::error::{ErrorKind, ScsError};
pub use crate::logging::{init_logger, log_info};

// Transaction layer and transports
pub use scs::mock::MockTransport;
pub use scs::{
    ProbeType, ProtocolResponse, Reconnect, ScsCommand, ScsDeviceHandle, ScsProtocol,
    ScsTransport, SecurityCode, SerialConfig,
};

// Device engine
pub use device::{
    QuantityReading, ReconfigureResult, ReconfigureState, ScsDevice, SessionCache, SessionConfig,
};

// Display items
pub use display::{DisplayFormat, DisplayFormats, DisplayItem, DisplayLists, DisplayValue, RegisterClass, TouRate};

// TOU calendar
pub use tou::{Season, Switchpoint, TouEvent, TouEventCollection, TouInfo, TouSchedule};

// Meter families
pub use vendors::{
    DisplayTranslator, MeterAddressMap, MeterModel, Quantity, RegisterFormat, ScsMeter,
};
