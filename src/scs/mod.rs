pub mod frame;
pub mod mock;
pub mod protocol;
pub mod serial;
pub mod serial_mock;
pub mod transport;

pub use protocol::{ScsProtocol, TransactionStats};
pub use serial::{ProbeType, ScsDeviceHandle, SecurityCode, SerialConfig};
pub use transport::{ProtocolResponse, Reconnect, ScsCommand, ScsTransport};
