pub mod facebook;
pub mod gate;
pub mod nextdoor;
pub mod traits;

pub use facebook::FacebookConnector;
pub use gate::{BrowserGate, GateError};
pub use nextdoor::NextdoorConnector;
pub use traits::{ConnectorFactory, GateConnectorFactory, SourceConnector};
