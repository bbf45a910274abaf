//! WebKit remote inspector client
//!
//! Drives one remote page over the inspector's target-multiplexed
//! socket: bootstrap-page discovery, a single owned WebSocket,
//! id-exact correlation across the outer and inner envelope levels,
//! and a fire-and-poll bridge onto the application's async command
//! surface.
//!
//! Layering, leaf to root: discovery -> transport -> session -> bridge.

pub mod bridge;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use bridge::CallState;
pub use discovery::{DiscoveryConfig, Endpoint};
pub use error::{InspectorError, Result};
pub use session::{InspectorSession, SessionConfig};
pub use transport::Transport;
