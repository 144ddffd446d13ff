//! Side-assigning WebSocket relay for the Splitboard shared canvas.
//!
//! Each participant that connects to `/ws` is given a half of the board
//! (`left` or `right`) and from then on every draw, clear, and message event
//! it sends is forwarded verbatim to all other participants. The relay keeps
//! no drawing history; state lives only as long as the connections do.

pub mod connection;
pub mod hub;
pub mod registry;
pub mod relay;
pub mod server;
pub mod state;

pub use hub::{Hub, HubHandle, HubStats};
pub use registry::{side_for_size, SessionRegistry};
pub use server::{build_router, start_gateway};
pub use state::GatewayState;
