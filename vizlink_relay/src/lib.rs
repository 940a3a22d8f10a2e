// vizlink_relay — tick authority and join client for lockstep multiplayer.
//
// The hosting peer runs the tick authority (`server::start_host`) in the same
// process as its own session and joins it over loopback like any other peer.
// The authority never simulates anything; it only seats players, collects
// one input per player per tick and broadcasts the complete set, so every
// peer steps its own engine with identical inputs.
//
// Module overview:
// - `session.rs`: `HostSession`, lobby and lockstep bookkeeping, and the
//                 `Outbox` delivery seam (TCP or in-process channel).
// - `server.rs`:  TCP listener, reader threads and the event loop.
// - `client.rs`:  `NetClient`, the join side used by every peer.
// - `error.rs`:   `NetError`.

pub mod client;
pub mod error;
pub mod server;
pub mod session;

pub use client::{NetClient, WelcomeInfo};
pub use error::NetError;
pub use server::{HostConfig, HostHandle, start_host};
pub use session::{HOST_SEAT, HostSession, Outbox, TcpOutbox};
