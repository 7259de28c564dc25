//! framecast - streams computed animation frames over WebSocket.
//!
//! Clients connect and receive batches of frames computed on the server,
//! asking for more as they consume them. Each frame is a point on a circle
//! sampled at a fixed frame rate.
//!
//! # Architecture
//!
//! Every connection gets its own pipeline:
//!
//! - **Reader** - decodes client requests onto the request queue
//! - **Generator** - owns the frame index, turns requests into batches
//! - **Coordinator** - seeds the first request and writes batches out
//! - **Server** - accepts connections and routes them by path
//!
//! A second, time-boxed mode pushes one payload per tick for a fixed
//! lifetime instead of waiting for requests.
//!
//! # Modules
//!
//! - [`frame`] - frame math and batch serialisation
//! - [`request`] - control message decoding
//! - [`session`] - per-connection coordinator
//! - [`server`] - accept loop and routing
//! - [`client`] - watch client
//! - [`config`] - configuration loading

pub mod client;
pub mod config;
pub mod constants;
pub mod frame;
pub mod generator;
pub mod reader;
pub mod request;
pub mod server;
pub mod session;
pub mod transport;
pub mod ws;

// Re-export commonly used types
pub use client::{watch, WatchOptions, WatchSummary};
pub use config::Config;
pub use frame::{Coordinate, Frame, FrameBatch, Orbit};
pub use server::Server;
pub use session::{Coordinator, Mode, SessionEnd, SessionSummary};
