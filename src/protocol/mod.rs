//! Device control protocol: JSON over UDP, one request per socket.

mod client;
mod message;

pub use client::{WizClient, DEFAULT_TIMEOUT};
pub use message::{Method, Pilot, PilotParams, Request, Response, RpcError, WIZ_PORT};
