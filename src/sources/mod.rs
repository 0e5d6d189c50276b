//! Datagram source implementations.

pub mod scripted;
pub mod udp;

pub use scripted::ScriptedSource;
pub use udp::UdpSource;
