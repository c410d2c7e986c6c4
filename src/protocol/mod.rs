//! RakNet protocol primitives, packet definitions, and the receive-side
//! reliability windows.
//!
//! This module houses constants, the byte cursor, packet codecs for both
//! protocol families, encapsulation and the dispatch traits used by the
//! higher-level session and transport layers.

pub mod constants;
pub mod cursor;
pub mod datagram;
pub mod dispatch;
pub mod encapsulated_packet;
pub mod packet;
pub mod reliability;
pub mod types;
pub mod window;
