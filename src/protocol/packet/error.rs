use thiserror::Error;

/// Errors that may occur while decoding RakNet protocol values or packets.
///
/// This type is kept small and generic so it can be shared by all
/// `RaknetEncodable` implementations and packet bodies. A datagram that
/// fails to decode is dropped; the session it belongs to carries on.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The buffer did not contain enough bytes to decode the requested value.
    #[error("Unexpected EoF, not enough bytes to read requested type.")]
    UnexpectedEof,

    /// The packet body decoded cleanly but bytes were left over.
    #[error("Packet 0x{id:02x} left {remaining} undecoded bytes.")]
    TrailingBytes { id: u8, remaining: usize },

    /// An offline packet did not carry the RakNet magic.
    #[error("Offline packet without the unconnected magic.")]
    InvalidMagic,

    /// An address encoding used an unsupported version field.
    #[error(
        "An invalid IpAddress version was encountered:\n\
        Provided: {0}, expected: 4."
    )]
    InvalidAddrVersion(u8),

    #[error("An unknown reliability value was provided. Reliability byte: {0}")]
    UnknownReliability(u8),

    /// A length-prefixed string was not valid UTF-8.
    #[error("String field is not valid UTF-8.")]
    InvalidString,

    /// The zlib stream of a batch could not be inflated.
    #[error("Failed to inflate batch payload: {0}")]
    Decompress(#[source] std::io::Error),

    /// The inflated batch exceeded the configured ceiling.
    #[error("Batch payload inflates past {limit} bytes.")]
    BatchTooLarge { limit: usize },
}
