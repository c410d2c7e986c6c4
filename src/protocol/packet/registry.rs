/// INTERNAL
/// Generates a packet-family enum with its decode/encode entry points.
///
/// Every listed type contributes one variant keyed by its `Packet::ID`; an
/// optional ranged variant claims a whole id range; any other id decodes
/// into `Raw`. Duplicate ids fail const evaluation, so a bad registry never
/// builds.
macro_rules! define_packets {
    (
        $(#[$meta:meta])*
        $vis:vis enum $enum_name:ident {
            $( $name:ident, )+
            $( @ranged $rname:ident($rty:ty) in $range:expr, )?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $enum_name {
            $(
                $name($name),
            )+
            $(
                $rname($rty),
            )?
            /// An id this family has no packet type for; the payload is
            /// kept undissected.
            Raw { id: u8, payload: bytes::Bytes },
        }

        const _: () = {
            let ids = [$( <$name as Packet>::ID, )+];
            let mut i = 0;
            while i < ids.len() {
                let mut j = i + 1;
                while j < ids.len() {
                    assert!(
                        ids[i] != ids[j],
                        concat!("duplicate packet id in ", stringify!($enum_name))
                    );
                    j += 1;
                }
                $(
                    assert!(
                        ids[i] < *$range.start() || ids[i] > *$range.end(),
                        concat!("packet id overlaps the ranged variant of ", stringify!($enum_name))
                    );
                )?
                i += 1;
            }
        };

        impl $enum_name {
            /// Decodes a whole datagram/payload. The body must consume every
            /// byte; leftovers are a [`DecodeError::TrailingBytes`].
            pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
                let mut src = ByteCursor::from(buf);
                let id = src.next_byte()?;
                let packet = match id {
                    $(
                        <$name as Packet>::ID => {
                            $enum_name::$name(<$name as Packet>::decode_body(&mut src)?)
                        }
                    )+
                    $(
                        other if $range.contains(&other) => {
                            $enum_name::$rname(<$rty>::decode_body(other, &mut src)?)
                        }
                    )?
                    other => $enum_name::Raw { id: other, payload: src.next_remaining() },
                };
                if src.has_next() {
                    return Err(DecodeError::TrailingBytes {
                        id,
                        remaining: src.remaining(),
                    });
                }
                Ok(packet)
            }

            pub fn id(&self) -> u8 {
                match self {
                    $(
                        $enum_name::$name(_inner) => <$name as Packet>::ID,
                    )+
                    $(
                        $enum_name::$rname(inner) => {
                            let inner: &$rty = inner;
                            inner.id
                        }
                    )?
                    $enum_name::Raw { id, .. } => *id,
                }
            }

            pub fn encode(&self, dst: &mut ByteCursor) {
                dst.put_byte(self.id());
                match self {
                    $(
                        $enum_name::$name(inner) => inner.encode_body(dst),
                    )+
                    $(
                        $enum_name::$rname(inner) => {
                            let inner: &$rty = inner;
                            inner.encode_body(dst)
                        }
                    )?
                    $enum_name::Raw { payload, .. } => dst.put(payload),
                }
            }

            pub fn to_bytes(&self) -> bytes::Bytes {
                let mut dst = ByteCursor::new();
                self.encode(&mut dst);
                dst.into_bytes()
            }
        }

        $(
            impl From<$name> for $enum_name {
                fn from(packet: $name) -> Self {
                    $enum_name::$name(packet)
                }
            }
        )+
    }
}
pub(crate) use define_packets;
