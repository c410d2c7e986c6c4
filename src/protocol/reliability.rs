use crate::protocol::packet::DecodeError;

/// Delivery guarantee of an encapsulated packet.
///
/// UNRELIABLE packets may be lost, RELIABLE ones are acknowledged and
/// retransmitted on NACK. ORDERED and SEQUENCED packets carry a per-channel
/// order index; SEQUENCED packets may be dropped once superseded. The
/// WITH_ACK_RECEIPT variants are accepted on the wire but receipts are not
/// supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reliability {
    Unreliable = 0,
    UnreliableSequenced = 1,
    Reliable = 2,
    ReliableOrdered = 3,
    ReliableSequenced = 4,
    UnreliableWithAckReceipt = 5,
    UnreliableSequencedWithAckReceipt = 6,
    ReliableWithAckReceipt = 7,
    ReliableOrderedWithAckReceipt = 8,
    ReliableSequencedWithAckReceipt = 9,
}

impl Reliability {
    /// Reliable packets carry a message index and are retransmitted.
    pub fn is_reliable(self) -> bool {
        matches!(
            self,
            Reliability::Reliable
                | Reliability::ReliableOrdered
                | Reliability::ReliableSequenced
                | Reliability::ReliableWithAckReceipt
                | Reliability::ReliableOrderedWithAckReceipt
                | Reliability::ReliableSequencedWithAckReceipt
        )
    }

    /// Ordered and sequenced packets carry an order index and channel.
    pub fn is_ordered(self) -> bool {
        !matches!(
            self,
            Reliability::Unreliable
                | Reliability::Reliable
                | Reliability::UnreliableWithAckReceipt
                | Reliability::ReliableWithAckReceipt
        )
    }

    /// The same guarantee without an ack receipt.
    pub fn without_ack_receipt(self) -> Reliability {
        match self {
            Reliability::UnreliableWithAckReceipt => Reliability::Unreliable,
            Reliability::UnreliableSequencedWithAckReceipt => Reliability::UnreliableSequenced,
            Reliability::ReliableWithAckReceipt => Reliability::Reliable,
            Reliability::ReliableOrderedWithAckReceipt => Reliability::ReliableOrdered,
            Reliability::ReliableSequencedWithAckReceipt => Reliability::ReliableSequenced,
            other => other,
        }
    }
}

impl TryFrom<u8> for Reliability {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Reliability::Unreliable,
            1 => Reliability::UnreliableSequenced,
            2 => Reliability::Reliable,
            3 => Reliability::ReliableOrdered,
            4 => Reliability::ReliableSequenced,
            5 => Reliability::UnreliableWithAckReceipt,
            6 => Reliability::UnreliableSequencedWithAckReceipt,
            7 => Reliability::ReliableWithAckReceipt,
            8 => Reliability::ReliableOrderedWithAckReceipt,
            9 => Reliability::ReliableSequencedWithAckReceipt,
            _ => return Err(DecodeError::UnknownReliability(value)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reliable_modes() {
        let reliable: Vec<u8> = (0..10)
            .filter(|&v| Reliability::try_from(v).unwrap().is_reliable())
            .collect();
        assert_eq!(reliable, vec![2, 3, 4, 7, 8, 9]);
    }

    #[test]
    fn ordered_modes() {
        let ordered: Vec<u8> = (0..10)
            .filter(|&v| Reliability::try_from(v).unwrap().is_ordered())
            .collect();
        assert_eq!(ordered, vec![1, 3, 4, 6, 8, 9]);
    }

    #[test]
    fn unknown_value_is_rejected() {
        assert!(matches!(
            Reliability::try_from(10),
            Err(DecodeError::UnknownReliability(10))
        ));
    }

    #[test]
    fn ack_receipt_is_stripped() {
        assert_eq!(
            Reliability::ReliableOrderedWithAckReceipt.without_ack_receipt(),
            Reliability::ReliableOrdered
        );
        assert_eq!(
            Reliability::Reliable.without_ack_receipt(),
            Reliability::Reliable
        );
    }
}
