use mlo_core::{ByteBuffer, ElementParseErr, Mac48, Tid, SEQ_MODULUS};

use crate::elements::AckBitmap;
use crate::frames::{FLAG_FROM_DS, FLAG_RETRY, FLAG_TO_DS, FRAME_BLOCK_ACK, FRAME_QOS_DATA};

/// QoS data frame. Carries exactly one traffic unit; the sequence number is
/// assigned once per unit, regardless of how many links replicate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosDataFrame {
    /// Receiver address: peer's address on the link the copy is sent on
    pub addr1: Mac48,
    /// Transmitter address: sender's address on that link
    pub addr2: Mac48,
    /// ToDS: final destination MLD address. FromDS: source MLD address.
    pub addr3: Mac48,
    pub to_ds: bool,
    pub from_ds: bool,
    /// Set on every transmission attempt after the first
    pub retry: bool,
    /// 12 bits, from the flow's sequence space
    pub seq_no: u16,
    /// Traffic class, low 4 bits
    pub tid: Tid,
    pub payload: Vec<u8>,
}

impl QosDataFrame {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        assert!(self.seq_no < SEQ_MODULUS, "sequence number exceeds 12 bits");
        buf.write_u8(FRAME_QOS_DATA);
        let mut flags = 0u8;
        if self.to_ds {
            flags |= FLAG_TO_DS;
        }
        if self.from_ds {
            flags |= FLAG_FROM_DS;
        }
        if self.retry {
            flags |= FLAG_RETRY;
        }
        buf.write_u8(flags);
        self.addr1.to_bytebuf(buf);
        self.addr2.to_bytebuf(buf);
        self.addr3.to_bytebuf(buf);
        // Sequence control: sequence number in the high 12 bits
        buf.write_u16(self.seq_no << 4);
        // QoS control: TID in the low 4 bits
        buf.write_u16(self.tid as u16 & 0x0F);
        buf.write_bytes(&self.payload);
    }

    /// Parse after the frame type octet has been consumed.
    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let flags = buf.read_field_u8("flags")?;
        let addr1 = Mac48::from_bytebuf(buf, "addr1")?;
        let addr2 = Mac48::from_bytebuf(buf, "addr2")?;
        let addr3 = Mac48::from_bytebuf(buf, "addr3")?;
        let seq_ctrl = buf.read_field_u16("seq_ctrl")?;
        let qos_ctrl = buf.read_field_u16("qos_ctrl")?;
        let payload = buf.read_field_bytes(buf.get_len_remaining(), "payload")?;
        Ok(QosDataFrame {
            addr1,
            addr2,
            addr3,
            to_ds: flags & FLAG_TO_DS != 0,
            from_ds: flags & FLAG_FROM_DS != 0,
            retry: flags & FLAG_RETRY != 0,
            seq_no: seq_ctrl >> 4,
            tid: (qos_ctrl & 0x0F) as Tid,
            payload,
        })
    }
}

/// Block-Ack control frame: reports per-sequence-number receipt for one
/// traffic class back to the transmitter of the data frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAckFrame {
    /// Originator's address on the link the acknowledgment is sent on
    pub addr1: Mac48,
    /// Recipient's address on that link
    pub addr2: Mac48,
    pub tid: Tid,
    pub bitmap: AckBitmap,
}

impl BlockAckFrame {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        buf.write_u8(FRAME_BLOCK_ACK);
        buf.write_u8(0);
        self.addr1.to_bytebuf(buf);
        self.addr2.to_bytebuf(buf);
        // BA control: TID in the low 4 bits
        buf.write_u16(self.tid as u16 & 0x0F);
        self.bitmap.to_bytebuf(buf);
    }

    /// Parse after the frame type octet has been consumed.
    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let flags = buf.read_field_u8("flags")?;
        mlo_core::expect_value!(flags, 0, "ba_flags")?;
        let addr1 = Mac48::from_bytebuf(buf, "addr1")?;
        let addr2 = Mac48::from_bytebuf(buf, "addr2")?;
        let ba_ctrl = buf.read_field_u16("ba_ctrl")?;
        let bitmap = AckBitmap::from_bytebuf(buf)?;
        Ok(BlockAckFrame { addr1, addr2, tid: (ba_ctrl & 0x0F) as Tid, bitmap })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::Frame;

    #[test]
    fn test_qos_data_roundtrip() {
        let frame = Frame::QosData(QosDataFrame {
            addr1: Mac48([2, 0xC0, 0, 1, 0, 0x21]),
            addr2: Mac48([2, 0xC0, 0, 0, 0, 0x11]),
            addr3: Mac48([0, 0xC0, 0, 1, 0, 0x20]),
            to_ds: true,
            from_ds: false,
            retry: true,
            seq_no: 0x0ABC,
            tid: 5,
            payload: vec![1, 2, 3, 4],
        });
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_block_ack_roundtrip() {
        let mut bitmap = AckBitmap::new(100);
        bitmap.set_received(100);
        bitmap.set_received(102);
        let frame = Frame::BlockAck(BlockAckFrame {
            addr1: Mac48([2, 0xC0, 0, 0, 0, 0x11]),
            addr2: Mac48([2, 0xC0, 0, 1, 0, 0x21]),
            tid: 0,
            bitmap,
        });
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_truncated_block_ack_fails() {
        let frame = Frame::BlockAck(BlockAckFrame {
            addr1: Mac48([0; 6]),
            addr2: Mac48([0; 6]),
            tid: 0,
            bitmap: AckBitmap::new(0),
        });
        let mut bytes = frame.to_bytes();
        bytes.pop();
        assert!(Frame::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_empty_payload_allowed() {
        let frame = Frame::QosData(QosDataFrame {
            addr1: Mac48([0; 6]),
            addr2: Mac48([1, 0, 0, 0, 0, 0]),
            addr3: Mac48([0; 6]),
            to_ds: false,
            from_ds: true,
            retry: false,
            seq_no: 0,
            tid: 0,
            payload: vec![],
        });
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }
}
