pub mod data;
pub mod mgmt;

pub use data::{BlockAckFrame, QosDataFrame};
pub use mgmt::{AssocRequestBody, AssocResponseBody, BeaconBody, DisassocBody, MgmtHdr};

use mlo_core::{ByteBuffer, ElementParseErr, Mac48};

/// Frame type codes (first octet of every frame)
pub const FRAME_ASSOC_REQUEST: u8 = 0x00;
pub const FRAME_ASSOC_RESPONSE: u8 = 0x10;
pub const FRAME_BEACON: u8 = 0x80;
pub const FRAME_DISASSOC: u8 = 0xA0;
pub const FRAME_QOS_DATA: u8 = 0x88;
pub const FRAME_BLOCK_ACK: u8 = 0x94;

/// Flag bits (second octet)
pub const FLAG_TO_DS: u8 = 0x01;
pub const FLAG_FROM_DS: u8 = 0x02;
pub const FLAG_RETRY: u8 = 0x08;

/// Every frame kind exchanged between MLDs, as one tagged union. Receivers
/// match on the tag; there is no runtime type probing anywhere in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Beacon { hdr: MgmtHdr, body: BeaconBody },
    AssocRequest { hdr: MgmtHdr, body: AssocRequestBody },
    AssocResponse { hdr: MgmtHdr, body: AssocResponseBody },
    Disassoc { hdr: MgmtHdr, body: DisassocBody },
    QosData(QosDataFrame),
    BlockAck(BlockAckFrame),
}

impl Frame {
    /// Receiver address of the frame
    pub fn addr1(&self) -> Mac48 {
        match self {
            Frame::Beacon { hdr, .. }
            | Frame::AssocRequest { hdr, .. }
            | Frame::AssocResponse { hdr, .. }
            | Frame::Disassoc { hdr, .. } => hdr.addr1,
            Frame::QosData(f) => f.addr1,
            Frame::BlockAck(f) => f.addr1,
        }
    }

    /// Transmitter address of the frame
    pub fn addr2(&self) -> Mac48 {
        match self {
            Frame::Beacon { hdr, .. }
            | Frame::AssocRequest { hdr, .. }
            | Frame::AssocResponse { hdr, .. }
            | Frame::Disassoc { hdr, .. } => hdr.addr2,
            Frame::QosData(f) => f.addr2,
            Frame::BlockAck(f) => f.addr2,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Frame::Beacon { .. } => "Beacon",
            Frame::AssocRequest { .. } => "AssocRequest",
            Frame::AssocResponse { .. } => "AssocResponse",
            Frame::Disassoc { .. } => "Disassoc",
            Frame::QosData(_) => "QosData",
            Frame::BlockAck(_) => "BlockAck",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::new_autoexpand(64);
        match self {
            Frame::Beacon { hdr, body } => {
                hdr.to_bytebuf(&mut buf, FRAME_BEACON);
                body.to_bytebuf(&mut buf);
            }
            Frame::AssocRequest { hdr, body } => {
                hdr.to_bytebuf(&mut buf, FRAME_ASSOC_REQUEST);
                body.to_bytebuf(&mut buf);
            }
            Frame::AssocResponse { hdr, body } => {
                hdr.to_bytebuf(&mut buf, FRAME_ASSOC_RESPONSE);
                body.to_bytebuf(&mut buf);
            }
            Frame::Disassoc { hdr, body } => {
                hdr.to_bytebuf(&mut buf, FRAME_DISASSOC);
                body.to_bytebuf(&mut buf);
            }
            Frame::QosData(f) => f.to_bytebuf(&mut buf),
            Frame::BlockAck(f) => f.to_bytebuf(&mut buf),
        }
        buf.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Frame, ElementParseErr> {
        let mut buf = ByteBuffer::from_bytes(bytes);
        let frame_type = buf.read_field_u8("frame_type")?;
        match frame_type {
            FRAME_BEACON => {
                let hdr = MgmtHdr::from_bytebuf(&mut buf)?;
                let body = BeaconBody::from_bytebuf(&mut buf)?;
                Ok(Frame::Beacon { hdr, body })
            }
            FRAME_ASSOC_REQUEST => {
                let hdr = MgmtHdr::from_bytebuf(&mut buf)?;
                let body = AssocRequestBody::from_bytebuf(&mut buf)?;
                Ok(Frame::AssocRequest { hdr, body })
            }
            FRAME_ASSOC_RESPONSE => {
                let hdr = MgmtHdr::from_bytebuf(&mut buf)?;
                let body = AssocResponseBody::from_bytebuf(&mut buf)?;
                Ok(Frame::AssocResponse { hdr, body })
            }
            FRAME_DISASSOC => {
                let hdr = MgmtHdr::from_bytebuf(&mut buf)?;
                let body = DisassocBody::from_bytebuf(&mut buf)?;
                Ok(Frame::Disassoc { hdr, body })
            }
            FRAME_QOS_DATA => Ok(Frame::QosData(QosDataFrame::from_bytebuf(&mut buf)?)),
            FRAME_BLOCK_ACK => Ok(Frame::BlockAck(BlockAckFrame::from_bytebuf(&mut buf)?)),
            other => Err(ElementParseErr::InvalidFrameType { found: other }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_frame_type() {
        assert_eq!(
            Frame::from_bytes(&[0x42, 0, 0, 0]),
            Err(ElementParseErr::InvalidFrameType { found: 0x42 })
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(Frame::from_bytes(&[]).is_err());
    }
}
