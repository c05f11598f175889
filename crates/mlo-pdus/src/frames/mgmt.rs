use mlo_core::{ByteBuffer, ElementParseErr, Mac48};

use crate::elements::{
    MultiLinkElement, ReducedNeighborReport, ELEM_EXTENSION, ELEM_EXT_MULTI_LINK, ELEM_RNR, ELEM_SSID,
};

/// Header shared by all management frames. The flags octet of management
/// frames is always zero; direction follows from the addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgmtHdr {
    /// Receiver address
    pub addr1: Mac48,
    /// Transmitter address: always the per-link address of the link the
    /// frame is sent on, never the MLD address
    pub addr2: Mac48,
    /// BSSID of the link the exchange takes place on
    pub addr3: Mac48,
}

impl MgmtHdr {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer, frame_type: u8) {
        buf.write_u8(frame_type);
        buf.write_u8(0);
        self.addr1.to_bytebuf(buf);
        self.addr2.to_bytebuf(buf);
        self.addr3.to_bytebuf(buf);
    }

    /// Parse the header after the frame type octet has been consumed.
    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let flags = buf.read_field_u8("flags")?;
        mlo_core::expect_value!(flags, 0, "mgmt_flags")?;
        Ok(MgmtHdr {
            addr1: Mac48::from_bytebuf(buf, "addr1")?,
            addr2: Mac48::from_bytebuf(buf, "addr2")?,
            addr3: Mac48::from_bytebuf(buf, "addr3")?,
        })
    }
}

fn write_element(buf: &mut ByteBuffer, id: u8, payload: &[u8]) {
    assert!(payload.len() <= 255, "element payload too large");
    buf.write_u8(id);
    buf.write_u8(payload.len() as u8);
    buf.write_bytes(payload);
}

fn write_ssid(buf: &mut ByteBuffer, ssid: &str) {
    write_element(buf, ELEM_SSID, ssid.as_bytes());
}

fn write_rnr(buf: &mut ByteBuffer, rnr: &ReducedNeighborReport) {
    let mut sub = ByteBuffer::new_autoexpand(64);
    rnr.to_bytebuf(&mut sub);
    write_element(buf, ELEM_RNR, &sub.into_bytes());
}

fn write_mle(buf: &mut ByteBuffer, mle: &MultiLinkElement) {
    let mut sub = ByteBuffer::new_autoexpand(64);
    sub.write_u8(ELEM_EXT_MULTI_LINK);
    mle.to_bytebuf(&mut sub);
    write_element(buf, ELEM_EXTENSION, &sub.into_bytes());
}

/// Elements common to the management frame bodies. Unknown element IDs are
/// length-delimited and skipped.
#[derive(Default)]
struct ParsedElements {
    ssid: Option<String>,
    rnr: Option<ReducedNeighborReport>,
    mle: Option<MultiLinkElement>,
}

fn parse_elements(buf: &mut ByteBuffer) -> Result<ParsedElements, ElementParseErr> {
    let mut out = ParsedElements::default();
    while buf.get_len_remaining() > 0 {
        let id = buf.read_field_u8("elem_id")?;
        let len = buf.read_field_u8("elem_len")? as usize;
        if len > buf.get_len_remaining() {
            return Err(ElementParseErr::InconsistentLength { expected: len, found: buf.get_len_remaining() });
        }
        let payload = buf.read_field_bytes(len, "elem_payload")?;
        match id {
            ELEM_SSID => {
                out.ssid = Some(String::from_utf8_lossy(&payload).into_owned());
            }
            ELEM_RNR => {
                let mut sub = ByteBuffer::from_vec(payload);
                out.rnr = Some(ReducedNeighborReport::from_bytebuf(&mut sub)?);
            }
            ELEM_EXTENSION => {
                let mut sub = ByteBuffer::from_vec(payload);
                let ext_id = sub.read_field_u8("elem_ext_id")?;
                if ext_id == ELEM_EXT_MULTI_LINK {
                    out.mle = Some(MultiLinkElement::from_bytebuf(&mut sub)?);
                } else {
                    tracing::trace!("skipping unknown extension element {}", ext_id);
                }
            }
            other => {
                tracing::trace!("skipping unknown element {}", other);
            }
        }
    }
    Ok(out)
}

fn require_ssid(elems: &mut ParsedElements) -> Result<String, ElementParseErr> {
    elems
        .ssid
        .take()
        .ok_or(ElementParseErr::Inconsistency { field: "ssid", reason: "missing SSID element" })
}

/// Beacon frame body. A single-link AP includes neither the neighbor report
/// nor the Multi-Link element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconBody {
    pub ssid: String,
    pub rnr: Option<ReducedNeighborReport>,
    pub mle: Option<MultiLinkElement>,
}

impl BeaconBody {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        write_ssid(buf, &self.ssid);
        if let Some(rnr) = &self.rnr {
            write_rnr(buf, rnr);
        }
        if let Some(mle) = &self.mle {
            write_mle(buf, mle);
        }
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let mut elems = parse_elements(buf)?;
        Ok(BeaconBody { ssid: require_ssid(&mut elems)?, rnr: elems.rnr, mle: elems.mle })
    }
}

/// Association request body. The Multi-Link element is present when, and only
/// when, both peers are multi-link capable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocRequestBody {
    pub ssid: String,
    pub mle: Option<MultiLinkElement>,
}

impl AssocRequestBody {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        write_ssid(buf, &self.ssid);
        if let Some(mle) = &self.mle {
            write_mle(buf, mle);
        }
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let mut elems = parse_elements(buf)?;
        Ok(AssocRequestBody { ssid: require_ssid(&mut elems)?, mle: elems.mle })
    }

    /// Raw octets of the body, as embedded in a Per-STA Profile.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::new_autoexpand(48);
        self.to_bytebuf(&mut buf);
        buf.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ElementParseErr> {
        Self::from_bytebuf(&mut ByteBuffer::from_bytes(bytes))
    }
}

pub const STATUS_SUCCESS: u16 = 0;
pub const STATUS_REFUSED: u16 = 1;

/// Association response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocResponseBody {
    pub status_code: u16,
    /// Association ID assigned by the AP, 0 on refusal
    pub aid: u16,
    pub mle: Option<MultiLinkElement>,
}

impl AssocResponseBody {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        buf.write_u16(self.status_code);
        buf.write_u16(self.aid);
        if let Some(mle) = &self.mle {
            write_mle(buf, mle);
        }
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let status_code = buf.read_field_u16("status_code")?;
        let aid = buf.read_field_u16("aid")?;
        let elems = parse_elements(buf)?;
        Ok(AssocResponseBody { status_code, aid, mle: elems.mle })
    }

    /// Raw octets of the body, as embedded in a Per-STA Profile.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::new_autoexpand(16);
        self.to_bytebuf(&mut buf);
        buf.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ElementParseErr> {
        Self::from_bytebuf(&mut ByteBuffer::from_bytes(bytes))
    }
}

/// Disassociation frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassocBody {
    pub reason_code: u16,
}

impl DisassocBody {
    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        buf.write_u16(self.reason_code);
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        Ok(DisassocBody { reason_code: buf.read_field_u16("reason_code")? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{MldParameters, NeighborApInfo, TbttInfo};
    use crate::frames::Frame;

    fn sample_hdr() -> MgmtHdr {
        MgmtHdr {
            addr1: Mac48([2, 0xC0, 0, 1, 0, 0x21]),
            addr2: Mac48([2, 0xC0, 0, 0, 0, 0x11]),
            addr3: Mac48([2, 0xC0, 0, 1, 0, 0x21]),
        }
    }

    #[test]
    fn test_beacon_roundtrip() {
        let frame = Frame::Beacon {
            hdr: sample_hdr(),
            body: BeaconBody {
                ssid: "mlo-net".to_string(),
                rnr: Some(ReducedNeighborReport {
                    nbr_ap_infos: vec![NeighborApInfo {
                        op_class: 131,
                        channel: 1,
                        tbtts: vec![TbttInfo {
                            tbtt_offset: 0,
                            bssid: Mac48([2, 0xC0, 0, 1, 0, 0x22]),
                            mld_params: Some(MldParameters {
                                ap_mld_id: 0,
                                link_id: 1,
                                bss_params_change_count: 0,
                            }),
                        }],
                    }],
                }),
                mle: Some(MultiLinkElement {
                    mld_mac_address: Some(Mac48([0, 0xC0, 0, 1, 0, 0x20])),
                    link_id_info: Some(0),
                    profiles: vec![],
                }),
            },
        };
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_assoc_request_roundtrip() {
        let frame = Frame::AssocRequest {
            hdr: sample_hdr(),
            body: AssocRequestBody { ssid: "mlo-net".to_string(), mle: None },
        };
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_assoc_response_roundtrip() {
        let frame = Frame::AssocResponse {
            hdr: sample_hdr(),
            body: AssocResponseBody { status_code: STATUS_SUCCESS, aid: 1, mle: None },
        };
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_disassoc_roundtrip() {
        let frame = Frame::Disassoc { hdr: sample_hdr(), body: DisassocBody { reason_code: 3 } };
        assert_eq!(Frame::from_bytes(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_missing_ssid_rejected() {
        let mut buf = ByteBuffer::new_autoexpand(32);
        sample_hdr().to_bytebuf(&mut buf, crate::frames::FRAME_BEACON);
        // body without any elements
        assert!(matches!(
            Frame::from_bytes(&buf.into_bytes()),
            Err(ElementParseErr::Inconsistency { field: "ssid", .. })
        ));
    }

    #[test]
    fn test_truncated_beacon_fails() {
        let frame = Frame::Beacon {
            hdr: sample_hdr(),
            body: BeaconBody { ssid: "x".to_string(), rnr: None, mle: None },
        };
        let mut bytes = frame.to_bytes();
        bytes.pop();
        assert!(Frame::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_embedded_body_roundtrip() {
        let body = AssocRequestBody { ssid: "mlo-net".to_string(), mle: None };
        assert_eq!(AssocRequestBody::from_bytes(&body.to_bytes()).unwrap(), body);
        let resp = AssocResponseBody { status_code: STATUS_SUCCESS, aid: 2, mle: None };
        assert_eq!(AssocResponseBody::from_bytes(&resp.to_bytes()).unwrap(), resp);
    }
}
