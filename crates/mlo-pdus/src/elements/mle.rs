use mlo_core::{ByteBuffer, ElementParseErr, LinkId, Mac48};

/// Multi-Link Control field bits (2 bytes). Top 3 bits carry the element
/// type; only the Basic variant is defined here.
const MLE_TYPE_BASIC: u16 = 0;
const MLE_CTRL_MLD_MAC: u16 = 1 << 12;
const MLE_CTRL_LINK_ID: u16 = 1 << 11;

/// STA Control field bits of a Per-STA Profile subelement. The top 4 bits
/// carry the link ID the profile describes.
const STA_CTRL_STA_MAC: u16 = 1 << 11;
const STA_CTRL_ASSOC_REQ: u16 = 1 << 10;
const STA_CTRL_ASSOC_RESP: u16 = 1 << 9;

const SUBELEM_PER_STA_PROFILE: u8 = 0;

/// Frame body embedded in a Per-STA Profile, carried as raw octets.
/// A profile carries at most one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedFrame {
    AssocRequest(Vec<u8>),
    AssocResponse(Vec<u8>),
}

/// Per-STA Profile subelement: describes one additional link of the sending
/// MLD. A profile never describes the link the containing frame itself was
/// sent on; that link is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerStaProfile {
    /// Link the profile refers to, in the receiving peer's numbering
    pub link_id: LinkId,
    pub sta_mac: Option<Mac48>,
    pub embedded: Option<EmbeddedFrame>,
}

impl PerStaProfile {
    pub fn new(link_id: LinkId) -> Self {
        Self { link_id, sta_mac: None, embedded: None }
    }

    pub fn has_assoc_request(&self) -> bool {
        matches!(self.embedded, Some(EmbeddedFrame::AssocRequest(_)))
    }

    pub fn has_assoc_response(&self) -> bool {
        matches!(self.embedded, Some(EmbeddedFrame::AssocResponse(_)))
    }

    fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        let mut ctrl = (self.link_id as u16 & 0x0F) << 12;
        if self.sta_mac.is_some() {
            ctrl |= STA_CTRL_STA_MAC;
        }
        match &self.embedded {
            Some(EmbeddedFrame::AssocRequest(_)) => ctrl |= STA_CTRL_ASSOC_REQ,
            Some(EmbeddedFrame::AssocResponse(_)) => ctrl |= STA_CTRL_ASSOC_RESP,
            None => {}
        }
        buf.write_u16(ctrl);

        if let Some(mac) = &self.sta_mac {
            mac.to_bytebuf(buf);
        }
        if let Some(EmbeddedFrame::AssocRequest(body) | EmbeddedFrame::AssocResponse(body)) = &self.embedded {
            assert!(body.len() <= u16::MAX as usize, "embedded frame body too large");
            buf.write_u16(body.len() as u16);
            buf.write_bytes(body);
        }
    }

    fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let ctrl = buf.read_field_u16("sta_control")?;
        let link_id = ((ctrl >> 12) & 0x0F) as LinkId;

        if ctrl & STA_CTRL_ASSOC_REQ != 0 && ctrl & STA_CTRL_ASSOC_RESP != 0 {
            return Err(ElementParseErr::Inconsistency {
                field: "sta_control",
                reason: "profile carries both an assoc request and an assoc response",
            });
        }

        let sta_mac = if ctrl & STA_CTRL_STA_MAC != 0 {
            Some(Mac48::from_bytebuf(buf, "sta_mac")?)
        } else {
            None
        };

        let embedded = if ctrl & (STA_CTRL_ASSOC_REQ | STA_CTRL_ASSOC_RESP) != 0 {
            let body_len = buf.read_field_u16("embedded_len")? as usize;
            if body_len > buf.get_len_remaining() {
                return Err(ElementParseErr::InconsistentLength {
                    expected: body_len,
                    found: buf.get_len_remaining(),
                });
            }
            let body = buf.read_field_bytes(body_len, "embedded_body")?;
            if ctrl & STA_CTRL_ASSOC_REQ != 0 {
                Some(EmbeddedFrame::AssocRequest(body))
            } else {
                Some(EmbeddedFrame::AssocResponse(body))
            }
        } else {
            None
        };

        Ok(PerStaProfile { link_id, sta_mac, embedded })
    }
}

/// Basic Multi-Link element: common info about the sending MLD plus one
/// Per-STA Profile per additional link under negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiLinkElement {
    pub mld_mac_address: Option<Mac48>,
    /// Link ID of the link the containing frame was sent on, low 4 bits
    pub link_id_info: Option<LinkId>,
    pub profiles: Vec<PerStaProfile>,
}

impl MultiLinkElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        let mut ctrl = MLE_TYPE_BASIC << 13;
        if self.mld_mac_address.is_some() {
            ctrl |= MLE_CTRL_MLD_MAC;
        }
        if self.link_id_info.is_some() {
            ctrl |= MLE_CTRL_LINK_ID;
        }
        buf.write_u16(ctrl);

        if let Some(mac) = &self.mld_mac_address {
            mac.to_bytebuf(buf);
        }
        if let Some(link_id) = self.link_id_info {
            buf.write_u8(link_id & 0x0F);
        }

        for profile in &self.profiles {
            let mut sub = ByteBuffer::new_autoexpand(32);
            profile.to_bytebuf(&mut sub);
            let payload = sub.into_bytes();
            assert!(payload.len() <= 255, "Per-STA Profile subelement too large");
            buf.write_u8(SUBELEM_PER_STA_PROFILE);
            buf.write_u8(payload.len() as u8);
            buf.write_bytes(&payload);
        }
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let ctrl = buf.read_field_u16("ml_control")?;
        let mle_type = ctrl >> 13;
        if mle_type != MLE_TYPE_BASIC {
            return Err(ElementParseErr::InvalidValue { field: "ml_control_type", value: mle_type as u64 });
        }

        let mld_mac_address = if ctrl & MLE_CTRL_MLD_MAC != 0 {
            Some(Mac48::from_bytebuf(buf, "mld_mac_address")?)
        } else {
            None
        };
        let link_id_info = if ctrl & MLE_CTRL_LINK_ID != 0 {
            Some(buf.read_field_u8("link_id_info")? & 0x0F)
        } else {
            None
        };

        let mut profiles = Vec::new();
        while buf.get_len_remaining() > 0 {
            let sub_id = buf.read_field_u8("subelem_id")?;
            let sub_len = buf.read_field_u8("subelem_len")? as usize;
            if sub_len > buf.get_len_remaining() {
                return Err(ElementParseErr::InconsistentLength {
                    expected: sub_len,
                    found: buf.get_len_remaining(),
                });
            }
            let payload = buf.read_field_bytes(sub_len, "subelem_payload")?;
            if sub_id != SUBELEM_PER_STA_PROFILE {
                // Unknown subelements are length-delimited and skippable
                tracing::trace!("skipping unknown ML subelement id {}", sub_id);
                continue;
            }
            let mut sub = ByteBuffer::from_vec(payload);
            profiles.push(PerStaProfile::from_bytebuf(&mut sub)?);
        }

        Ok(MultiLinkElement { mld_mac_address, link_id_info, profiles })
    }
}
