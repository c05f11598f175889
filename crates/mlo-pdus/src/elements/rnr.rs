use mlo_core::{ByteBuffer, ElementParseErr, Mac48};

/// MLD Parameters subfield of a TBTT Information field, 3 bytes on the wire.
/// An AP MLD ID of 0 marks the reported AP as affiliated with the same AP MLD
/// as the AP that transmitted the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MldParameters {
    pub ap_mld_id: u8,
    /// Low 4 bits significant
    pub link_id: u8,
    pub bss_params_change_count: u8,
}

/// One reported neighbor AP within a channel group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbttInfo {
    pub tbtt_offset: u8,
    pub bssid: Mac48,
    pub mld_params: Option<MldParameters>,
}

/// Neighbor AP Information field: one channel group (operating class +
/// channel number) with its ordered TBTT Information fields. All TBTT fields
/// of one group share the same length, so MLD Parameters are either present
/// on every entry of the group or on none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborApInfo {
    pub op_class: u8,
    pub channel: u8,
    pub tbtts: Vec<TbttInfo>,
}

/// TBTT Information field length without / with the MLD Parameters subfield
const TBTT_LEN_BASE: u8 = 7;
const TBTT_LEN_MLD: u8 = 10;

impl NeighborApInfo {
    fn tbtt_len(&self) -> u8 {
        if self.tbtts[0].mld_params.is_some() { TBTT_LEN_MLD } else { TBTT_LEN_BASE }
    }

    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        assert!(!self.tbtts.is_empty(), "Neighbor AP Info must carry at least one TBTT field");
        assert!(self.tbtts.len() <= 16, "at most 16 TBTT fields per Neighbor AP Info");
        let with_mld = self.tbtts[0].mld_params.is_some();
        assert!(
            self.tbtts.iter().all(|t| t.mld_params.is_some() == with_mld),
            "all TBTT fields of one group must have the same length"
        );

        // TBTT Information header: field type 0, count-1 in the low 4 bits
        buf.write_u8((self.tbtts.len() - 1) as u8);
        buf.write_u8(self.tbtt_len());
        buf.write_u8(self.op_class);
        buf.write_u8(self.channel);

        for tbtt in &self.tbtts {
            buf.write_u8(tbtt.tbtt_offset);
            tbtt.bssid.to_bytebuf(buf);
            if let Some(mld) = &tbtt.mld_params {
                buf.write_u8(mld.ap_mld_id);
                buf.write_u8(mld.link_id & 0x0F);
                buf.write_u8(mld.bss_params_change_count);
            }
        }
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let hdr = buf.read_field_u8("tbtt_hdr")?;
        if hdr & 0xF0 != 0 {
            return Err(ElementParseErr::InvalidValue { field: "tbtt_hdr", value: hdr as u64 });
        }
        let count = (hdr & 0x0F) as usize + 1;
        let tbtt_len = buf.read_field_u8("tbtt_len")?;
        if tbtt_len != TBTT_LEN_BASE && tbtt_len != TBTT_LEN_MLD {
            return Err(ElementParseErr::InvalidValue { field: "tbtt_len", value: tbtt_len as u64 });
        }
        let op_class = buf.read_field_u8("op_class")?;
        let channel = buf.read_field_u8("channel")?;

        // Never allocate based on a length exceeding the input buffer
        if count * tbtt_len as usize > buf.get_len_remaining() {
            return Err(ElementParseErr::InconsistentLength {
                expected: count * tbtt_len as usize,
                found: buf.get_len_remaining(),
            });
        }

        let mut tbtts = Vec::with_capacity(count);
        for _ in 0..count {
            let tbtt_offset = buf.read_field_u8("tbtt_offset")?;
            let bssid = Mac48::from_bytebuf(buf, "bssid")?;
            let mld_params = if tbtt_len == TBTT_LEN_MLD {
                Some(MldParameters {
                    ap_mld_id: buf.read_field_u8("ap_mld_id")?,
                    link_id: buf.read_field_u8("link_id")? & 0x0F,
                    bss_params_change_count: buf.read_field_u8("bss_params_change_count")?,
                })
            } else {
                None
            };
            tbtts.push(TbttInfo { tbtt_offset, bssid, mld_params });
        }

        Ok(NeighborApInfo { op_class, channel, tbtts })
    }
}

/// Reduced Neighbor Report element contents. Insertion order of the Neighbor
/// AP Information fields is significant: it encodes the per-channel grouping
/// of the reported APs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReducedNeighborReport {
    pub nbr_ap_infos: Vec<NeighborApInfo>,
}

impl ReducedNeighborReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        for nbr in &self.nbr_ap_infos {
            nbr.to_bytebuf(buf);
        }
    }

    /// Parse Neighbor AP Information fields until the buffer is exhausted.
    pub fn from_bytebuf(buf: &mut ByteBuffer) -> Result<Self, ElementParseErr> {
        let mut nbr_ap_infos = Vec::new();
        while buf.get_len_remaining() > 0 {
            nbr_ap_infos.push(NeighborApInfo::from_bytebuf(buf)?);
        }
        Ok(ReducedNeighborReport { nbr_ap_infos })
    }
}
