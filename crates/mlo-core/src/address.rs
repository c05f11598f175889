use crate::bytebuffer::ByteBuffer;
use crate::element_parse_error::ElementParseErr;

/// 48-bit MAC-layer address. Used both for per-link addresses and for the
/// MLD-level logical address of a multi-link device.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mac48(pub [u8; 6]);

impl Mac48 {
    pub const BROADCAST: Mac48 = Mac48([0xFF; 6]);

    pub fn new(octets: [u8; 6]) -> Self {
        Mac48(octets)
    }

    /// Group bit (I/G) of the first octet. Broadcast and multicast addresses
    /// are group addresses and are never acknowledged.
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Derive the per-link address for link `n` from an MLD address.
    /// Sets the locally-administered bit and offsets the last octet, keeping
    /// the result distinct from the MLD address itself.
    pub fn derived(&self, n: u8) -> Mac48 {
        let mut octets = self.0;
        octets[0] |= 0x02;
        octets[5] = octets[5].wrapping_add(n).wrapping_add(1);
        Mac48(octets)
    }

    pub fn to_bytebuf(&self, buf: &mut ByteBuffer) {
        buf.write_bytes(&self.0);
    }

    pub fn from_bytebuf(buf: &mut ByteBuffer, field: &'static str) -> Result<Self, ElementParseErr> {
        let bytes = buf.read_field_bytes(6, field)?;
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bytes);
        Ok(Mac48(octets))
    }
}

impl core::str::FromStr for Mac48 {
    type Err = String;

    /// Parse "aa:bb:cc:dd:ee:ff" notation, as used in configuration files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("invalid MAC address: {}", s));
        }
        for (i, part) in parts.iter().enumerate() {
            octets[i] = u8::from_str_radix(part, 16).map_err(|_| format!("invalid MAC address: {}", s))?;
        }
        Ok(Mac48(octets))
    }
}

impl core::fmt::Display for Mac48 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl core::fmt::Debug for Mac48 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self)
    }
}
