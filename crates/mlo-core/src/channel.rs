use serde::Deserialize;

/// PHY band a link operates in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
pub enum WifiBand {
    Band2_4GHz,
    Band5GHz,
    Band6GHz,
}

impl core::fmt::Display for WifiBand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WifiBand::Band2_4GHz => write!(f, "2.4GHz"),
            WifiBand::Band5GHz => write!(f, "5GHz"),
            WifiBand::Band6GHz => write!(f, "6GHz"),
        }
    }
}

/// Operating channel of one link: primary channel number, channel width,
/// band and the index of the primary 20 MHz subchannel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OperatingChannel {
    pub number: u8,
    pub width_mhz: u16,
    pub band: WifiBand,
    pub primary20_index: u8,
}

impl OperatingChannel {
    pub fn new(number: u8, width_mhz: u16, band: WifiBand, primary20_index: u8) -> Self {
        Self { number, width_mhz, band, primary20_index }
    }

    /// Whether two channels occupy the same frequency slot, i.e. a frame sent
    /// on one is receivable on the other. Width and primary index do not
    /// affect receivability of the primary channel.
    pub fn same_freq(&self, other: &OperatingChannel) -> bool {
        self.band == other.band && self.number == other.number
    }

    /// Global operating class advertised for this channel in neighbor reports.
    /// Only the (band, width) combinations used by this stack are mapped.
    pub fn op_class(&self) -> u8 {
        match (self.band, self.width_mhz) {
            (WifiBand::Band2_4GHz, 20) => 81,
            (WifiBand::Band2_4GHz, 40) => 83,
            (WifiBand::Band5GHz, 20) => 115,
            (WifiBand::Band5GHz, 40) => 116,
            (WifiBand::Band5GHz, 80) => 128,
            (WifiBand::Band6GHz, 20) => 131,
            (WifiBand::Band6GHz, 40) => 132,
            (WifiBand::Band6GHz, 80) => 133,
            (band, width) => panic!("no operating class for {} / {} MHz", band, width),
        }
    }

    /// Reconstruct a channel from an advertised operating class and channel
    /// number. The primary 20 MHz index is not carried in neighbor reports;
    /// advertised channels use index 0.
    pub fn from_op_class(op_class: u8, number: u8) -> Option<Self> {
        let (band, width_mhz) = match op_class {
            81 => (WifiBand::Band2_4GHz, 20),
            83 => (WifiBand::Band2_4GHz, 40),
            115 => (WifiBand::Band5GHz, 20),
            116 => (WifiBand::Band5GHz, 40),
            128 => (WifiBand::Band5GHz, 80),
            131 => (WifiBand::Band6GHz, 20),
            132 => (WifiBand::Band6GHz, 40),
            133 => (WifiBand::Band6GHz, 80),
            _ => return None,
        };
        Some(Self { number, width_mhz, band, primary20_index: 0 })
    }
}

impl core::fmt::Display for OperatingChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{{{}, {} MHz, {}, P{}}}", self.number, self.width_mhz, self.band, self.primary20_index)
    }
}
