/// core-lib/src/cartridge/types.rs
///
/// Header-derived cartridge metadata: controller kind, ROM size, RAM size.

/// Cartridge controller kind, decoded from header byte 0x0147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeKind {
    /// ROM only (no controller)
    RomOnly,
    /// MBC1 (with optional RAM and battery)
    Mbc1 { ram: bool, battery: bool },
    /// MBC2 (built-in 512x4 bit RAM, optional battery)
    Mbc2 { battery: bool },
    /// MBC3 (with optional RAM, battery, RTC)
    Mbc3 { ram: bool, battery: bool, rtc: bool },
    /// MBC5 (with optional RAM, battery, rumble)
    Mbc5 { ram: bool, battery: bool, rumble: bool },
}

impl CartridgeKind {
    /// Decodes header byte 0x0147. Unknown values fall back to `RomOnly`
    /// so that a malformed header still yields a runnable machine.
    pub const fn from_header(value: u8) -> Self {
        match value {
            0x01 => Self::Mbc1 { ram: false, battery: false },
            0x02 => Self::Mbc1 { ram: true, battery: false },
            0x03 => Self::Mbc1 { ram: true, battery: true },
            0x05 => Self::Mbc2 { battery: false },
            0x06 => Self::Mbc2 { battery: true },
            0x0F => Self::Mbc3 { ram: false, battery: true, rtc: true },
            0x10 => Self::Mbc3 { ram: true, battery: true, rtc: true },
            0x11 => Self::Mbc3 { ram: false, battery: false, rtc: false },
            0x12 => Self::Mbc3 { ram: true, battery: false, rtc: false },
            0x13 => Self::Mbc3 { ram: true, battery: true, rtc: false },
            0x19 => Self::Mbc5 { ram: false, battery: false, rumble: false },
            0x1A => Self::Mbc5 { ram: true, battery: false, rumble: false },
            0x1B => Self::Mbc5 { ram: true, battery: true, rumble: false },
            0x1C => Self::Mbc5 { ram: false, battery: false, rumble: true },
            0x1D => Self::Mbc5 { ram: true, battery: false, rumble: true },
            0x1E => Self::Mbc5 { ram: true, battery: true, rumble: true },
            _ => Self::RomOnly,
        }
    }

    /// Whether the cartridge carries battery-backed RAM worth persisting.
    pub const fn has_battery(self) -> bool {
        matches!(
            self,
            Self::Mbc1 { battery: true, .. }
                | Self::Mbc2 { battery: true }
                | Self::Mbc3 { battery: true, .. }
                | Self::Mbc5 { battery: true, .. }
        )
    }
}

/// External RAM size, decoded from header byte 0x0149.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamSize {
    None,
    Size2KB,
    Size8KB,
    Size32KB,
    Size128KB,
    Size64KB,
}

impl RamSize {
    /// Decodes header byte 0x0149. Unknown values mean no RAM.
    pub const fn from_header(value: u8) -> Self {
        match value {
            0x01 => Self::Size2KB,
            0x02 => Self::Size8KB,
            0x03 => Self::Size32KB,
            0x04 => Self::Size128KB,
            0x05 => Self::Size64KB,
            _ => Self::None,
        }
    }

    /// Returns the size in bytes.
    pub const fn as_bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::Size2KB => 2 * 1024,
            Self::Size8KB => 8 * 1024,
            Self::Size32KB => 32 * 1024,
            Self::Size128KB => 128 * 1024,
            Self::Size64KB => 64 * 1024,
        }
    }
}

/// Returns the ROM bank count for header byte 0x0148 (two banks per 32KiB
/// step), or `None` for out-of-range codes.
pub const fn rom_bank_count_from_header(value: u8) -> Option<usize> {
    match value {
        0x00..=0x08 => Some(2 << value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn kind_from_header() {
        assert_eq!(CartridgeKind::from_header(0x00), CartridgeKind::RomOnly);
        assert!(matches!(
            CartridgeKind::from_header(0x01),
            CartridgeKind::Mbc1 { .. }
        ));
        assert!(matches!(
            CartridgeKind::from_header(0x05),
            CartridgeKind::Mbc2 { .. }
        ));
        assert!(matches!(
            CartridgeKind::from_header(0x10),
            CartridgeKind::Mbc3 { ram: true, battery: true, rtc: true }
        ));
        assert!(matches!(
            CartridgeKind::from_header(0x1E),
            CartridgeKind::Mbc5 { ram: true, battery: true, rumble: true }
        ));
        // Unknown types degrade to RomOnly instead of failing the load.
        assert_eq!(CartridgeKind::from_header(0xAB), CartridgeKind::RomOnly);
    }

    #[test]
    fn battery_detection() {
        assert!(CartridgeKind::from_header(0x03).has_battery());
        assert!(CartridgeKind::from_header(0x06).has_battery());
        assert!(CartridgeKind::from_header(0x13).has_battery());
        assert!(!CartridgeKind::from_header(0x01).has_battery());
        assert!(!CartridgeKind::from_header(0x19).has_battery());
    }

    #[test_case(0x00, 0; "no ram")]
    #[test_case(0x01, 2 * 1024; "2k")]
    #[test_case(0x02, 8 * 1024; "8k")]
    #[test_case(0x03, 32 * 1024; "32k")]
    #[test_case(0x04, 128 * 1024; "128k")]
    #[test_case(0x05, 64 * 1024; "64k")]
    #[test_case(0xFF, 0; "unknown code")]
    fn ram_size_from_header(code: u8, bytes: usize) {
        assert_eq!(RamSize::from_header(code).as_bytes(), bytes);
    }

    #[test]
    fn rom_bank_counts() {
        assert_eq!(rom_bank_count_from_header(0x00), Some(2));
        assert_eq!(rom_bank_count_from_header(0x03), Some(16));
        assert_eq!(rom_bank_count_from_header(0x08), Some(512));
        assert_eq!(rom_bank_count_from_header(0x52), None);
    }
}
