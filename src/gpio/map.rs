//! Static 40-pin header map.
//!
//! Physical header positions are 1-based. Positions carrying a signal also
//! carry the SoC (BCM) GPIO number; power, ground and the ID EEPROM pins do not.

use super::mode::NumberingMode;

/// One physical position on the 40-pin header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMapEntry {
    /// Physical header position (1-40)
    pub physical: u8,
    /// Display label, e.g. "GPIO2 (SDA1)" or "GND"
    pub label: &'static str,
    /// Logical (BCM) GPIO number, absent for power/ground pins
    pub logical: Option<u8>,
}

const fn entry(physical: u8, label: &'static str, logical: Option<u8>) -> PinMapEntry {
    PinMapEntry {
        physical,
        label,
        logical,
    }
}

/// Number of positions on the header.
pub const HEADER_PINS: u8 = 40;

/// The common 40-pin header layout.
pub const PIN_MAP: [PinMapEntry; 40] = [
    entry(1, "3V3", None),
    entry(2, "5V", None),
    entry(3, "GPIO2 (SDA1)", Some(2)),
    entry(4, "5V", None),
    entry(5, "GPIO3 (SCL1)", Some(3)),
    entry(6, "GND", None),
    entry(7, "GPIO4", Some(4)),
    entry(8, "GPIO14 (TXD)", Some(14)),
    entry(9, "GND", None),
    entry(10, "GPIO15 (RXD)", Some(15)),
    entry(11, "GPIO17", Some(17)),
    entry(12, "GPIO18", Some(18)),
    entry(13, "GPIO27", Some(27)),
    entry(14, "GND", None),
    entry(15, "GPIO22", Some(22)),
    entry(16, "GPIO23", Some(23)),
    entry(17, "3V3", None),
    entry(18, "GPIO24", Some(24)),
    entry(19, "GPIO10 (MOSI)", Some(10)),
    entry(20, "GND", None),
    entry(21, "GPIO9 (MISO)", Some(9)),
    entry(22, "GPIO25", Some(25)),
    entry(23, "GPIO11 (SCLK)", Some(11)),
    entry(24, "GPIO8 (CE0)", Some(8)),
    entry(25, "GND", None),
    entry(26, "GPIO7 (CE1)", Some(7)),
    entry(27, "ID_SD", None),
    entry(28, "ID_SC", None),
    entry(29, "GPIO5", Some(5)),
    entry(30, "GND", None),
    entry(31, "GPIO6", Some(6)),
    entry(32, "GPIO12", Some(12)),
    entry(33, "GPIO13", Some(13)),
    entry(34, "GND", None),
    entry(35, "GPIO19", Some(19)),
    entry(36, "GPIO16", Some(16)),
    entry(37, "GPIO26", Some(26)),
    entry(38, "GPIO20", Some(20)),
    entry(39, "GND", None),
    entry(40, "GPIO21", Some(21)),
];

/// Look up a physical header position.
pub fn entry_for_physical(physical: u8) -> Option<&'static PinMapEntry> {
    PIN_MAP.iter().find(|e| e.physical == physical)
}

/// Physical position of a logical GPIO number, if it is routed to the header.
pub fn physical_from_logical(logical: u8) -> Option<u8> {
    PIN_MAP
        .iter()
        .find(|e| e.logical == Some(logical))
        .map(|e| e.physical)
}

/// Logical GPIO number routed to a physical position.
pub fn logical_from_physical(physical: u8) -> Option<u8> {
    entry_for_physical(physical).and_then(|e| e.logical)
}

/// Human readable label for a pin interpreted in `mode`.
pub fn label_for(pin: u8, mode: NumberingMode) -> String {
    match mode {
        NumberingMode::Logical => match physical_from_logical(pin) {
            Some(phys) => format!("GPIO{} (phys {})", pin, phys),
            None => format!("GPIO{}", pin),
        },
        NumberingMode::Physical => match entry_for_physical(pin) {
            None => format!("PIN {}", pin),
            Some(e) => match e.logical {
                Some(bcm) => format!("{} (phys {}) [BCM {}]", e.label, pin, bcm),
                None => format!("{} (phys {})", e.label, pin),
            },
        },
    }
}

/// Render the header map as a text table.
pub fn render_map_table() -> String {
    let mut buf = String::with_capacity(1200);
    buf.push_str("Raspberry Pi 40-pin Header Map\n\n");
    buf.push_str("Phys | Label              | BCM\n");
    buf.push_str("-----+--------------------+-----\n");
    for e in PIN_MAP.iter() {
        let bcm = e
            .logical
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        buf.push_str(&format!("{:>4} | {:<18} | {:>3}\n", e.physical, e.label, bcm));
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_ordered_by_position() {
        for (idx, e) in PIN_MAP.iter().enumerate() {
            assert_eq!(e.physical as usize, idx + 1);
        }
    }

    #[test]
    fn test_logical_numbers_are_unique() {
        let mut seen = Vec::new();
        for n in PIN_MAP.iter().filter_map(|e| e.logical) {
            assert!(!seen.contains(&n), "GPIO{} appears twice", n);
            seen.push(n);
        }
    }

    #[test]
    fn test_physical_labels_round_trip() {
        for phys in 1..=HEADER_PINS {
            let label = label_for(phys, NumberingMode::Physical);
            assert!(!label.is_empty());
            if let Some(bcm) = logical_from_physical(phys) {
                assert_eq!(physical_from_logical(bcm), Some(phys));
            }
        }
    }

    #[test]
    fn test_logical_labels() {
        assert_eq!(label_for(17, NumberingMode::Logical), "GPIO17 (phys 11)");
        assert_eq!(label_for(0, NumberingMode::Logical), "GPIO0");
    }

    #[test]
    fn test_physical_labels() {
        assert_eq!(
            label_for(3, NumberingMode::Physical),
            "GPIO2 (SDA1) (phys 3) [BCM 2]"
        );
        assert_eq!(label_for(6, NumberingMode::Physical), "GND (phys 6)");
        assert_eq!(label_for(41, NumberingMode::Physical), "PIN 41");
    }

    #[test]
    fn test_map_table_has_every_row() {
        let table = render_map_table();
        assert_eq!(table.lines().count(), 4 + 40);
        assert!(table.contains("  27 | ID_SD              |   -"));
    }
}
