//! Board wiring descriptions.
//!
//! Up to two head ports exist per board. Which are populated, which pins they
//! use and which baud rate they start at is pure data; the library never
//! touches hardware directly and hands these values to the integrator's
//! [`UartDriver`](crate::serial::UartDriver) unmodified.

/// Identity of one head port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortId {
    Gh0,
    Gh1,
}

impl PortId {
    pub const ALL: [PortId; 2] = [PortId::Gh0, PortId::Gh1];

    pub fn index(self) -> usize {
        match self {
            PortId::Gh0 => 0,
            PortId::Gh1 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<PortId> {
        match index {
            0 => Some(PortId::Gh0),
            1 => Some(PortId::Gh1),
            _ => None,
        }
    }
}

/// Encodes a pin as bank letter plus pin number, `gpio(0, 9)` being PA9.
pub const fn gpio(bank: u8, pin: u32) -> u32 {
    (bank as u32) * 32 + pin
}

/// Static description of one head port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub rx_pin: u32,
    pub tx_pin: u32,
    /// Peripheral clock-enable identifier, passed through to the driver.
    pub clock_id: u32,
    /// Initial baud rate; may later change under baud-scan recovery.
    pub baud: u32,
}

/// Port population for one board variant.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub ports: [Option<PortConfig>; 2],
}

const PORT_LEFT: PortConfig = PortConfig {
    rx_pin: gpio(0, 10),
    tx_pin: gpio(0, 9),
    clock_id: 7,
    baud: 115_200,
};

const PORT_RIGHT: PortConfig = PortConfig {
    rx_pin: gpio(0, 6),
    tx_pin: gpio(0, 5),
    clock_id: 45,
    baud: 230_400,
};

impl BoardConfig {
    /// Dual-head board, both ports populated.
    pub const fn double() -> Self {
        BoardConfig {
            ports: [Some(PORT_LEFT), Some(PORT_RIGHT)],
        }
    }

    /// Single-head board wired to the left port.
    pub const fn single_left() -> Self {
        BoardConfig {
            ports: [Some(PORT_LEFT), None],
        }
    }

    /// Single-head board wired to the right port.
    pub const fn single_right() -> Self {
        BoardConfig {
            ports: [None, Some(PORT_RIGHT)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_packs_bank_and_pin() {
        assert_eq!(gpio(0, 9), 9);
        assert_eq!(gpio(1, 3), 35);
    }

    #[test]
    fn variants_populate_the_expected_ports() {
        assert!(BoardConfig::double().ports.iter().all(Option::is_some));
        let left = BoardConfig::single_left();
        assert!(left.ports[0].is_some() && left.ports[1].is_none());
        let right = BoardConfig::single_right();
        assert!(right.ports[0].is_none() && right.ports[1].is_some());
    }

    #[test]
    fn port_ids_round_trip_through_indices() {
        for id in PortId::ALL {
            assert_eq!(PortId::from_index(id.index()), Some(id));
        }
        assert_eq!(PortId::from_index(2), None);
    }
}
