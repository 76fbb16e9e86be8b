use crate::{Error, Result, commands::ElectricalQuantity};

/// Fixed identity of an instrument model.
///
/// An empty quantity set means the instrument supports none of the
/// multi-channel value operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentProfile {
    pub name: String,
    pub channel_count: u8,
    pub quantities: Vec<ElectricalQuantity>,
    pub default_port: u16,
}

impl InstrumentProfile {
    pub const DEFAULT_PORT: u16 = 5555;

    /// Channel counts below one are raised to one.
    pub fn new(name: &str, channel_count: u8, quantities: &[ElectricalQuantity]) -> Self {
        InstrumentProfile {
            name: name.to_string(),
            channel_count: channel_count.max(1),
            quantities: quantities.to_vec(),
            default_port: Self::DEFAULT_PORT,
        }
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn supports(&self, quantity: ElectricalQuantity) -> bool {
        self.quantities.contains(&quantity)
    }

    pub fn check_supported(&self, quantity: ElectricalQuantity) -> Result<()> {
        if self.supports(quantity) {
            Ok(())
        } else {
            Err(self.unsupported(quantity))
        }
    }

    /// Power is never reported as a per-channel value, only measured.
    pub fn check_queryable(&self, quantity: ElectricalQuantity) -> Result<()> {
        if self.supports(quantity) && quantity != ElectricalQuantity::Power {
            Ok(())
        } else {
            Err(self.unsupported(quantity))
        }
    }

    pub fn check_channel(&self, channel: u8) -> Result<()> {
        if (1..=self.channel_count).contains(&channel) {
            Ok(())
        } else {
            Err(Error::InvalidChannel {
                instrument: self.name.clone(),
                channel,
                channel_count: self.channel_count,
            })
        }
    }

    fn unsupported(&self, quantity: ElectricalQuantity) -> Error {
        Error::UnsupportedQuantity {
            instrument: self.name.clone(),
            quantity,
            supported: self
                .quantities
                .iter()
                .copied()
                .filter(|q| *q != ElectricalQuantity::Power)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> InstrumentProfile {
        InstrumentProfile::new(
            "Bench Supply",
            2,
            &[ElectricalQuantity::Voltage, ElectricalQuantity::Power],
        )
    }

    #[test]
    fn test_queryable() {
        let profile = profile();
        assert!(profile.check_supported(ElectricalQuantity::Power).is_ok());
        assert!(profile.check_queryable(ElectricalQuantity::Voltage).is_ok());
        assert!(matches!(
            profile.check_queryable(ElectricalQuantity::Power),
            Err(Error::UnsupportedQuantity { .. })
        ));
        assert!(matches!(
            profile.check_supported(ElectricalQuantity::Frequency),
            Err(Error::UnsupportedQuantity { .. })
        ));
    }

    #[test]
    fn test_channel_range() {
        let profile = profile();
        assert!(profile.check_channel(1).is_ok());
        assert!(profile.check_channel(2).is_ok());
        assert!(matches!(
            profile.check_channel(0),
            Err(Error::InvalidChannel { channel: 0, .. })
        ));
        assert!(matches!(
            profile.check_channel(3),
            Err(Error::InvalidChannel { channel: 3, .. })
        ));
    }

    #[test]
    fn test_channel_count_at_least_one() {
        let profile = InstrumentProfile::new("Logger", 0, &[]);
        assert_eq!(profile.channel_count, 1);
        assert_eq!(profile.default_port, InstrumentProfile::DEFAULT_PORT);
    }
}
