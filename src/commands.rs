use crate::{
    EmptyResponse, Error, Result, ScpiDeserialize, ScpiSerialize, impl_scpi_request,
    impl_scpi_serialize, match_literal, read_until, scpi_enum, skip_line_end,
};

// Electrical quantities and their common abbreviations in SCPI commands.
// Not every instrument supports every quantity, see `InstrumentProfile`.

scpi_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ElectricalQuantity {
        Voltage => "VOLT",
        Current => "CURR",
        Power => "POW",
        Resistance => "RES",
        Inductance => "IND",
        Frequency => "FREQ",
        Period => "PER",
    }
}

impl ElectricalQuantity {
    pub const ALL: [ElectricalQuantity; 7] = [
        ElectricalQuantity::Voltage,
        ElectricalQuantity::Current,
        ElectricalQuantity::Power,
        ElectricalQuantity::Resistance,
        ElectricalQuantity::Inductance,
        ElectricalQuantity::Frequency,
        ElectricalQuantity::Period,
    ];

    pub fn abbreviation(self) -> &'static str {
        self.as_scpi()
    }
}

// Binary channel configuration, used both as command parameter
// and as decoded channel status.

scpi_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigBool {
        Disable => "0",
        Enable => "1",
    }
}

impl From<bool> for ConfigBool {
    fn from(value: bool) -> Self {
        match value {
            true => ConfigBool::Enable,
            false => ConfigBool::Disable,
        }
    }
}

impl From<ConfigBool> for bool {
    fn from(value: ConfigBool) -> Self {
        match value {
            ConfigBool::Enable => true,
            ConfigBool::Disable => false,
        }
    }
}

// *IDN?
// Query the manufacturer, model, serial number and firmware version.
// Typical Return: OWON,ODP3122,2304158,FV:V3.9.0
pub struct IdentityRequest;
impl_scpi_serialize!(IdentityRequest, ["*IDN?"]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResponse {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

impl ScpiDeserialize for IdentityResponse {
    fn deserialize(input: &mut &str) -> Result<Self> {
        let manufacturer = read_until(input, ',')?.trim().to_string();
        let model = read_until(input, ',')?.trim().to_string();
        let serial_number = read_until(input, ',')?.trim().to_string();
        let rest: &str = *input;
        let firmware_version = rest.trim().to_string();
        *input = "";
        Ok(IdentityResponse {
            manufacturer,
            model,
            serial_number,
            firmware_version,
        })
    }
}

impl_scpi_request!(IdentityRequest, IdentityResponse);

// *RST
// Restore factory settings.
pub struct ResetRequest;
impl_scpi_serialize!(ResetRequest, ["*RST"]);
impl_scpi_request!(ResetRequest, EmptyResponse);

// SYSTem:LOCal / SYSTem:REMote
// Local mode allows interaction through SCPI and the front panel,
// remote mode locks all front panel keys except the key lock.

scpi_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Mode {
        Local => "SYST:LOC",
        Remote => "SYST:REM",
    }
}

pub struct SetModeRequest {
    pub mode: Mode,
}
impl_scpi_serialize!(SetModeRequest, [mode]);
impl_scpi_request!(SetModeRequest, EmptyResponse);

/// Command subtree addressed by multi-channel value commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `APPly:<quantity> v1,v2,...`, the output levels.
    Level,
    /// `<quantity>:LIMit:ALL v1,v2,...`, the protection limits.
    Limit,
}

impl Namespace {
    fn serialize_head(&self, quantity: ElectricalQuantity, out: &mut String) {
        match self {
            Namespace::Level => {
                out.push_str("APP:");
                quantity.serialize(out);
            }
            Namespace::Limit => {
                quantity.serialize(out);
                out.push_str(":LIM:ALL");
            }
        }
    }
}

// APP:VOLT 5,3.3 / VOLT:LIM:ALL 31,6.6
// Set the value of one quantity on all channels in one line.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValuesRequest {
    pub namespace: Namespace,
    pub quantity: ElectricalQuantity,
    pub values: Vec<f64>,
}

impl ScpiSerialize for SetValuesRequest {
    fn serialize(&self, out: &mut String) {
        self.namespace.serialize_head(self.quantity, out);
        out.push(' ');
        self.values.serialize(out);
    }
}
impl_scpi_request!(SetValuesRequest, EmptyResponse);

// APP:VOLT? / VOLT:LIM:ALL?
// Typical Return: 5.000,3.300
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetValuesRequest {
    pub namespace: Namespace,
    pub quantity: ElectricalQuantity,
}

impl ScpiSerialize for GetValuesRequest {
    fn serialize(&self, out: &mut String) {
        self.namespace.serialize_head(self.quantity, out);
        out.push('?');
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuesResponse(pub Vec<f64>);

impl ScpiDeserialize for ValuesResponse {
    fn deserialize(input: &mut &str) -> Result<Self> {
        let raw: &str = *input;
        let payload = raw.trim();
        if payload.is_empty() {
            return Err(Error::ResponseDecoding(
                "Expected comma separated numbers, got empty response".to_string(),
            ));
        }

        let values = payload
            .split(',')
            .map(|token| {
                let token = token.trim();
                token.parse::<f64>().map_err(|_| {
                    Error::ResponseDecoding(format!("Number parsing failed: `{token}`"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        *input = "";
        Ok(ValuesResponse(values))
    }
}

impl_scpi_request!(GetValuesRequest, ValuesResponse);

// CHAN:OUTP:ALL 1,0
// Enable or disable the outputs of all channels at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutputsRequest {
    pub states: Vec<ConfigBool>,
}
impl_scpi_serialize!(SetOutputsRequest, ["CHAN:OUTP:ALL ", states]);
impl_scpi_request!(SetOutputsRequest, EmptyResponse);

// CHAN:OUTP:ALL?
// Typical Return: 1,0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOutputsRequest;
impl_scpi_serialize!(GetOutputsRequest, ["CHAN:OUTP:ALL?"]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputsResponse(pub Vec<ConfigBool>);

impl ScpiDeserialize for OutputsResponse {
    fn deserialize(input: &mut &str) -> Result<Self> {
        let mut states = Vec::new();
        loop {
            let rest: &str = *input;
            *input = rest.trim_start_matches(' ');
            states.push(ConfigBool::deserialize(input)?);
            if match_literal(input, ",").is_err() {
                break;
            }
        }
        skip_line_end(input);
        Ok(OutputsResponse(states))
    }
}

impl_scpi_request!(GetOutputsRequest, OutputsResponse);

/// Channel designator as used by `INST`, serialized as `CH<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelector(pub u8);

impl ScpiSerialize for ChannelSelector {
    fn serialize(&self, out: &mut String) {
        out.push_str("CH");
        self.0.serialize(out);
    }
}

impl ScpiDeserialize for ChannelSelector {
    fn deserialize(input: &mut &str) -> Result<Self> {
        match_literal(input, "CH")?;
        Ok(ChannelSelector(u8::deserialize(input)?))
    }
}

// INST CH2
// Select the channel that channel-scoped commands operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetInstrumentRequest {
    pub channel: ChannelSelector,
}
impl_scpi_serialize!(SetInstrumentRequest, ["INST ", channel]);
impl_scpi_request!(SetInstrumentRequest, EmptyResponse);

// INST?
// Typical Return: CH1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetInstrumentRequest;
impl_scpi_serialize!(GetInstrumentRequest, ["INST?"]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetInstrumentResponse {
    pub channel: ChannelSelector,
}

impl ScpiDeserialize for GetInstrumentResponse {
    fn deserialize(input: &mut &str) -> Result<Self> {
        let channel = ChannelSelector::deserialize(input)?;
        skip_line_end(input);
        Ok(GetInstrumentResponse { channel })
    }
}

impl_scpi_request!(GetInstrumentRequest, GetInstrumentResponse);

// MEAS:CURR?
// Measure a quantity on the currently selected channel.
// Typical Return: 1.250
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureRequest {
    pub quantity: ElectricalQuantity,
}
impl_scpi_serialize!(MeasureRequest, ["MEAS:", quantity, "?"]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureResponse(pub f64);

impl ScpiDeserialize for MeasureResponse {
    fn deserialize(input: &mut &str) -> Result<Self> {
        let value = f64::deserialize(input)?;
        skip_line_end(input);
        Ok(MeasureResponse(value))
    }
}

impl_scpi_request!(MeasureRequest, MeasureResponse);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check_empty;

    fn serialized(request: &impl ScpiSerialize) -> String {
        let mut out = String::new();
        request.serialize(&mut out);
        out
    }

    #[test]
    fn test_abbreviations() {
        let abbreviations: Vec<_> = ElectricalQuantity::ALL
            .iter()
            .map(|quantity| quantity.abbreviation())
            .collect();
        assert_eq!(
            abbreviations,
            ["VOLT", "CURR", "POW", "RES", "IND", "FREQ", "PER"]
        );

        for quantity in ElectricalQuantity::ALL {
            let input = &mut quantity.abbreviation();
            assert_eq!(ElectricalQuantity::deserialize(input).unwrap(), quantity);
            assert!(check_empty(input).is_ok());
        }
    }

    #[test]
    fn test_value_requests() {
        let set = SetValuesRequest {
            namespace: Namespace::Level,
            quantity: ElectricalQuantity::Voltage,
            values: vec![5.0, 3.3],
        };
        assert_eq!(serialized(&set), "APP:VOLT 5,3.3");

        let set = SetValuesRequest {
            namespace: Namespace::Limit,
            quantity: ElectricalQuantity::Current,
            values: vec![12.1, 0.5],
        };
        assert_eq!(serialized(&set), "CURR:LIM:ALL 12.1,0.5");

        let get = GetValuesRequest {
            namespace: Namespace::Limit,
            quantity: ElectricalQuantity::Voltage,
        };
        assert_eq!(serialized(&get), "VOLT:LIM:ALL?");
    }

    #[test]
    fn test_values_response() {
        let input = &mut " 5.000, 3.300\r\n";
        assert_eq!(
            ValuesResponse::deserialize(input).unwrap(),
            ValuesResponse(vec![5.0, 3.3])
        );
        assert!(check_empty(input).is_ok());

        assert!(ValuesResponse::deserialize(&mut "5.000,ERR").is_err());
        assert!(ValuesResponse::deserialize(&mut "5.000,").is_err());
        assert!(ValuesResponse::deserialize(&mut "\n").is_err());
    }

    #[test]
    fn test_outputs() {
        let set = SetOutputsRequest {
            states: vec![ConfigBool::Enable, ConfigBool::Disable],
        };
        assert_eq!(serialized(&set), "CHAN:OUTP:ALL 1,0");

        let input = &mut "1, 0\n";
        assert_eq!(
            OutputsResponse::deserialize(input).unwrap(),
            OutputsResponse(vec![ConfigBool::Enable, ConfigBool::Disable])
        );
        assert!(check_empty(input).is_ok());

        assert!(OutputsResponse::deserialize(&mut "1,X").is_err());
    }

    #[test]
    fn test_instrument() {
        let set = SetInstrumentRequest {
            channel: ChannelSelector(2),
        };
        assert_eq!(serialized(&set), "INST CH2");

        let input = &mut "CH2\n";
        assert_eq!(
            GetInstrumentResponse::deserialize(input).unwrap().channel,
            ChannelSelector(2)
        );
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_measure() {
        let request = MeasureRequest {
            quantity: ElectricalQuantity::Current,
        };
        assert_eq!(serialized(&request), "MEAS:CURR?");

        let input = &mut "1.250\n";
        assert_eq!(MeasureResponse::deserialize(input).unwrap().0, 1.25);
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_identity() {
        let input = &mut "OWON,ODP3122,2304158,FV:V3.9.0\n";
        let identity = IdentityResponse::deserialize(input).unwrap();
        assert_eq!(identity.manufacturer, "OWON");
        assert_eq!(identity.model, "ODP3122");
        assert_eq!(identity.serial_number, "2304158");
        assert_eq!(identity.firmware_version, "FV:V3.9.0");
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_mode() {
        let request = SetModeRequest { mode: Mode::Remote };
        assert_eq!(serialized(&request), "SYST:REM");
        assert_eq!(Mode::Local.as_scpi(), "SYST:LOC");
    }
}
