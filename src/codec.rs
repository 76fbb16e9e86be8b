//! Conversion between logical multi-channel commands and SCPI lines.
//!
//! A channel value set is a slice of `Option<f64>`, one slot per channel.
//! `Some` commands the channel to that value, `None` leaves it where it is.
//! Slots past the channel count are ignored, missing trailing slots count
//! as `None`.

use crate::{
    Error, Result, ScpiDeserialize, ScpiSerialize, check_empty,
    commands::{ElectricalQuantity, GetValuesRequest, Namespace, SetValuesRequest, ValuesResponse},
    profile::InstrumentProfile,
    skip_line_end,
};

pub fn encode<Request: ScpiSerialize>(request: &Request) -> String {
    let mut out = String::with_capacity(128);
    request.serialize(&mut out);
    out
}

/// Decodes a full response, tolerating a trailing line terminator.
pub fn decode<Response: ScpiDeserialize>(raw: &str) -> Result<Response> {
    let mut data = raw;
    let response = Response::deserialize(&mut data)?;
    skip_line_end(&mut data);
    check_empty(&mut data)?;
    Ok(response)
}

/// Fills the absent slots of `requested` from `current` and covers every channel.
pub fn merge_values(
    profile: &InstrumentProfile,
    requested: &[Option<f64>],
    current: &[f64],
) -> Result<Vec<f64>> {
    (0..usize::from(profile.channel_count))
        .map(|index| match requested.get(index).copied().flatten() {
            Some(value) => Ok(value),
            None => current.get(index).copied().ok_or_else(|| {
                Error::ResponseDecoding(format!(
                    "`{}` reported {} values, channel {} has none to keep",
                    profile.name,
                    current.len(),
                    index + 1
                ))
            }),
        })
        .collect()
}

pub fn set_request(
    namespace: Namespace,
    quantity: ElectricalQuantity,
    profile: &InstrumentProfile,
    requested: &[Option<f64>],
    current: &[f64],
) -> Result<SetValuesRequest> {
    profile.check_supported(quantity)?;
    Ok(SetValuesRequest {
        namespace,
        quantity,
        values: merge_values(profile, requested, current)?,
    })
}

pub fn query_request(
    namespace: Namespace,
    quantity: ElectricalQuantity,
    profile: &InstrumentProfile,
) -> Result<GetValuesRequest> {
    profile.check_queryable(quantity)?;
    Ok(GetValuesRequest {
        namespace,
        quantity,
    })
}

pub fn encode_set(
    namespace: Namespace,
    quantity: ElectricalQuantity,
    profile: &InstrumentProfile,
    requested: &[Option<f64>],
    current: &[f64],
) -> Result<String> {
    set_request(namespace, quantity, profile, requested, current).map(|request| encode(&request))
}

pub fn encode_query(
    namespace: Namespace,
    quantity: ElectricalQuantity,
    profile: &InstrumentProfile,
) -> Result<String> {
    query_request(namespace, quantity, profile).map(|request| encode(&request))
}

pub fn decode_numeric_list(raw: &str) -> Result<Vec<f64>> {
    decode::<ValuesResponse>(raw).map(|response| response.0)
}

/// True when every present slot of `requested` equals the reading at its index.
///
/// Comparison is exact, readings the instrument rounds will not verify.
pub fn matches_requested(requested: &[Option<f64>], actual: &[f64], channel_count: u8) -> bool {
    requested
        .iter()
        .take(usize::from(channel_count))
        .enumerate()
        .all(|(index, slot)| match slot {
            Some(expected) => actual.get(index) == Some(expected),
            None => true,
        })
}
