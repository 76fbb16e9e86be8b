use thiserror::Error;

pub mod channel_control;
pub mod codec;
pub mod commands;
pub mod mso7104a;
pub mod odp3122;
pub mod profile;
pub mod session;
pub mod transport;

use commands::ElectricalQuantity;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Received data does not match expected format: {0}")]
    ResponseDecoding(String),
    #[error("Underlying I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to connect: {0}")]
    ConnectFailed(String),
    #[error("Not connected: {0}")]
    NotConnected(String),
    #[error("Electrical quantity {quantity:?} is not supported by `{instrument}`, available: {supported:?}")]
    UnsupportedQuantity {
        instrument: String,
        quantity: ElectricalQuantity,
        supported: Vec<ElectricalQuantity>,
    },
    #[error("Channel {channel} is not a valid channel for `{instrument}` (1..={channel_count})")]
    InvalidChannel {
        instrument: String,
        channel: u8,
        channel_count: u8,
    },
    #[error("Other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ScpiSerialize {
    fn serialize(&self, out: &mut String);
}

pub trait ScpiDeserialize
where
    Self: Sized,
{
    fn deserialize(input: &mut &str) -> Result<Self>;
}

pub trait ScpiRequest: ScpiSerialize {
    type Response: ScpiDeserialize;
}

impl ScpiSerialize for f64 {
    fn serialize(&self, out: &mut String) {
        use std::fmt::Write;
        write!(out, "{self}").expect("Failed to format number");
    }
}

impl ScpiSerialize for u8 {
    fn serialize(&self, out: &mut String) {
        use std::fmt::Write;
        write!(out, "{self}").expect("Failed to format number");
    }
}

/// Comma separated list, as used by the `...:ALL` commands.
impl<T: ScpiSerialize> ScpiSerialize for Vec<T> {
    fn serialize(&self, out: &mut String) {
        for (index, item) in self.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            item.serialize(out);
        }
    }
}

pub struct EmptyResponse;
impl ScpiDeserialize for EmptyResponse {
    fn deserialize(_input: &mut &str) -> Result<Self> {
        Ok(EmptyResponse)
    }
}

impl ScpiDeserialize for u8 {
    fn deserialize(input: &mut &str) -> crate::Result<Self> {
        let digits = read_while(input, |c| c.is_ascii_digit());
        let value: u8 = digits
            .parse()
            .map_err(|_| Error::ResponseDecoding(format!("Number parsing failed: {digits}")))?;
        Ok(value)
    }
}

impl ScpiDeserialize for f64 {
    fn deserialize(input: &mut &str) -> crate::Result<Self> {
        let rest: &str = *input;
        *input = rest.trim_start();
        let literal = read_while(input, |c| {
            c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
        });
        let value: f64 = literal
            .parse()
            .map_err(|_| Error::ResponseDecoding(format!("Number parsing failed: `{literal}`")))?;
        Ok(value)
    }
}

#[macro_export]
macro_rules! impl_scpi_serialize {
    ($type:ty, [ $( $part:tt ),* $(,)? ]) => {
        impl $crate::ScpiSerialize for $type {
            fn serialize(&self, out: &mut String) {
                $(
                    $crate::impl_scpi_serialize!(@part self, out, $part);
                )*
            }
        }
    };

    // Handle string literals
    (@part $self:ident, $out:ident, $lit:literal) => {
        $out.push_str($lit);
    };

    // Handle field names
    (@part $self:ident, $out:ident, $field:ident) => {
        $crate::ScpiSerialize::serialize(&$self.$field, $out);
    };
}

#[macro_export]
macro_rules! impl_scpi_request {
    ($request:ty, $response:ty) => {
        impl $crate::ScpiRequest for $request {
            type Response = $response;
        }
    };
}

pub fn match_literal(input: &mut &str, literal: &'static str) -> Result<()> {
    if let Some(rest) = input.strip_prefix(literal) {
        *input = rest;
        Ok(())
    } else {
        Err(Error::ResponseDecoding(format!(
            "Expected literal `{literal}` not matched `{input}`"
        )))
    }
}

pub fn read_until<'a>(input: &mut &'a str, delimiter: char) -> Result<&'a str> {
    if let Some(index) = input.find(delimiter) {
        let (head, tail) = input.split_at(index);
        *input = &tail[delimiter.len_utf8()..];
        Ok(head)
    } else {
        Err(Error::ResponseDecoding(format!(
            "Expected `{delimiter}` in `{input}`"
        )))
    }
}

pub fn read_while<'a, P>(input: &mut &'a str, predicate: P) -> &'a str
where
    P: Fn(char) -> bool,
{
    let split = input
        .char_indices()
        .find(|(_, c)| !predicate(*c))
        .map(|(split, _)| split)
        .unwrap_or(input.len());

    let (head, tail) = input.split_at(split);
    *input = tail;
    head
}

/// Consumes trailing whitespace and line terminators.
pub fn skip_line_end(input: &mut &str) {
    read_while(input, char::is_whitespace);
}

pub fn check_empty(input: &mut &str) -> Result<()> {
    if input.is_empty() {
        Ok(())
    } else {
        Err(Error::ResponseDecoding(format!(
            "Response should be empty/fully deserialized, but still has content: `{input}`"
        )))
    }
}

#[macro_export]
macro_rules! scpi_enum {
    (
        $(#[$enum_meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $literal:expr
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            pub fn as_scpi(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant => $literal,
                    )*
                }
            }
        }

        impl $crate::ScpiDeserialize for $name {
            fn deserialize(input: &mut &str) -> $crate::Result<Self> {
                $(
                    if let Ok(()) = $crate::match_literal(input, $literal) {
                        return Ok(Self::$variant);
                    }
                )*
                Err($crate::Error::ResponseDecoding(format!("Unexpected token for {}: `{}`", stringify!($name), input)))
            }
        }

        impl $crate::ScpiSerialize for $name {
            fn serialize(&self, out: &mut String) {
                out.push_str(self.as_scpi());
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty() {
        assert!(check_empty(&mut "").is_ok());
        assert!(check_empty(&mut "x").is_err());
    }

    #[test]
    fn test_match_literal() {
        let input = &mut "1234";
        assert!(match_literal(input, "12").is_ok());
        assert!(match_literal(input, "12").is_err());
        assert!(match_literal(input, "34").is_ok());
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_read_until() {
        let input = &mut "12,34";
        assert_eq!(read_until(input, ',').unwrap(), "12");
        assert!(match_literal(input, "34").is_ok());
        assert!(check_empty(input).is_ok());
        assert!(read_until(&mut "1234", ',').is_err());
    }

    #[test]
    fn test_read_while() {
        let input = &mut "12,34";
        assert_eq!(read_while(input, char::is_numeric), "12");
        assert!(match_literal(input, ",").is_ok());
        assert_eq!(read_while(input, char::is_numeric), "34");
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_skip_line_end() {
        let input = &mut " \r\n";
        skip_line_end(input);
        assert!(check_empty(input).is_ok());
    }

    #[test]
    fn test_deserialize_u8() {
        let input = &mut "12\n";
        assert_eq!(u8::deserialize(input).unwrap(), 12);
        assert_eq!(*input, "\n");
        assert!(u8::deserialize(&mut "CH").is_err());
    }

    #[test]
    fn test_deserialize_f64() {
        let input = &mut " -1.25e-3\n";
        assert_eq!(f64::deserialize(input).unwrap(), -1.25e-3);
        assert_eq!(*input, "\n");
        assert!(f64::deserialize(&mut "abc").is_err());
    }

    #[test]
    fn test_serialize_list() {
        let mut out = String::new();
        vec![5.0, 3.3].serialize(&mut out);
        assert_eq!(out, "5,3.3");
    }
}
