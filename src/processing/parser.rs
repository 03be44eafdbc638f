//! Wire codec for the station protocol
//!
//! Frames are short ASCII tokens delimited by `:`:
//!
//! ```text
//! PING:<deviceId>
//! SOS:<deviceId>
//! REPORT:<stationId>:<rssi>
//! ```

use crate::core::{StationId, FIELD_DELIMITER};
use std::fmt;
use thiserror::Error;

/// Decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Periodic presence beacon from the transmitter
    Ping { device_id: String },
    /// Distress beacon from the transmitter
    Sos { device_id: String },
    /// A relay station's measurement of the transmitter's last beacon
    Report { station: StationId, rssi: i32 },
}

impl Message {
    pub fn ping(device_id: impl AsRef<str>) -> Self {
        Message::Ping {
            device_id: normalize_label(device_id.as_ref()),
        }
    }

    pub fn sos(device_id: impl AsRef<str>) -> Self {
        Message::Sos {
            device_id: normalize_label(device_id.as_ref()),
        }
    }

    pub fn report(station: impl Into<StationId>, rssi: i32) -> Self {
        Message::Report {
            station: station.into(),
            rssi,
        }
    }

    /// Device id carried by a beacon
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Message::Ping { device_id } | Message::Sos { device_id } => Some(device_id),
            Message::Report { .. } => None,
        }
    }

    pub fn is_beacon(&self) -> bool {
        matches!(self, Message::Ping { .. } | Message::Sos { .. })
    }

    pub fn is_distress(&self) -> bool {
        matches!(self, Message::Sos { .. })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Ping { device_id } => write!(f, "{}{}{}", KIND_PING, FIELD_DELIMITER, device_id),
            Message::Sos { device_id } => write!(f, "{}{}{}", KIND_SOS, FIELD_DELIMITER, device_id),
            Message::Report { station, rssi } => write!(
                f,
                "{}{}{}{}{}",
                KIND_REPORT, FIELD_DELIMITER, station, FIELD_DELIMITER, rssi
            ),
        }
    }
}

const KIND_PING: &str = "PING";
const KIND_SOS: &str = "SOS";
const KIND_REPORT: &str = "REPORT";

/// Errors that can occur while decoding a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty frame")]
    Empty,
    #[error("Frame is not valid UTF-8")]
    InvalidEncoding,
    #[error("{kind} needs {required} fields, got {available}")]
    InsufficientFields {
        kind: &'static str,
        required: usize,
        available: usize,
    },
    #[error("{kind} has an empty {field} field")]
    EmptyField { kind: &'static str, field: &'static str },
    #[error("Invalid RSSI field '{value}'")]
    InvalidRssi { value: String },
}

impl ParseError {
    /// Link-level garbage (nothing decodable), as opposed to a protocol violation
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, ParseError::Empty | ParseError::InvalidEncoding)
    }
}

/// Stateless codec between raw frames and [`Message`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        MessageParser
    }

    /// Decode a frame.
    ///
    /// Returns `Ok(None)` for well-formed frames of an unknown kind, which
    /// callers ignore without logging.
    pub fn parse_message(&self, data: &[u8]) -> Result<Option<Message>, ParseError> {
        let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidEncoding)?;
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let fields: Vec<&str> = text.split(FIELD_DELIMITER).map(str::trim).collect();

        match fields[0] {
            KIND_PING => {
                let device_id = Self::required_field(&fields, KIND_PING, 1, "device")?;
                Ok(Some(Message::Ping { device_id }))
            }
            KIND_SOS => {
                let device_id = Self::required_field(&fields, KIND_SOS, 1, "device")?;
                Ok(Some(Message::Sos { device_id }))
            }
            KIND_REPORT => {
                if fields.len() < 3 {
                    return Err(ParseError::InsufficientFields {
                        kind: KIND_REPORT,
                        required: 3,
                        available: fields.len(),
                    });
                }
                let station = Self::required_field(&fields, KIND_REPORT, 1, "station")?;
                let rssi = fields[2].parse::<i32>().map_err(|_| ParseError::InvalidRssi {
                    value: fields[2].to_string(),
                })?;
                Ok(Some(Message::Report {
                    station: StationId::new(station),
                    rssi,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Serialize a message into its wire frame
    pub fn encode(&self, message: &Message) -> Vec<u8> {
        message.to_string().into_bytes()
    }

    fn required_field(
        fields: &[&str],
        kind: &'static str,
        index: usize,
        name: &'static str,
    ) -> Result<String, ParseError> {
        let value = fields.get(index).ok_or(ParseError::InsufficientFields {
            kind,
            required: index + 1,
            available: fields.len(),
        })?;
        if value.is_empty() {
            return Err(ParseError::EmptyField { kind, field: name });
        }
        Ok(normalize_label(value))
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(frame: &str) -> Result<Option<Message>, ParseError> {
        MessageParser::new().parse_message(frame.as_bytes())
    }

    #[test]
    fn test_parse_ping_and_sos() {
        assert_eq!(parse("PING:DEV1").unwrap(), Some(Message::ping("DEV1")));
        assert_eq!(parse("SOS:dev001\r\n").unwrap(), Some(Message::sos("DEV001")));

        let sos = parse("SOS:DEV1").unwrap().unwrap();
        assert!(sos.is_beacon());
        assert!(sos.is_distress());
        assert_eq!(sos.device_id(), Some("DEV1"));
    }

    #[test]
    fn test_parse_report() {
        let message = parse("REPORT:station_b:-60").unwrap().unwrap();
        assert_eq!(
            message,
            Message::Report {
                station: StationId::new("STATION_B"),
                rssi: -60
            }
        );
        assert!(!message.is_beacon());
        assert_eq!(message.device_id(), None);
    }

    #[test]
    fn test_report_with_non_integer_rssi() {
        assert_eq!(
            parse("REPORT:ANCHOR_2:-6x"),
            Err(ParseError::InvalidRssi { value: "-6x".to_string() })
        );
        assert!(matches!(parse("REPORT:ANCHOR_2:-60.5"), Err(ParseError::InvalidRssi { .. })));
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            parse("REPORT:ANCHOR_2"),
            Err(ParseError::InsufficientFields {
                kind: "REPORT",
                required: 3,
                available: 2
            })
        );
        assert!(matches!(parse("PING"), Err(ParseError::InsufficientFields { .. })));
        assert_eq!(
            parse("SOS:"),
            Err(ParseError::EmptyField { kind: "SOS", field: "device" })
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        assert_eq!(parse("HELLO:WORLD").unwrap(), None);
        assert_eq!(parse("ping:DEV1").unwrap(), None);
    }

    #[test]
    fn test_transport_faults() {
        assert_eq!(parse("  \0"), Err(ParseError::Empty));
        let garbled = MessageParser::new().parse_message(&[0xff, 0xfe, 0x3a]);
        assert_eq!(garbled, Err(ParseError::InvalidEncoding));
        assert!(ParseError::Empty.is_transport_fault());
        assert!(!ParseError::InvalidRssi { value: String::new() }.is_transport_fault());
    }

    #[test]
    fn test_encode() {
        let parser = MessageParser::new();
        assert_eq!(parser.encode(&Message::ping("dev1")), b"PING:DEV1".to_vec());
        assert_eq!(
            parser.encode(&Message::report("anchor_3", -71)),
            b"REPORT:ANCHOR_3:-71".to_vec()
        );
    }
}
