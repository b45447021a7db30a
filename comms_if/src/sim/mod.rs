//! # Simulator Interface
//!
//! The simulator speaks a socket.io style protocol over a websocket. Every message is a text frame
//! made up of a two character type prefix followed by a JSON array `[event_name, payload]`. The
//! `42` prefix marks an event message (`4` for a message, `2` for an event), all other prefixes are
//! transport housekeeping and are never answered.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod steer;
mod telemetry;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use steer::*;
pub use telemetry::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix of a socket.io event message.
pub const EVENT_PREFIX: &str = "42";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound actuation event.
pub const STEER_EVENT: &str = "steer";

/// Complete frame sent back when there is no telemetry to act upon, giving control of the vehicle
/// back to the simulator.
pub const MANUAL_FRAME: &str = "42[\"manual\",{}]";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An inbound message after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// The message was not a socket.io event, no reply shall be sent.
    NotEvent,

    /// An event carrying no data, meaning the simulator is being driven manually.
    NoTelemetry,

    /// A telemetry event.
    Telemetry(TelemetryFrame),

    /// A well formed event with a name other than `telemetry`.
    Other(String),
}

/// Errors which can occur while decoding an inbound message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Event data is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Event data is not an array starting with the event name")]
    NotAnEventArray,

    #[error("Telemetry payload does not match the expected schema: {0}")]
    InvalidTelemetry(serde_json::Error),

    #[error("Telemetry has {ptsx} x coordinates but {ptsy} y coordinates")]
    MismatchedWaypoints {
        ptsx: usize,
        ptsy: usize
    },
}

/// Errors which can occur while encoding an outbound message.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Could not serialize the payload: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode one raw message received from the simulator.
pub fn decode_frame(raw: &str) -> Result<SimEvent, DecodeError> {
    // Only event messages are of interest
    if raw.len() <= EVENT_PREFIX.len() || !raw.starts_with(EVENT_PREFIX) {
        return Ok(SimEvent::NotEvent)
    }

    // Get the data span, if there isn't one the simulator is in manual mode
    let data = match extract_data(raw) {
        Some(d) => d,
        None => return Ok(SimEvent::NoTelemetry)
    };

    let mut value: serde_json::Value = serde_json::from_str(data)
        .map_err(DecodeError::InvalidJson)?;

    // Event name is the first element of the array
    let event_name = match value.get(0).and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => return Err(DecodeError::NotAnEventArray)
    };

    if event_name != TELEMETRY_EVENT {
        return Ok(SimEvent::Other(event_name))
    }

    // Take the payload out of the array rather than cloning it
    let payload = match value.get_mut(1) {
        Some(p) => p.take(),
        None => serde_json::Value::Null
    };

    let frame: TelemetryFrame = serde_json::from_value(payload)
        .map_err(DecodeError::InvalidTelemetry)?;

    if frame.ptsx.len() != frame.ptsy.len() {
        return Err(DecodeError::MismatchedWaypoints {
            ptsx: frame.ptsx.len(),
            ptsy: frame.ptsy.len()
        })
    }

    Ok(SimEvent::Telemetry(frame))
}

/// Find the JSON data carried by an event message.
///
/// Any message containing `null` carries no data. Otherwise the data runs from the first `[` to
/// the last `}]` inclusive. `None` is returned when there is no data.
pub fn extract_data(raw: &str) -> Option<&str> {
    if raw.contains("null") {
        return None
    }

    let start = raw.find('[')?;
    let end = raw.rfind("}]")?;

    // A closing span before the opening bracket can't be an array
    if end < start {
        return None
    }

    Some(&raw[start..end + 2])
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TWO_POINT_TELEMETRY: &str = "42[\"telemetry\",{\"ptsx\":[0,10],\"ptsy\":[0,0],\"x\":0,\
        \"y\":0,\"psi\":0,\"speed\":0,\"steering_angle\":0,\"throttle\":0}]";

    #[test]
    fn test_decode_telemetry() {
        let frame = match decode_frame(TWO_POINT_TELEMETRY).unwrap() {
            SimEvent::Telemetry(f) => f,
            e => panic!("Expected telemetry, got {:?}", e)
        };

        assert_eq!(frame.ptsx, vec![0.0, 10.0]);
        assert_eq!(frame.ptsy, vec![0.0, 0.0]);
        assert_eq!(frame.num_waypoints(), 2);
        assert_eq!(frame.speed, 0.0);
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let raw = "42[\"telemetry\",{\"ptsx\":[1,2,3,4],\"ptsy\":[1,2,3,4],\"x\":1.5,\
            \"y\":-2,\"psi\":3.1,\"psi_unity\":4.5,\"speed\":20.5,\"steering_angle\":-0.1,\
            \"throttle\":0.3}]";

        match decode_frame(raw).unwrap() {
            SimEvent::Telemetry(f) => {
                assert_eq!(f.x, 1.5);
                assert_eq!(f.y, -2.0);
                assert_eq!(f.psi, 3.1);
                assert_eq!(f.steering_angle, -0.1);
                assert_eq!(f.throttle, 0.3);
            },
            e => panic!("Expected telemetry, got {:?}", e)
        }
    }

    #[test]
    fn test_decode_no_telemetry() {
        assert_eq!(decode_frame("42[\"telemetry\",null]").unwrap(), SimEvent::NoTelemetry);
        assert_eq!(decode_frame("42[\"manual\",{}").unwrap(), SimEvent::NoTelemetry);
        assert_eq!(decode_frame("42hello").unwrap(), SimEvent::NoTelemetry);
    }

    #[test]
    fn test_decode_not_event() {
        assert_eq!(decode_frame("2").unwrap(), SimEvent::NotEvent);
        assert_eq!(decode_frame("42").unwrap(), SimEvent::NotEvent);
        assert_eq!(decode_frame("40[\"telemetry\",{}]").unwrap(), SimEvent::NotEvent);
    }

    #[test]
    fn test_decode_other_event() {
        assert_eq!(
            decode_frame("42[\"reset\",{\"a\":1}]").unwrap(),
            SimEvent::Other("reset".into())
        );

        // The manual fallback is itself a well formed event
        assert_eq!(decode_frame(MANUAL_FRAME).unwrap(), SimEvent::Other("manual".into()));
    }

    #[test]
    fn test_decode_errors() {
        // Missing speed
        let raw = "42[\"telemetry\",{\"ptsx\":[0,10],\"ptsy\":[0,0],\"x\":0,\"y\":0,\"psi\":0,\
            \"steering_angle\":0,\"throttle\":0}]";
        assert!(matches!(decode_frame(raw), Err(DecodeError::InvalidTelemetry(_))));

        // Non numeric field
        let raw = "42[\"telemetry\",{\"ptsx\":[0,10],\"ptsy\":[0,0],\"x\":\"a\",\"y\":0,\
            \"psi\":0,\"speed\":0,\"steering_angle\":0,\"throttle\":0}]";
        assert!(matches!(decode_frame(raw), Err(DecodeError::InvalidTelemetry(_))));

        // Mismatched waypoints
        let raw = "42[\"telemetry\",{\"ptsx\":[0,10,20],\"ptsy\":[0,0],\"x\":0,\"y\":0,\
            \"psi\":0,\"speed\":0,\"steering_angle\":0,\"throttle\":0}]";
        assert!(matches!(
            decode_frame(raw),
            Err(DecodeError::MismatchedWaypoints { ptsx: 3, ptsy: 2 })
        ));

        // Broken JSON inside the span
        assert!(matches!(
            decode_frame("42[\"telemetry\",{\"x\":}]"),
            Err(DecodeError::InvalidJson(_))
        ));

        // Not an event array
        assert!(matches!(decode_frame("42[{\"x\":1}]"), Err(DecodeError::NotAnEventArray)));
    }

    #[test]
    fn test_extract_data() {
        assert_eq!(extract_data("42[\"a\",{}]"), Some("[\"a\",{}]"));
        assert_eq!(extract_data("42[\"a\",{}]trailing"), Some("[\"a\",{}]"));
        assert_eq!(extract_data("42[\"a\",null]"), None);
        assert_eq!(extract_data("42}][\"a\""), None);
        assert_eq!(extract_data("42\"a\",{}"), None);
    }
}
