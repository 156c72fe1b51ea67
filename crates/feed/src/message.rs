//! The journal feed message shape.
//!
//! Messages arrive as JSON envelopes: a schema reference, an uploader
//! header and the journal body. Only `journal/1` messages are interpreted;
//! everything else is archived and dropped.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The schema suffix of interpretable messages.
pub const JOURNAL_SCHEMA: &str = "journal/1";

/// Station type marking a fleet carrier.
pub const FLEET_CARRIER: &str = "FleetCarrier";

/// One decoded feed message.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Schema reference URL; the suffix names the schema and version.
    #[serde(rename = "$schemaRef")]
    pub schema_ref: String,
    /// Uploader metadata.
    pub header: Header,
    /// The journal body.
    pub message: Journal,
}

impl Envelope {
    /// Whether this message carries the journal schema we interpret.
    pub fn is_journal(&self) -> bool {
        self.schema_ref.ends_with(JOURNAL_SCHEMA)
    }
}

/// Uploader metadata of an envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Client software that uploaded the message.
    #[serde(rename = "softwareName", default)]
    pub software_name: String,
    /// When the gateway received it.
    #[serde(rename = "gatewayTimestamp")]
    pub gateway_timestamp: DateTime<Utc>,
}

/// The journal body. Only the fields the ingester correlates on are
/// decoded; the rest rides along in the archive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Journal {
    /// Journal event name, e.g. `Location`.
    #[serde(default)]
    pub event: String,
    /// System the event happened in.
    #[serde(rename = "StarSystem", default)]
    pub star_system: String,
    /// Station involved; carries the carrier id for carrier events.
    #[serde(rename = "StationName", default)]
    pub station_name: String,
    /// Station classification.
    #[serde(rename = "StationType", default)]
    pub station_type: String,
}

impl Journal {
    /// Whether the event places something in a system.
    pub fn is_location_event(&self) -> bool {
        matches!(self.event.as_str(), "Location" | "Docked" | "CarrierJump")
    }

    /// The carrier id, when the event involves a fleet carrier.
    pub fn carrier_id(&self) -> Option<&str> {
        (self.station_type == FLEET_CARRIER && !self.station_name.is_empty())
            .then_some(self.station_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARRIER_MSG: &str = r#"{
        "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
        "header": {
            "gatewayTimestamp": "2020-08-03T11:03:25.661784Z",
            "softwareName": "E:D Market Connector [Windows]"
        },
        "message": {
            "event": "Location",
            "StarSystem": "Rana",
            "StationName": "ABC-123",
            "StationType": "FleetCarrier",
            "Docked": true
        }
    }"#;

    #[test]
    fn carrier_envelope_decodes() {
        let envelope: Envelope = serde_json::from_str(CARRIER_MSG).unwrap();
        assert!(envelope.is_journal());
        assert!(envelope.message.is_location_event());
        assert_eq!(envelope.message.carrier_id(), Some("ABC-123"));
        assert_eq!(envelope.message.star_system, "Rana");
        assert_eq!(envelope.header.software_name, "E:D Market Connector [Windows]");
    }

    #[test]
    fn other_schemas_are_not_journal() {
        let raw = r#"{
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "header": {"gatewayTimestamp": "2020-08-03T11:03:25Z"},
            "message": {}
        }"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(!envelope.is_journal());
    }

    #[test]
    fn non_carrier_station_has_no_id() {
        let journal = Journal {
            event: "Docked".into(),
            star_system: "Ahemakino".into(),
            station_name: "Bowen City".into(),
            station_type: "Coriolis".into(),
        };
        assert!(journal.is_location_event());
        assert_eq!(journal.carrier_id(), None);
    }
}
