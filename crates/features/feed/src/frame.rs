//! The `{type, data}` JSON envelope carried over the feed socket.

use crate::error::{FeedError, FeedErrorExt};
use bloom_domain::feed::{BookingConflict, BookingUpdate, CapacityInfo, FeedStats};
use serde::{Deserialize, Serialize};

/// One feed message. The discriminator travels in `type`, the payload in
/// `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedFrame {
    /// Client hello: names the salon the subscriber wants to follow.
    Auth { salon_id: String },
    /// A booking changed.
    BookingUpdate(BookingUpdate),
    /// Two bookings collided.
    Conflict(BookingConflict),
    /// Utilization snapshot for the salon day.
    Capacity(CapacityInfo),
    /// Rolling counters for the current day.
    Stats(FeedStats),
}

impl FeedFrame {
    /// Encodes the frame for the wire.
    ///
    /// # Errors
    /// Returns [`FeedError::Codec`] if serialization fails.
    pub fn to_text(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).context("Encoding feed frame")
    }

    /// Decodes a frame from wire text.
    ///
    /// # Errors
    /// Returns [`FeedError::Codec`] for malformed or unknown frames.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        serde_json::from_str(text).context("Decoding feed frame")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_domain::feed::UpdateKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn frames_use_the_type_data_envelope() {
        let frame = FeedFrame::Auth { salon_id: "salon:a".into() };
        let text = frame.to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["type"], "auth");
        assert_eq!(value["data"]["salonId"], "salon:a");
    }

    #[test]
    fn update_frames_round_trip() {
        let frame = FeedFrame::BookingUpdate(BookingUpdate {
            kind: UpdateKind::Created,
            appointment_id: "appointment:1".into(),
            salon_id: "salon:a".into(),
            staff_id: None,
            date: None,
            slot: None,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
        });

        let text = frame.to_text().unwrap();
        assert!(text.contains("\"type\":\"booking_update\""));
        assert!(text.contains("\"kind\":\"created\""));

        assert_eq!(FeedFrame::parse(&text).unwrap(), frame);
    }

    #[test]
    fn unknown_frame_types_are_rejected() {
        let err = FeedFrame::parse(r#"{"type":"mystery","data":{}}"#).unwrap_err();
        assert!(matches!(err, FeedError::Codec { .. }));
    }
}
