use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk record of the last successfully installed build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalVersionRecord {
    #[serde(rename = "localVersion")]
    pub local_version: DateTime<Utc>,
}

/// Outcome of comparing the remote build timestamp with the local record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionCheck {
    pub remote: DateTime<Utc>,
    pub local: Option<DateTime<Utc>>,
}

impl VersionCheck {
    /// An update is offered when the remote build is strictly newer, or
    /// when nothing was ever installed. Equal timestamps launch directly.
    #[must_use]
    pub fn update_available(&self) -> bool {
        match self.local {
            Some(local) => self.remote > local,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("timestamp").with_timezone(&Utc)
    }

    #[test]
    fn newer_remote_offers_update() {
        let check = VersionCheck {
            remote: ts("2023-05-01T10:00:00Z"),
            local: Some(ts("2023-01-01T00:00:00Z")),
        };
        assert!(check.update_available());
    }

    #[test]
    fn equal_timestamps_do_not_offer_update() {
        let when = ts("2023-05-01T10:00:00Z");
        let check = VersionCheck {
            remote: when,
            local: Some(when),
        };
        assert!(!check.update_available());
    }

    #[test]
    fn older_remote_does_not_offer_update() {
        let check = VersionCheck {
            remote: ts("2023-01-01T00:00:00Z"),
            local: Some(ts("2023-05-01T10:00:00Z")),
        };
        assert!(!check.update_available());
    }

    #[test]
    fn missing_local_record_always_offers_update() {
        let check = VersionCheck {
            remote: ts("2023-05-01T10:00:00Z"),
            local: None,
        };
        assert!(check.update_available());
    }

    #[test]
    fn record_serializes_with_observed_field_name() {
        let record = LocalVersionRecord {
            local_version: Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"localVersion\""));

        let parsed: LocalVersionRecord = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed.local_version, record.local_version);
    }
}
