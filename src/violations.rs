//! Policy violation classification.
//!
//! Pure classification over an already-produced event sequence plus a rule
//! table. Rules are evaluated independently: a single event may yield zero,
//! one, or several violations.

use crate::events::{GeofenceEvent, GeofenceEventType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The rule table supplied by the policy source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRules {
    /// Zones a device must not enter.
    #[serde(default)]
    pub restricted_zones: Vec<String>,
    /// Zones a device must not leave.
    #[serde(default)]
    pub required_zones: Vec<String>,
    /// Per-zone speed limits in km/h.
    #[serde(default)]
    pub speed_limits: HashMap<String, f64>,
}

/// Classification of a rule breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationType {
    UnauthorizedEntry,
    UnauthorizedExit,
    SpeedViolation,
}

/// Violation severity, totally ordered so callers can fold to a maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A policy violation derived from a geofence event.
///
/// Carries the triggering event in full (flattened on the wire) so the
/// alerting collaborator needs no secondary lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(flatten)]
    pub event: GeofenceEvent,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub message: String,
}

/// Classify events against the rule table.
///
/// - Entry into a restricted zone → [`ViolationType::UnauthorizedEntry`], high severity.
/// - Exit from a required zone → [`ViolationType::UnauthorizedExit`], medium severity.
/// - Any event whose sample speed exceeds the zone's limit →
///   [`ViolationType::SpeedViolation`], medium severity, with the observed and
///   limit values in the message.
///
/// Events for zones with no applicable rules produce nothing; empty inputs
/// produce an empty list.
pub fn detect_violations(events: &[GeofenceEvent], rules: &ViolationRules) -> Vec<Violation> {
    let mut violations = Vec::new();

    for event in events {
        let zone = event.geofence_id.as_str();

        if event.event_type == GeofenceEventType::Entry
            && rules.restricted_zones.iter().any(|z| z == zone)
        {
            violations.push(Violation {
                event: event.clone(),
                violation_type: ViolationType::UnauthorizedEntry,
                severity: Severity::High,
                message: format!("Unauthorized entry into restricted zone '{}'", event.geofence_name),
            });
        }

        if event.event_type == GeofenceEventType::Exit
            && rules.required_zones.iter().any(|z| z == zone)
        {
            violations.push(Violation {
                event: event.clone(),
                violation_type: ViolationType::UnauthorizedExit,
                severity: Severity::Medium,
                message: format!("Unauthorized exit from required zone '{}'", event.geofence_name),
            });
        }

        if let (Some(speed), Some(&limit)) = (event.point.speed_kmh, rules.speed_limits.get(zone)) {
            if speed > limit {
                violations.push(Violation {
                    event: event.clone(),
                    violation_type: ViolationType::SpeedViolation,
                    severity: Severity::Medium,
                    message: format!(
                        "Speed {speed:.1} km/h exceeds limit {limit:.1} km/h in zone '{}'",
                        event.geofence_name
                    ),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryPoint;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, min, 0).unwrap()
    }

    fn event(zone: &str, event_type: GeofenceEventType, speed: Option<f64>) -> GeofenceEvent {
        let mut point = TelemetryPoint::new(40.7128, -74.0060, ts(1));
        point.speed_kmh = speed;
        GeofenceEvent {
            id: format!("{zone}-{}-{}", event_type.as_str(), ts(1).timestamp_millis()),
            event_type,
            geofence_id: zone.to_string(),
            geofence_name: zone.to_string(),
            point,
            timestamp: ts(1),
        }
    }

    fn rules() -> ViolationRules {
        ViolationRules {
            restricted_zones: vec!["military".to_string()],
            required_zones: vec!["depot".to_string()],
            speed_limits: HashMap::from([("depot".to_string(), 30.0)]),
        }
    }

    #[test]
    fn test_restricted_entry_is_high_severity() {
        let events = vec![event("military", GeofenceEventType::Entry, None)];
        let violations = detect_violations(&events, &rules());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::UnauthorizedEntry);
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn test_restricted_exit_is_not_flagged() {
        let events = vec![event("military", GeofenceEventType::Exit, None)];
        assert!(detect_violations(&events, &rules()).is_empty());
    }

    #[test]
    fn test_required_exit_is_medium_severity() {
        let events = vec![event("depot", GeofenceEventType::Exit, None)];
        let violations = detect_violations(&events, &rules());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::UnauthorizedExit);
        assert_eq!(violations[0].severity, Severity::Medium);
    }

    #[test]
    fn test_speed_violation_includes_observed_and_limit() {
        let events = vec![event("depot", GeofenceEventType::Entry, Some(45.0))];
        let violations = detect_violations(&events, &rules());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::SpeedViolation);
        assert!(violations[0].message.contains("45.0"));
        assert!(violations[0].message.contains("30.0"));
    }

    #[test]
    fn test_at_limit_speed_is_not_a_violation() {
        let events = vec![event("depot", GeofenceEventType::Entry, Some(30.0))];
        assert!(detect_violations(&events, &rules()).is_empty());
    }

    #[test]
    fn test_one_event_can_break_multiple_rules() {
        // Exiting a zone that is both required and speed-limited, while speeding.
        let events = vec![event("depot", GeofenceEventType::Exit, Some(80.0))];
        let violations = detect_violations(&events, &rules());

        assert_eq!(violations.len(), 2);
        let types: Vec<_> = violations.iter().map(|v| v.violation_type).collect();
        assert!(types.contains(&ViolationType::UnauthorizedExit));
        assert!(types.contains(&ViolationType::SpeedViolation));
    }

    #[test]
    fn test_unlisted_zone_produces_nothing() {
        let events = vec![event("elsewhere", GeofenceEventType::Entry, Some(200.0))];
        assert!(detect_violations(&events, &rules()).is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(detect_violations(&[], &rules()).is_empty());
        let events = vec![event("military", GeofenceEventType::Entry, None)];
        assert_eq!(detect_violations(&events, &ViolationRules::default()).len(), 0);
    }

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        let max = [Severity::Low, Severity::High, Severity::Medium]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(max, Severity::High);
    }

    #[test]
    fn test_rules_deserialize_camel_case() {
        let json = r#"{
            "restrictedZones": ["military"],
            "requiredZones": ["depot"],
            "speedLimits": {"depot": 30.0}
        }"#;
        let parsed: ViolationRules = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.restricted_zones, vec!["military"]);
        assert_eq!(parsed.speed_limits["depot"], 30.0);
    }
}
