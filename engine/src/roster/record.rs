//! Aircraft records and the status reports that create or modify them.
//!

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::RosterError;

/// Status of an aircraft as kept in the roster.
///
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, Hash, PartialEq, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Start-up approved
    Stup,
    /// Push-back
    Push,
    /// Taxiing
    Taxi,
    /// Departure, lined-up or rolling
    Depa,
    Airborne,
}

impl Status {
    /// Only ground states can put an aircraft on the board.
    ///
    #[inline]
    pub fn is_ground(&self) -> bool {
        !matches!(self, Status::Airborne)
    }
}

/// What a report asks us to do.  `CLEAR` is an instruction, never a stored status.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Clear,
    Set(Status),
}

impl FromStr for Action {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLEAR" => Ok(Action::Clear),
            _ => Status::from_str(s)
                .map(Action::Set)
                .map_err(|_| RosterError::InvalidStatus(s.to_string())),
        }
    }
}

/// Flight plan data as sent by the plugin, opaque to us.
///
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlightPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squawk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Anything else the reporter wants to attach
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl FlightPlan {
    /// Overwrite every field present in `other`, keep the others.
    ///
    pub fn merge(&mut self, other: FlightPlan) {
        if other.sid.is_some() {
            self.sid = other.sid;
        }
        if other.squawk.is_some() {
            self.squawk = other.squawk;
        }
        if other.route.is_some() {
            self.route = other.route;
        }
        self.extra.extend(other.extra);
    }
}

/// Inbound status report, as received.  Nothing is trusted at this point.
///
/// ```json
/// {
///     "callsign": "BAW123",
///     "airport": "EGLL",
///     "status": "STUP",
///     "sid": "BPK7G",
///     "squawk": "1234",
///     "route": "BPK L620 DVR"
/// }
/// ```
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StatusReport {
    pub callsign: Option<String>,
    pub airport: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub plan: FlightPlan,
}

/// A report that went through validation.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub callsign: String,
    /// ICAO code, upper case
    pub airport: String,
    pub action: Action,
    pub plan: FlightPlan,
}

/// Keys of `AircraftRecord` a reporter can not override through the extra fields.
const RESERVED: &[&str] = &["callsign", "airport", "status", "timestamp"];

/// Empty strings are as good as missing.
///
fn required(field: Option<String>, name: &'static str) -> Result<String, RosterError> {
    match field {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(RosterError::MissingField(name)),
    }
}

impl StatusReport {
    pub fn new(callsign: &str, airport: &str, status: &str) -> Self {
        Self {
            callsign: Some(callsign.to_string()),
            airport: Some(airport.to_string()),
            status: Some(status.to_string()),
            plan: FlightPlan::default(),
        }
    }

    pub fn sid(mut self, sid: &str) -> Self {
        self.plan.sid = Some(sid.to_string());
        self
    }

    pub fn squawk(mut self, squawk: &str) -> Self {
        self.plan.squawk = Some(squawk.to_string());
        self
    }

    pub fn route(mut self, route: &str) -> Self {
        self.plan.route = Some(route.to_string());
        self
    }

    pub fn validate(self) -> Result<Update, RosterError> {
        let callsign = required(self.callsign, "callsign")?;
        let airport = required(self.airport, "airport")?.to_uppercase();
        let action = Action::from_str(&required(self.status, "status")?)?;

        let mut plan = self.plan;
        plan.extra.retain(|k, _| !RESERVED.contains(&k.as_str()));

        Ok(Update {
            callsign,
            airport,
            action,
            plan,
        })
    }
}

/// One aircraft on the departure board.
///
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AircraftRecord {
    pub callsign: String,
    pub airport: String,
    pub status: Status,
    #[serde(flatten)]
    pub plan: FlightPlan,
    /// Last time `status` changed
    #[serde(rename = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("STUP", Action::Set(Status::Stup))]
    #[case("PUSH", Action::Set(Status::Push))]
    #[case("TAXI", Action::Set(Status::Taxi))]
    #[case("DEPA", Action::Set(Status::Depa))]
    #[case("AIRBORNE", Action::Set(Status::Airborne))]
    #[case("CLEAR", Action::Clear)]
    fn test_action_from_str(#[case] inp: &str, #[case] out: Action) {
        assert_eq!(out, Action::from_str(inp).unwrap());
    }

    #[rstest]
    #[case("")]
    #[case("stup")]
    #[case("LANDED")]
    fn test_action_from_str_bad(#[case] inp: &str) {
        assert_eq!(
            Err(RosterError::InvalidStatus(inp.to_string())),
            Action::from_str(inp)
        );
    }

    #[test]
    fn test_report_from_json() {
        let data = r##"{"callsign":"BAW123","airport":"egll","status":"STUP","sid":"BPK7G",
            "squawk":"1234","route":"BPK L620 DVR","stand":"512"}"##;
        let r: StatusReport = serde_json::from_str(data).unwrap();
        let u = r.validate().unwrap();

        assert_eq!("BAW123", u.callsign);
        assert_eq!("EGLL", u.airport);
        assert_eq!(Action::Set(Status::Stup), u.action);
        assert_eq!(Some("BPK7G".to_string()), u.plan.sid);
        assert_eq!(Some("512"), u.plan.extra.get("stand").map(String::as_str));
    }

    #[rstest]
    #[case(StatusReport { callsign: None, ..StatusReport::new("X", "EGLL", "STUP") }, "callsign")]
    #[case(StatusReport::new("", "EGLL", "STUP"), "callsign")]
    #[case(StatusReport::new("BAW1", " ", "STUP"), "airport")]
    #[case(StatusReport { status: None, ..StatusReport::new("BAW1", "EGLL", "STUP") }, "status")]
    fn test_report_missing(#[case] r: StatusReport, #[case] field: &'static str) {
        assert_eq!(Err(RosterError::MissingField(field)), r.validate());
    }

    #[test]
    fn test_report_reserved_extra() {
        let data = r##"{"callsign":"BAW123","airport":"EGLL","status":"STUP",
            "timestamp":"yesterday","stand":"512"}"##;
        let r: StatusReport = serde_json::from_str(data).unwrap();
        let mut u = r.validate().unwrap();
        u.plan.extra.insert("status".to_string(), "LANDED".to_string());
        let u = StatusReport {
            callsign: Some(u.callsign),
            airport: Some(u.airport),
            status: Some("TAXI".to_string()),
            plan: u.plan,
        }
        .validate()
        .unwrap();

        assert_eq!(1, u.plan.extra.len());
        assert_eq!(Some("512"), u.plan.extra.get("stand").map(String::as_str));

        let rec = AircraftRecord {
            callsign: u.callsign,
            airport: u.airport,
            status: Status::Taxi,
            plan: u.plan,
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(1, json.matches(r##""timestamp""##).count());
        assert_eq!(1, json.matches(r##""status""##).count());
    }

    #[test]
    fn test_plan_merge() {
        let mut plan = FlightPlan {
            sid: Some("BPK7G".to_string()),
            squawk: Some("1234".to_string()),
            route: Some("BPK L620 DVR".to_string()),
            extra: BTreeMap::new(),
        };
        let upd = FlightPlan {
            squawk: Some("4521".to_string()),
            ..FlightPlan::default()
        };
        plan.merge(upd);

        assert_eq!(Some("BPK7G".to_string()), plan.sid);
        assert_eq!(Some("4521".to_string()), plan.squawk);
        assert_eq!(Some("BPK L620 DVR".to_string()), plan.route);
    }

    #[test]
    fn test_record_to_json() {
        let rec = AircraftRecord {
            callsign: "EZY12".to_string(),
            airport: "EGKK".to_string(),
            status: Status::Taxi,
            plan: FlightPlan {
                sid: Some("FRANE1M".to_string()),
                ..FlightPlan::default()
            },
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let v = serde_json::to_value(&rec).unwrap();

        assert_eq!("TAXI", v["status"]);
        assert_eq!("FRANE1M", v["sid"]);
        assert_eq!("2023-11-14T22:13:20Z", v["timestamp"]);
        assert!(v.get("squawk").is_none());
    }
}
