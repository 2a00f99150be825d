//! Turn a parsed METAR into what the departure board displays.
//!
//! Most of the work is derived rather than parsed: visibility class, CAVOK, Low Visibility
//! Procedures state and QFE.
//!

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::trace;

use crate::{CloudType, Cover, Metar, SkyLayer, WeatherError};

/// At or above this, visibility is reported as "10KM+".
const VIS_MAX: f64 = 9_999.;
/// Visibility below or at which we are in LVP.
const LVP_ON_VIS: f64 = 600.;
/// Visibility below or at which LVP are being prepared.
const LVP_SAFE_VIS: f64 = 1_500.;
/// Ceiling (ft) below or at which we are in LVP.
const LVP_ON_CEILING: u32 = 200;
/// Ceiling (ft) below or at which LVP are being prepared.
const LVP_SAFE_CEILING: u32 = 300;
/// No cloud below this (ft) for CAVOK.
const CAVOK_CEILING: u32 = 5_000;

/// Low Visibility Procedures state, ordered so that the worst wins.
///
#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, Eq, Ord, PartialEq, PartialOrd, Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Lvp {
    #[default]
    Off,
    Safe,
    On,
}

impl Lvp {
    /// LVP state from visibility (m) and ceiling (ft), each one can only raise the state.
    ///
    pub fn classify(visibility: Option<f64>, ceiling: Option<u32>) -> Lvp {
        let by_vis = match visibility {
            Some(v) if v <= LVP_ON_VIS => Lvp::On,
            Some(v) if v <= LVP_SAFE_VIS => Lvp::Safe,
            _ => Lvp::Off,
        };
        let by_ceiling = match ceiling {
            Some(c) if c <= LVP_ON_CEILING => Lvp::On,
            Some(c) if c <= LVP_SAFE_CEILING => Lvp::Safe,
            _ => Lvp::Off,
        };
        by_vis.max(by_ceiling)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WindInfo {
    pub direction: Option<u16>,
    /// kt
    pub speed: Option<u32>,
    /// kt
    pub gust: Option<u32>,
    pub variable_from: Option<u16>,
    pub variable_to: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CloudLayer {
    pub cover: Cover,
    /// ft
    pub height: u32,
}

/// Decoded weather for one airport.
///
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub raw: String,
    pub airport: String,
    /// Time of issue, "HHMM"
    pub toi: Option<String>,
    pub cavok: bool,
    pub wind: WindInfo,
    /// "10KM+", "4KM", "800M"
    pub visibility: Option<String>,
    /// Present weather groups, space separated
    pub weather: Option<String>,
    pub clouds: Vec<CloudLayer>,
    /// °C
    pub temp: Option<i32>,
    /// °C
    pub dewpoint: Option<i32>,
    /// "1013hPa"
    pub qnh: Option<String>,
    /// "1010hPa"
    pub qfe: Option<String>,
    pub lvp: Lvp,
}

/// Bucket a visibility in metres.
///
pub fn visibility_class(metres: f64) -> String {
    if metres >= VIS_MAX {
        "10KM+".to_string()
    } else if metres > 1_000. {
        format!("{}KM", (metres / 1_000.).floor() as u32)
    } else {
        format!("{}M", metres.floor() as u32)
    }
}

/// Lowest broken or overcast layer, other layers never count.
///
pub fn ceiling(sky: &[SkyLayer]) -> Option<u32> {
    sky.iter()
        .filter(|l| l.cover.is_ceiling())
        .filter_map(|l| l.height)
        .min()
}

/// Ceiling and visibility OK: 10 km or more, no CB/TCU, nothing below 5000 ft and no weather.
///
pub fn is_cavok(visibility: Option<f64>, sky: &[SkyLayer], weather: &[String]) -> bool {
    let vis_ok = visibility.is_some_and(|v| v >= VIS_MAX);
    let no_convection = !sky
        .iter()
        .any(|l| matches!(l.kind, Some(CloudType::Cb) | Some(CloudType::Tcu)));
    let no_low_cloud = !sky
        .iter()
        .any(|l| l.cover != Cover::Ncd && l.height.is_some_and(|h| h < CAVOK_CEILING));

    vis_ok && no_convection && no_low_cloud && weather.is_empty()
}

/// Field pressure from QNH (hPa), temperature (°C) and elevation (ft).
///
pub fn qfe(qnh: f64, temperature: i32, elevation: i32) -> u32 {
    let elevation = elevation as f64 * 0.3048;
    let kelvin = temperature as f64 + 273.15;

    (qnh * (1. - 0.0065 * elevation / kelvin).powf(5.2561)).round() as u32
}

/// Decode a raw METAR.  Without an elevation, there is no QFE.
///
#[tracing::instrument]
pub fn decode(raw: &str, elevation: Option<i32>) -> Result<WeatherSnapshot, WeatherError> {
    let raw = raw.trim();
    let m = Metar::parse(raw)?;

    let cavok = is_cavok(m.visibility, &m.sky, &m.weather);
    let lvp = Lvp::classify(m.visibility, ceiling(&m.sky));
    trace!("cavok={cavok} lvp={lvp}");

    let (visibility, clouds, weather) = if cavok {
        (None, vec![], None)
    } else {
        let clouds = m
            .sky
            .iter()
            .filter_map(|l| {
                l.height.map(|height| CloudLayer {
                    cover: l.cover,
                    height,
                })
            })
            .collect();
        let weather = (!m.weather.is_empty()).then(|| m.weather.join(" "));
        (m.visibility.map(visibility_class), clouds, weather)
    };

    let wind = match m.wind {
        Some(w) => WindInfo {
            direction: w.direction,
            speed: Some(w.speed),
            gust: w.gust,
            variable_from: m.variable.map(|v| v.0),
            variable_to: m.variable.map(|v| v.1),
        },
        None => WindInfo::default(),
    };

    let qfe = match (m.pressure, m.temperature, elevation) {
        (Some(p), Some(t), Some(e)) => Some(format!("{}hPa", qfe(p, t, e))),
        _ => None,
    };

    Ok(WeatherSnapshot {
        raw: raw.to_string(),
        airport: m.station,
        toi: m.time.map(|t| format!("{:02}{:02}", t.hour, t.minute)),
        cavok,
        wind,
        visibility,
        weather,
        clouds,
        temp: m.temperature,
        dewpoint: m.dewpoint,
        qnh: m.pressure.map(|p| format!("{}hPa", p.floor() as u32)),
        qfe,
        lvp,
    })
}
