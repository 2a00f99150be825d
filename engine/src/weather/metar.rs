//! METAR grammar.
//!
//! A report is split on whitespace and every group is matched by a small `nom` parser.  The
//! header (optional type, station, issue time) is mandatory, body groups are accepted in any
//! order.  Parsing stops at the first trend or remark group.
//!
//! Groups we know about but do not use (RVR, recent weather, wind shear, secondary
//! visibility) are skipped.  Anything else is an error.
//!

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{alpha1, char, digit1, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, rest, value, verify};
use nom::multi::many0;
use nom::sequence::{pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, trace};

use crate::WeatherError;

/// 1 statute mile in metres
const STATUTE_MILE: f64 = 1_609.344;
/// 1 inch of mercury in hPa
const INHG_TO_HPA: f64 = 33.863_9;
/// 1 m/s in knots
const MPS_TO_KT: f64 = 1.943_844;
/// 1 kt in km/h
const KT_TO_KMH: f64 = 1.852;

/// Markers after which nothing describes the current observation.
const END_MARKERS: &[&str] = &["NOSIG", "BECMG", "TEMPO", "RMK", "INTER", "PROB30", "PROB40"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IssueTime {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// Wind, speeds in knots.  `direction` is `None` for variable wind.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Wind {
    pub direction: Option<u16>,
    pub speed: u32,
    pub gust: Option<u32>,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Cover {
    Few,
    Sct,
    Bkn,
    Ovc,
    /// Vertical visibility, sky obscured
    Vv,
    /// No significant cloud
    Nsc,
    /// No cloud detected
    Ncd,
    Skc,
    Clr,
}

impl Cover {
    /// Only broken and overcast layers make a ceiling.
    ///
    #[inline]
    pub fn is_ceiling(&self) -> bool {
        matches!(self, Cover::Bkn | Cover::Ovc)
    }
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudType {
    Cb,
    Tcu,
}

/// One sky group, height in feet.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SkyLayer {
    pub cover: Cover,
    pub height: Option<u32>,
    pub kind: Option<CloudType>,
}

/// What the grammar gives us, before any interpretation.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metar {
    pub station: String,
    pub time: Option<IssueTime>,
    pub auto: bool,
    pub wind: Option<Wind>,
    /// Variable sector, from/to
    pub variable: Option<(u16, u16)>,
    /// Prevailing visibility in metres, `CAVOK` is 10 km
    pub visibility: Option<f64>,
    pub cavok: bool,
    /// Present weather groups as reported, e.g. `-SHRA`
    pub weather: Vec<String>,
    pub sky: Vec<SkyLayer>,
    /// °C
    pub temperature: Option<i32>,
    /// °C
    pub dewpoint: Option<i32>,
    /// hPa
    pub pressure: Option<f64>,
}

/// One recognised body group.
///
#[derive(Clone, Debug, PartialEq)]
enum Group {
    Wind(Option<Wind>),
    Variable(u16, u16),
    Visibility(f64),
    Cavok,
    Sky(Option<SkyLayer>),
    Weather(String),
    Temperature(Option<i32>, Option<i32>),
    Pressure(Option<f64>),
    Skip,
}

fn number<'a, T: FromStr>(min: usize, max: usize) -> impl FnMut(&'a str) -> IResult<&'a str, T> {
    map_res(
        take_while_m_n(min, max, |c: char| c.is_ascii_digit()),
        str::parse::<T>,
    )
}

fn station(input: &str) -> IResult<&str, &str> {
    verify(
        take_while_m_n(4, 4, |c: char| c.is_ascii_alphanumeric()),
        |s: &str| s.starts_with(|c: char| c.is_ascii_uppercase()),
    )(input)
}

fn issue_time(input: &str) -> IResult<&str, IssueTime> {
    map(
        terminated(tuple((number(2, 2), number(2, 2), number(2, 2))), char('Z')),
        |(day, hour, minute)| IssueTime { day, hour, minute },
    )(input)
}

fn wind(input: &str) -> IResult<&str, Group> {
    let direction = alt((value(None, tag("VRB")), map(number::<u16>(3, 3), Some)));
    let speed = number::<u32>(2, 3);
    let gust = opt(preceded(char('G'), number::<u32>(2, 3)));
    let unit = alt((tag("KT"), tag("MPS"), tag("KMH")));

    alt((
        value(Group::Wind(None), tag("/////KT")),
        map(
            tuple((direction, speed, gust, unit)),
            |(direction, speed, gust, unit)| {
                let kt = |v: u32| match unit {
                    "MPS" => (v as f64 * MPS_TO_KT).round() as u32,
                    "KMH" => (v as f64 / KT_TO_KMH).round() as u32,
                    _ => v,
                };
                Group::Wind(Some(Wind {
                    direction,
                    speed: kt(speed),
                    gust: gust.map(kt),
                }))
            },
        ),
    ))(input)
}

fn variable(input: &str) -> IResult<&str, Group> {
    map(
        separated_pair(number::<u16>(3, 3), char('V'), number::<u16>(3, 3)),
        |(from, to)| Group::Variable(from, to),
    )(input)
}

fn fraction(input: &str) -> IResult<&str, f64> {
    map(
        separated_pair(number::<u32>(1, 2), char('/'), number::<u32>(1, 2)),
        |(n, d)| if d == 0 { 0. } else { n as f64 / d as f64 },
    )(input)
}

/// Statute miles: `10SM`, `1/2SM`, `1 1/2SM` (glued back by the tokenizer), `M1/4SM`, `P6SM`.
///
fn miles(input: &str) -> IResult<&str, f64> {
    let whole_and_fraction = map(
        separated_pair(number::<u32>(1, 2), char(' '), fraction),
        |(w, f)| w as f64 + f,
    );
    let whole = map(number::<u32>(1, 2), |w| w as f64);

    map(
        terminated(
            preceded(opt(one_of("MP")), alt((whole_and_fraction, fraction, whole))),
            tag("SM"),
        ),
        |sm| sm * STATUTE_MILE,
    )(input)
}

fn direction(input: &str) -> IResult<&str, &str> {
    alt((
        tag("NDV"),
        tag("NE"),
        tag("NW"),
        tag("SE"),
        tag("SW"),
        tag("N"),
        tag("E"),
        tag("S"),
        tag("W"),
    ))(input)
}

/// Prevailing visibility.  `////` (not measured) and a lone `NDV` carry nothing.
///
fn visibility(input: &str) -> IResult<&str, Group> {
    alt((
        value(Group::Cavok, tag("CAVOK")),
        value(Group::Skip, alt((tag("////"), tag("NDV")))),
        map(terminated(number::<u32>(4, 4), opt(direction)), |m| {
            Group::Visibility(m as f64)
        }),
        map(miles, Group::Visibility),
    ))(input)
}

/// Runway visual range, e.g. `R27L/0600U`, also runway state groups.
///
fn runway(input: &str) -> IResult<&str, Group> {
    value(
        Group::Skip,
        tuple((char('R'), digit1, opt(alpha1), char('/'), rest)),
    )(input)
}

fn cover(input: &str) -> IResult<&str, Cover> {
    alt((
        value(Cover::Few, tag("FEW")),
        value(Cover::Sct, tag("SCT")),
        value(Cover::Bkn, tag("BKN")),
        value(Cover::Ovc, tag("OVC")),
    ))(input)
}

fn cloud_type(input: &str) -> IResult<&str, Option<CloudType>> {
    alt((
        value(Some(CloudType::Cb), tag("CB")),
        value(Some(CloudType::Tcu), tag("TCU")),
        value(None, tag("///")),
    ))(input)
}

fn height(input: &str) -> IResult<&str, Option<u32>> {
    alt((
        map(number::<u32>(3, 3), |h| Some(h * 100)),
        value(None, tag("///")),
    ))(input)
}

fn sky(input: &str) -> IResult<&str, Group> {
    let layer = map(
        tuple((cover, height, opt(cloud_type))),
        |(cover, height, kind)| {
            Group::Sky(Some(SkyLayer {
                cover,
                height,
                kind: kind.flatten(),
            }))
        },
    );
    let vertical = map(preceded(tag("VV"), height), |height| {
        Group::Sky(Some(SkyLayer {
            cover: Cover::Vv,
            height,
            kind: None,
        }))
    });
    let clear = map(
        alt((
            value(Cover::Nsc, tag("NSC")),
            value(Cover::Ncd, tag("NCD")),
            value(Cover::Skc, tag("SKC")),
            value(Cover::Clr, tag("CLR")),
        )),
        |cover| {
            Group::Sky(Some(SkyLayer {
                cover,
                height: None,
                kind: None,
            }))
        },
    );
    // Automatic stations not able to tell anything
    let unknown = value(
        Group::Sky(None),
        pair(tag("//////"), opt(cloud_type)),
    );

    alt((layer, vertical, clear, unknown))(input)
}

fn descriptor(input: &str) -> IResult<&str, &str> {
    alt((
        tag("MI"),
        tag("PR"),
        tag("BC"),
        tag("DR"),
        tag("BL"),
        tag("SH"),
        tag("TS"),
        tag("FZ"),
    ))(input)
}

fn phenomenon(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("DZ"),
            tag("RA"),
            tag("SN"),
            tag("SG"),
            tag("IC"),
            tag("PL"),
            tag("GR"),
            tag("GS"),
            tag("UP"),
        )),
        alt((
            tag("BR"),
            tag("FG"),
            tag("FU"),
            tag("VA"),
            tag("DU"),
            tag("SA"),
            tag("HZ"),
            tag("PY"),
        )),
        alt((tag("PO"), tag("SQ"), tag("FC"), tag("SS"), tag("DS"))),
    ))(input)
}

fn weather(input: &str) -> IResult<&str, Group> {
    let intensity = opt(alt((tag("+"), tag("-"), tag("VC"))));
    let with_phenomena = recognize(tuple((
        intensity,
        opt(descriptor),
        phenomenon,
        many0(phenomenon),
    )));
    let descriptor_only = recognize(pair(opt(alt((tag("+"), tag("-"), tag("VC")))), descriptor));

    alt((
        value(Group::Skip, tag("//")),
        map(alt((with_phenomena, descriptor_only)), |w: &str| {
            Group::Weather(w.to_string())
        }),
    ))(input)
}

fn celsius(input: &str) -> IResult<&str, Option<i32>> {
    alt((
        map(pair(opt(one_of("M-")), number::<i32>(1, 2)), |(m, t)| {
            Some(if m.is_some() { -t } else { t })
        }),
        value(None, tag("//")),
    ))(input)
}

fn temperature(input: &str) -> IResult<&str, Group> {
    map(
        separated_pair(celsius, char('/'), opt(celsius)),
        |(t, d)| Group::Temperature(t, d.flatten()),
    )(input)
}

fn pressure(input: &str) -> IResult<&str, Group> {
    alt((
        map(preceded(char('Q'), number::<u32>(4, 4)), |p| {
            Group::Pressure(Some(p as f64))
        }),
        map(preceded(char('A'), number::<u32>(4, 4)), |p| {
            Group::Pressure(Some(p as f64 / 100. * INHG_TO_HPA))
        }),
        value(Group::Pressure(None), alt((tag("Q////"), tag("A////")))),
    ))(input)
}

/// Recent weather, e.g. `RERA`.
///
fn recent(input: &str) -> IResult<&str, Group> {
    value(
        Group::Skip,
        preceded(tag("RE"), alt((recognize(pair(opt(descriptor), phenomenon)), descriptor))),
    )(input)
}

/// Every alternative must eat the whole group, a partial match is not a match.
///
fn group(input: &str) -> IResult<&str, Group> {
    alt((
        all_consuming(wind),
        all_consuming(variable),
        all_consuming(visibility),
        all_consuming(runway),
        all_consuming(sky),
        all_consuming(recent),
        all_consuming(weather),
        all_consuming(temperature),
        all_consuming(pressure),
    ))(input)
}

/// Split a report into groups, gluing `1 1/2SM` back together.
///
fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut words = raw
        .split_whitespace()
        .map(|w| w.trim_end_matches('='))
        .filter(|w| !w.is_empty())
        .peekable();

    while let Some(word) = words.next() {
        let glue = word.len() <= 2
            && word.chars().all(|c| c.is_ascii_digit())
            && words
                .peek()
                .is_some_and(|next| next.ends_with("SM") && next.contains('/'));
        match (glue, words.peek()) {
            (true, Some(next)) => {
                tokens.push(format!("{word} {next}"));
                words.next();
            }
            _ => tokens.push(word.to_string()),
        }
    }
    tokens
}

impl Metar {
    /// Parse one raw report.
    ///
    #[tracing::instrument]
    pub fn parse(raw: &str) -> Result<Metar, WeatherError> {
        let tokens = tokenize(raw);
        let mut tokens = tokens.iter().map(String::as_str).peekable();

        // Header
        //
        if tokens
            .peek()
            .is_some_and(|t| *t == "METAR" || *t == "SPECI")
        {
            tokens.next();
        }
        let station = match tokens.next() {
            Some(t) if all_consuming(station)(t).is_ok() => t.to_string(),
            Some(t) => return Err(WeatherError::Decode(format!("bad station {t}"))),
            None => return Err(WeatherError::Decode("empty report".to_string())),
        };

        let mut metar = Metar {
            station,
            ..Metar::default()
        };

        if let Some(Ok((_, time))) = tokens.peek().map(|t| all_consuming(issue_time)(*t)) {
            metar.time = Some(time);
            tokens.next();
        }

        let mut unparsed = vec![];
        while let Some(token) = tokens.next() {
            match token {
                t if END_MARKERS.contains(&t) => break,
                "NIL" => return Err(WeatherError::Decode(format!("{} NIL report", metar.station))),
                "AUTO" => metar.auto = true,
                "COR" | "CCA" | "CCB" => (),
                "WS" => {
                    // WS R27L, WS ALL RWY
                    if tokens.next() == Some("ALL") {
                        tokens.next();
                    }
                }
                _ => match group(token) {
                    Ok((_, g)) => metar.push(g),
                    Err(_) => unparsed.push(token),
                },
            }
        }

        if !unparsed.is_empty() {
            debug!("unparsed groups: {:?}", unparsed);
            return Err(WeatherError::UnparsedGroups(unparsed.join(" ")));
        }
        trace!("metar={:?}", metar);
        Ok(metar)
    }

    fn push(&mut self, group: Group) {
        match group {
            Group::Wind(w) => self.wind = w,
            Group::Variable(from, to) => self.variable = Some((from, to)),
            // First one is the prevailing visibility, others are directional minimums
            Group::Visibility(m) => {
                self.visibility.get_or_insert(m);
            }
            Group::Cavok => {
                self.cavok = true;
                self.visibility = Some(10_000.);
            }
            Group::Sky(Some(layer)) => self.sky.push(layer),
            Group::Weather(w) => self.weather.push(w),
            Group::Temperature(t, d) => {
                self.temperature = t;
                self.dewpoint = d;
            }
            Group::Pressure(p) => self.pressure = p,
            Group::Sky(None) | Group::Skip => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("27015KT", Some(Wind { direction: Some(270), speed: 15, gust: None }))]
    #[case("24012G25KT", Some(Wind { direction: Some(240), speed: 12, gust: Some(25) }))]
    #[case("VRB03KT", Some(Wind { direction: None, speed: 3, gust: None }))]
    #[case("00000KT", Some(Wind { direction: Some(0), speed: 0, gust: None }))]
    #[case("18005MPS", Some(Wind { direction: Some(180), speed: 10, gust: None }))]
    #[case("/////KT", None)]
    fn test_wind(#[case] inp: &str, #[case] out: Option<Wind>) {
        assert_eq!(Ok(("", Group::Wind(out))), group(inp));
    }

    #[rstest]
    #[case("9999", 9999.)]
    #[case("0350", 350.)]
    #[case("1200SW", 1200.)]
    #[case("10SM", 10. * STATUTE_MILE)]
    #[case("1/2SM", 0.5 * STATUTE_MILE)]
    #[case("1 1/2SM", 1.5 * STATUTE_MILE)]
    #[case("M1/4SM", 0.25 * STATUTE_MILE)]
    #[case("P6SM", 6. * STATUTE_MILE)]
    fn test_visibility(#[case] inp: &str, #[case] out: f64) {
        assert_eq!(Ok(("", Group::Visibility(out))), group(inp));
    }

    #[rstest]
    #[case("FEW012", Cover::Few, Some(1200), None)]
    #[case("BKN002", Cover::Bkn, Some(200), None)]
    #[case("SCT030CB", Cover::Sct, Some(3000), Some(CloudType::Cb))]
    #[case("OVC045TCU", Cover::Ovc, Some(4500), Some(CloudType::Tcu))]
    #[case("BKN020///", Cover::Bkn, Some(2000), None)]
    #[case("VV001", Cover::Vv, Some(100), None)]
    #[case("VV///", Cover::Vv, None, None)]
    #[case("NCD", Cover::Ncd, None, None)]
    #[case("NSC", Cover::Nsc, None, None)]
    fn test_sky(
        #[case] inp: &str,
        #[case] cover: Cover,
        #[case] height: Option<u32>,
        #[case] kind: Option<CloudType>,
    ) {
        let layer = SkyLayer {
            cover,
            height,
            kind,
        };
        assert_eq!(Ok(("", Group::Sky(Some(layer)))), group(inp));
    }

    #[rstest]
    #[case("-RA")]
    #[case("+TSRA")]
    #[case("BR")]
    #[case("FZFG")]
    #[case("VCSH")]
    #[case("-SHRASN")]
    #[case("TS")]
    fn test_weather(#[case] inp: &str) {
        assert_eq!(Ok(("", Group::Weather(inp.to_string()))), group(inp));
    }

    #[rstest]
    #[case("15/09", Some(15), Some(9))]
    #[case("M02/M05", Some(-2), Some(-5))]
    #[case("05/M01", Some(5), Some(-1))]
    #[case("12/", Some(12), None)]
    #[case("///", None, None)]
    fn test_temperature(#[case] inp: &str, #[case] t: Option<i32>, #[case] d: Option<i32>) {
        let r = group(inp);
        match r {
            Ok((_, Group::Temperature(rt, rd))) => assert_eq!((t, d), (rt, rd)),
            Ok((_, Group::Skip)) if t.is_none() => (),
            _ => panic!("bad temperature {inp}: {r:?}"),
        }
    }

    #[rstest]
    #[case("////")]
    #[case("NDV")]
    fn test_visibility_skipped(#[case] inp: &str) {
        assert_eq!(Ok(("", Group::Skip)), group(inp));
    }

    #[test]
    fn test_parse_missing_visibility() {
        let m = Metar::parse("EGLL 191350Z AUTO 27010KT //// NCD 15/05 Q1013").unwrap();

        assert!(m.auto);
        assert!(m.visibility.is_none());
        assert_eq!(Cover::Ncd, m.sky[0].cover);

        let m = Metar::parse("EGLL 191350Z 27010KT 9999 NDV NCD 15/05 Q1013").unwrap();
        assert_eq!(Some(9999.), m.visibility);
    }

    #[test]
    fn test_pressure() {
        assert_eq!(Ok(("", Group::Pressure(Some(1013.)))), group("Q1013"));
        match group("A2992") {
            Ok((_, Group::Pressure(Some(p)))) => assert_eq!(1013, p as u32),
            r => panic!("bad pressure {r:?}"),
        }
    }

    #[test]
    fn test_parse_full() {
        let raw = "EGLL 191350Z AUTO 24012G25KT 210V280 6000 -RA BKN008 OVC015 12/10 Q1008 NOSIG";
        let m = Metar::parse(raw).unwrap();

        assert_eq!("EGLL", m.station);
        assert_eq!(Some(IssueTime { day: 19, hour: 13, minute: 50 }), m.time);
        assert!(m.auto);
        assert_eq!(Some(240), m.wind.unwrap().direction);
        assert_eq!(Some(25), m.wind.unwrap().gust);
        assert_eq!(Some((210, 280)), m.variable);
        assert_eq!(Some(6000.), m.visibility);
        assert_eq!(vec!["-RA".to_string()], m.weather);
        assert_eq!(2, m.sky.len());
        assert_eq!(Some(12), m.temperature);
        assert_eq!(Some(10), m.dewpoint);
        assert_eq!(Some(1008.), m.pressure);
    }

    #[test]
    fn test_parse_cavok_with_type() {
        let m = Metar::parse("METAR EGKK 191350Z 09005KT CAVOK 18/07 Q1022=").unwrap();

        assert_eq!("EGKK", m.station);
        assert!(m.cavok);
        assert_eq!(Some(10_000.), m.visibility);
        assert!(m.sky.is_empty());
    }

    #[test]
    fn test_parse_skips_known_groups() {
        let raw = "EGSS 191350Z 27004KT 0300 R22/0450N FG VV001 08/08 Q1015 RERA WS R22 BECMG 2000";
        let m = Metar::parse(raw).unwrap();

        assert_eq!(Some(300.), m.visibility);
        assert_eq!(vec!["FG".to_string()], m.weather);
        assert_eq!(Cover::Vv, m.sky[0].cover);
    }

    #[test]
    fn test_parse_us() {
        let raw = "KJFK 191351Z 31008KT 1 1/2SM BR OVC004 09/08 A2992 RMK AO2 SLP132";
        let m = Metar::parse(raw).unwrap();

        assert_eq!(Some(1.5 * STATUTE_MILE), m.visibility);
        assert_eq!(Some(400), m.sky[0].height);
    }

    #[rstest]
    #[case("")]
    #[case("egll 191350Z 27015KT 9999 Q1013")]
    #[case("EGLL 191350Z NIL")]
    fn test_parse_bad(#[case] raw: &str) {
        assert!(matches!(Metar::parse(raw), Err(WeatherError::Decode(_))));
    }

    #[test]
    fn test_parse_unparsed() {
        let r = Metar::parse("EGLL 191350Z 27015KT 9999 FOOBAR Q1013");
        assert_eq!(Err(WeatherError::UnparsedGroups("FOOBAR".to_string())), r);
    }
}
