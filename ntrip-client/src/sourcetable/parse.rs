//! Sourcetable text parsing.
//!
//! A sourcetable is a list of `;`-separated records, one per line,
//! terminated by `ENDSOURCETABLE`. Only `STR` (stream) and `CAS` (caster)
//! records are kept.

use crate::domain::{CasterRecord, Location};

const END_MARKER: &str = "ENDSOURCETABLE";

// STR;mountpoint;identifier;format;format-details;carrier;nav-system;
//     network;country;latitude;longitude;...
const STR_NAME: usize = 1;
const STR_LATITUDE: usize = 9;
const STR_LONGITUDE: usize = 10;

// CAS;host;port;identifier;operator;nmea;country;latitude;longitude;...
const CAS_HOST: usize = 1;
const CAS_PORT: usize = 2;
const CAS_IDENTIFIER: usize = 3;
const CAS_LATITUDE: usize = 7;
const CAS_LONGITUDE: usize = 8;

/// A mountpoint advertised in a `STR` record.
#[derive(Debug, Clone, PartialEq)]
pub struct MountpointEntry {
    pub name: String,
    pub location: Location,
}

/// Parsed caster sourcetable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sourcetable {
    pub mountpoints: Vec<MountpointEntry>,
    pub casters: Vec<CasterRecord>,
}

impl Sourcetable {
    /// Parse a sourcetable body.
    ///
    /// Malformed records are skipped with a warning; anything after
    /// `ENDSOURCETABLE` is ignored.
    pub fn parse(body: &str) -> Self {
        let mut table = Sourcetable::default();

        for line in body.lines() {
            let line = line.trim();
            if line == END_MARKER {
                break;
            }

            let fields: Vec<&str> = line.split(';').collect();
            match fields[0] {
                "STR" => match parse_stream(&fields) {
                    Some(entry) => table.mountpoints.push(entry),
                    None => tracing::warn!(line, "Skipping malformed STR record"),
                },
                "CAS" => match parse_caster(&fields) {
                    Some(caster) => table.casters.push(caster),
                    None => tracing::warn!(line, "Skipping malformed CAS record"),
                },
                "" | "NET" => {}
                other => tracing::trace!(kind = other, "Ignoring sourcetable record"),
            }
        }

        table
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).map(|f| f.trim())
}

fn coordinate(fields: &[&str], index: usize) -> Option<f64> {
    field(fields, index)?.parse().ok()
}

fn parse_stream(fields: &[&str]) -> Option<MountpointEntry> {
    let name = field(fields, STR_NAME).filter(|n| !n.is_empty())?;
    let latitude = coordinate(fields, STR_LATITUDE)?;
    let longitude = coordinate(fields, STR_LONGITUDE)?;

    Some(MountpointEntry {
        name: name.to_string(),
        location: Location::new(latitude, longitude),
    })
}

fn parse_caster(fields: &[&str]) -> Option<CasterRecord> {
    let host = field(fields, CAS_HOST).filter(|h| !h.is_empty())?;
    let port = field(fields, CAS_PORT)?.parse().ok()?;
    let identifier = field(fields, CAS_IDENTIFIER)?;
    let latitude = coordinate(fields, CAS_LATITUDE)?;
    let longitude = coordinate(fields, CAS_LONGITUDE)?;

    Some(CasterRecord {
        host: host.to_string(),
        port,
        identifier: identifier.to_string(),
        location: Location::new(latitude, longitude),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
CAS;caster.centipede.fr;2101;CENTIPEDE;INRAE;0;FRA;46.16;-1.15;;0;http://centipede.fr\r
NET;CENTIPEDE;INRAE;B;N;https://centipede.fr;none;contact@centipede.fr;none\r
STR;CT;Lusignan;RTCM 3.3;1004(1),1006(10);2;GPS+GLO;NONE;FRA;46.44;0.12;0;0;sNTRIP;none;N;N;0;\r
STR;POIT;Poitiers;RTCM 3.3;1004(1),1006(10);2;GPS;NONE;FRA;46.58;0.34;0;0;sNTRIP;none;N;N;0;\r
ENDSOURCETABLE\r
";

    #[test]
    fn parses_streams_and_casters() {
        let table = Sourcetable::parse(TABLE);

        assert_eq!(
            table.mountpoints,
            vec![
                MountpointEntry {
                    name: "CT".into(),
                    location: Location::new(46.44, 0.12),
                },
                MountpointEntry {
                    name: "POIT".into(),
                    location: Location::new(46.58, 0.34),
                },
            ]
        );
        assert_eq!(
            table.casters,
            vec![CasterRecord {
                host: "caster.centipede.fr".into(),
                port: 2101,
                identifier: "CENTIPEDE".into(),
                location: Location::new(46.16, -1.15),
            }]
        );
    }

    #[test]
    fn skips_malformed_records() {
        let body = "\
STR;BAD;x;RTCM 3.3;;2;GPS;NONE;FRA;north;0.12;0\n\
STR;SHORT;x\n\
STR;;x;RTCM 3.3;;2;GPS;NONE;FRA;46.0;0.12;0\n\
CAS;host;notaport;ID;op;0;FRA;46.0;0.0\n\
STR;GOOD;x;RTCM 3.3;;2;GPS;NONE;FRA;46.0;0.12;0\n";

        let table = Sourcetable::parse(body);

        assert_eq!(table.mountpoints.len(), 1);
        assert_eq!(table.mountpoints[0].name, "GOOD");
        assert!(table.casters.is_empty());
    }

    #[test]
    fn stops_at_end_marker() {
        let body = "\
STR;A;x;RTCM 3.3;;2;GPS;NONE;FRA;46.0;0.1;0\n\
ENDSOURCETABLE\n\
STR;B;x;RTCM 3.3;;2;GPS;NONE;FRA;46.0;0.2;0\n";

        let table = Sourcetable::parse(body);

        assert_eq!(table.mountpoints.len(), 1);
        assert_eq!(table.mountpoints[0].name, "A");
    }

    #[test]
    fn ignores_unknown_records_and_blank_lines() {
        let body = "\n\nFOO;bar\nSTR;A;x;RTCM 3.3;;2;GPS;NONE;FRA;-33.9;151.2;0\n";

        let table = Sourcetable::parse(body);

        assert_eq!(table.mountpoints.len(), 1);
        assert_eq!(table.mountpoints[0].location, Location::new(-33.9, 151.2));
    }

    #[test]
    fn empty_body() {
        assert_eq!(Sourcetable::parse(""), Sourcetable::default());
    }
}
