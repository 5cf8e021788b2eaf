use crate::error::*;
use crate::record::*;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Null counters for one transform pass, per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub records: usize,
    pub id: usize,
    pub pcd2: usize,
    pub dointr: usize,
    pub doterm: usize,
    pub oscty: usize,
    pub lat: usize,
    pub long: usize,
    /// Records left without a date span: no `OSCTY`, or a group with no
    /// introduced date at all.
    pub ungrouped: usize,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records | nulls: id {} pcd2 {} dointr {} doterm {} oscty {} lat {} long {} | no group span {}",
            self.records,
            self.id,
            self.pcd2,
            self.dointr,
            self.doterm,
            self.oscty,
            self.lat,
            self.long,
            self.ungrouped,
        )
    }
}

/// Turns raw rows into typed centroids with their group's introduced-date
/// span broadcast onto every member.
///
/// Never fails. Output has the same length and order as input.
pub fn transform(raws: Vec<RawRecord>) -> (Vec<Centroid>, Report) {
    let mut report = Report {
        records: raws.len(),
        ..Report::default()
    };
    let mut centroids = raws
        .into_iter()
        .map(|raw| Centroid {
            id: nulled("OBJECTID", raw.id, integer, &mut report.id),
            pcd2: nulled("PCD2", raw.pcd2, text, &mut report.pcd2),
            dointr: nulled("DOINTR", raw.dointr, month, &mut report.dointr),
            doterm: nulled("DOTERM", raw.doterm, month, &mut report.doterm),
            oscty: nulled("OSCTY", raw.oscty, text, &mut report.oscty),
            lat: nulled("LAT", raw.lat, decimal, &mut report.lat),
            long: nulled("LONG", raw.long, decimal, &mut report.long),
            max_dointr: None,
            min_dointr: None,
        })
        .collect::<Vec<_>>();
    let spans = spans(&centroids);
    for centroid in centroids.iter_mut() {
        match centroid.oscty.as_ref().and_then(|g| spans.get(g)) {
            Some(&(min, max)) => {
                centroid.min_dointr = Some(min);
                centroid.max_dointr = Some(max);
            }
            None => report.ungrouped += 1,
        }
    }
    log::info!("transformed {}", report);
    (centroids, report)
}

/// (min, max) introduced date per group over non-null dates.
fn spans(centroids: &[Centroid]) -> HashMap<String, (NaiveDate, NaiveDate)> {
    let mut spans = HashMap::<String, (NaiveDate, NaiveDate)>::new();
    for centroid in centroids {
        if let (Some(group), Some(date)) = (centroid.oscty.as_ref(), centroid.dointr) {
            spans
                .entry(group.clone())
                .and_modify(|(min, max)| {
                    *min = (*min).min(date);
                    *max = (*max).max(date);
                })
                .or_insert((date, date));
        }
    }
    spans
}

fn nulled<T>(
    field: &'static str,
    raw: Option<String>,
    parse: fn(&'static str, &str) -> Result<T>,
    count: &mut usize,
) -> Option<T> {
    let parsed = raw.as_deref().map(|s| parse(field, s));
    match parsed {
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            log::debug!("{}", e);
            *count += 1;
            None
        }
        None => {
            *count += 1;
            None
        }
    }
}

/// Integer-like fields may arrive as `198001.0` from spreadsheet exports.
fn digits(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_suffix(".0").unwrap_or(raw)
}

/// Parses a `YYYYMM` year-month into the first day of that month.
pub fn month(field: &'static str, raw: &str) -> Result<NaiveDate> {
    let s = digits(raw);
    let invalid = || Error::Parse {
        field,
        value: raw.to_owned(),
    };
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year = s[..4].parse::<i32>().map_err(|_| invalid())?;
    let month = s[4..].parse::<u32>().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

pub fn integer(field: &'static str, raw: &str) -> Result<i32> {
    digits(raw).parse::<i32>().map_err(|_| Error::Parse {
        field,
        value: raw.to_owned(),
    })
}

pub fn decimal(field: &'static str, raw: &str) -> Result<Decimal> {
    let s = raw.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| Error::Parse {
            field,
            value: raw.to_owned(),
        })
}

pub fn text(field: &'static str, raw: &str) -> Result<String> {
    match raw.trim() {
        "" => Err(Error::Parse {
            field,
            value: raw.to_owned(),
        }),
        s if s.eq_ignore_ascii_case("nan") => Err(Error::Parse {
            field,
            value: raw.to_owned(),
        }),
        s => Ok(s.to_owned()),
    }
}
