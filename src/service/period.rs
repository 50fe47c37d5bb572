use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};

use crate::error::BacklogError;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Creation-date window of a backlog query. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Period {
    /// Explicit dates win, then `year`+`month`; nothing given means unbounded.
    pub fn resolve(
        start_date: Option<&str>,
        end_date: Option<&str>,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Self, BacklogError> {
        let start_date = start_date.map(str::trim).filter(|s| !s.is_empty());
        let end_date = end_date.map(str::trim).filter(|s| !s.is_empty());

        if start_date.is_some() || end_date.is_some() {
            let period = Self {
                start: start_date.map(parse_day).transpose()?,
                end: end_date.map(parse_day).transpose()?,
            };
            if let (Some(start), Some(end)) = (period.start, period.end)
                && start > end
            {
                return Err(BacklogError::InvalidPeriod(
                    "start_date must not be after end_date".to_string(),
                ));
            }
            return Ok(period);
        }

        match (year, month) {
            (Some(year), Some(month)) => {
                let (start, end) = month_bounds(year, month)?;
                Ok(Self {
                    start: Some(start),
                    end: Some(end),
                })
            }
            (None, None) => Ok(Self::default()),
            _ => Err(BacklogError::InvalidPeriod(
                "year and month must be provided together".to_string(),
            )),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn start_label(&self) -> String {
        label(self.start)
    }

    pub fn end_label(&self) -> String {
        label(self.end)
    }
}

fn label(day: Option<NaiveDate>) -> String {
    day.map(|d| d.format(DAY_FORMAT).to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, BacklogError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).map_err(|_| BacklogError::InvalidDate)
}

/// First and last calendar day of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), BacklogError> {
    if !(1..=12).contains(&month) {
        return Err(BacklogError::InvalidPeriod(
            "month must be between 1 and 12".to_string(),
        ));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| BacklogError::InvalidPeriod(format!("year {year} is out of range")))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| BacklogError::InvalidPeriod(format!("year {year} is out of range")))?;
    Ok((first, last))
}

/// Render an Azure DevOps timestamp as `DD/MM/YYYY`; unparseable input yields `None`.
pub fn format_day(iso: &str) -> Option<String> {
    let iso = iso.trim();
    let day = DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(iso, DAY_FORMAT))
        .ok()?;
    Some(day.format("%d/%m/%Y").to_string())
}
