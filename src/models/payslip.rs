use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

use crate::error::{RunError, RunResult};

/// Time window the portal's document list is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFilter {
    Week,
    Month,
}

impl PeriodFilter {
    /// `"7"` selects the last-seven-days filter, any other value the month filter.
    pub fn from_search_period(period: &str) -> Self {
        if period == "7" {
            Self::Week
        } else {
            Self::Month
        }
    }

    /// Suffix of the i18n key the portal uses for the dropdown entry.
    pub fn menu_command(&self) -> &'static str {
        match self {
            Self::Week => "command_week",
            Self::Month => "command_month",
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Week => write!(f, "Week"),
            Self::Month => write!(f, "Month"),
        }
    }
}

/// Date fields encoded in a downloaded payslip's file name.
///
/// The portal names files as underscore-delimited fields where index 4 is the
/// accounting period (`YYYYMM`), index 5 the creation date (`YYYYMMDD`) and
/// index 6 the creation time (`HHMMSS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayslipFileName {
    pub accounting_period: NaiveDateTime,
    pub create_date: NaiveDateTime,
}

impl PayslipFileName {
    pub const ACCOUNTING_PERIOD: &'static str = "accounting_period";
    pub const CREATE_DATE: &'static str = "create_date";

    pub fn parse(file_name: &str) -> RunResult<Self> {
        let fields: Vec<&str> = file_name.split('_').collect();
        if fields.len() < 7 {
            return Err(malformed(
                file_name,
                format!("expected at least 7 fields, found {}", fields.len()),
            ));
        }

        let period = numeric(file_name, fields[4], 6, "accounting period")?;
        let accounting_period = NaiveDate::from_ymd_opt(num(&period[0..4]) as i32, num(&period[4..6]), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| malformed(file_name, format!("invalid accounting period '{}'", period)))?;

        let date = numeric(file_name, fields[5], 8, "creation date")?;
        // With exactly seven fields the extension is still attached to the time.
        let time_field = fields[6].split_once('.').map_or(fields[6], |(time, _)| time);
        let time = numeric(file_name, time_field, 6, "creation time")?;
        let create_date = NaiveDate::from_ymd_opt(num(&date[0..4]) as i32, num(&date[4..6]), num(&date[6..8]))
            .and_then(|d| d.and_hms_opt(num(&time[0..2]), num(&time[2..4]), num(&time[4..6])))
            .ok_or_else(|| malformed(file_name, format!("invalid creation timestamp '{}_{}'", date, time)))?;

        Ok(Self {
            accounting_period,
            create_date,
        })
    }

    /// Looks up one of the two named date values a destination template may reference.
    pub fn field(&self, name: &str) -> Option<&NaiveDateTime> {
        match name {
            Self::ACCOUNTING_PERIOD => Some(&self.accounting_period),
            Self::CREATE_DATE => Some(&self.create_date),
            _ => None,
        }
    }
}

fn malformed(file_name: &str, reason: String) -> RunError {
    RunError::MalformedFileName {
        name: file_name.to_string(),
        reason,
    }
}

fn numeric<'a>(file_name: &str, token: &'a str, width: usize, what: &str) -> RunResult<&'a str> {
    if token.len() != width || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(
            file_name,
            format!("{} '{}' is not {} digits", what, token, width),
        ));
    }
    Ok(token)
}

// Only called on slices already checked to be ASCII digits.
fn num(digits: &str) -> u32 {
    digits.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}
