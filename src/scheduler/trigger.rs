// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Standard 5-field cron expressions on top of the `cron` crate.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::errors::GatewayConstructionError;

/// A parsed `minute hour day-of-month month day-of-week` schedule.
///
/// Day-of-week numbers follow the usual crontab convention (0 or 7 is
/// Sunday) and are translated to the 1-7 numbering the `cron` crate uses.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    expression: String,
    schedule: Schedule,
}

impl CronTrigger {
    pub fn parse(expression: &str) -> Result<Self, GatewayConstructionError> {
        let invalid = |reason: String| GatewayConstructionError::InvalidSchedule {
            schedule: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!(
                "expected 5 fields, found {}",
                fields.len()
            )));
        }

        let translated = format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            translate_day_of_week(fields[4]).map_err(invalid)?
        );
        let schedule = Schedule::from_str(&translated).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Fire times in `(last, now]`, counted up to `cap`.
    ///
    /// Any non-zero count is served by a single catch-up run.
    pub fn missed_between(&self, last: DateTime<Utc>, now: DateTime<Utc>, cap: usize) -> usize {
        self.schedule
            .after(&last)
            .take_while(|fire| *fire <= now)
            .take(cap)
            .count()
    }

    pub fn is_due(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.missed_between(last, now, 1) > 0
    }
}

/// Rewrite a crontab day-of-week field for the `cron` crate.
///
/// Numeric items are expanded to the set of days they cover and emitted as a
/// list, so ranges ending at or wrapping past Sunday (`5-7`) stay valid.
/// Named days and `*`/`?` pass through unchanged.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut named = Vec::new();
    let mut days = BTreeSet::new();
    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item.to_string());
        } else {
            days.extend(expand_days(item)?);
        }
    }

    let mut items: Vec<String> = days.into_iter().map(|day| (day + 1).to_string()).collect();
    items.extend(named);
    if items.is_empty() {
        return Err(format!("empty day-of-week field '{}'", field));
    }
    Ok(items.join(","))
}

/// Crontab days (0 = Sunday .. 6 = Saturday) covered by one list item.
fn expand_days(item: &str) -> Result<Vec<u8>, String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: u8 = step
                .parse()
                .map_err(|_| format!("invalid step in '{}'", item))?;
            if step == 0 {
                return Err(format!("zero step in '{}'", item));
            }
            (range, step)
        }
        None => (item, 1),
    };

    let (first, last) = match range.split_once('-') {
        _ if range == "*" => (0, 7),
        Some((first, last)) => (parse_day(first)?, parse_day(last)?),
        None if step > 1 => (parse_day(range)?, 7),
        None => {
            let day = parse_day(range)?;
            (day, day)
        }
    };
    if first > last {
        return Err(format!("inverted day-of-week range '{}'", item));
    }

    Ok((first..=last)
        .step_by(step as usize)
        .map(|day| day % 7)
        .collect())
}

fn parse_day(day: &str) -> Result<u8, String> {
    match day.parse::<u8>() {
        Ok(n @ 0..=7) => Ok(n),
        Ok(n) => Err(format!("day of week {} is out of range", n)),
        Err(_) => Err(format!("invalid day of week '{}'", day)),
    }
}
