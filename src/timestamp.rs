//! Resolution of DateTime clause values into absolute instants.
//!
//! Relative presets are evaluated against a [`TimeContext`] so that
//! compilation stays deterministic under test. Calendar presets
//! ("current month", "current year") start at local midnight.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeDelta, TimeZone, Utc,
};
use tracing::warn;

use crate::clause::ValueMode;
use crate::types::TimePreset;

/// .NET ticks (100ns units since 0001-01-01) at the unix epoch.
const EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Naive layouts accepted for user-typed date text, tried in order.
const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// The clock and local timezone a compilation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    pub now: DateTime<Utc>,
    pub local_offset: FixedOffset,
}

impl TimeContext {
    /// Current wall clock and the host's current UTC offset.
    pub fn system() -> Self {
        let now = Local::now();
        Self {
            now: now.with_timezone(&Utc),
            local_offset: now.offset().fix(),
        }
    }

    pub fn fixed(now: DateTime<Utc>, local_offset: FixedOffset) -> Self {
        Self { now, local_offset }
    }

    fn local_today(&self) -> NaiveDate {
        self.now.with_timezone(&self.local_offset).date_naive()
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        local_to_utc(date.and_time(NaiveTime::MIN), self.local_offset)
    }
}

/// A clause value after presets and custom ranges have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveValue {
    /// User text, emitted as typed.
    Literal(String),
    /// A resolved point in time.
    Instant(DateTime<Utc>),
    /// Custom range text that could not be parsed as a date.
    Unparsed { text: String, is_local: bool },
}

impl EffectiveValue {
    /// Textual form: literal text, ISO-8601 UTC for instants, raw text otherwise.
    pub fn text(&self) -> String {
        match self {
            EffectiveValue::Literal(text) => text.clone(),
            EffectiveValue::Instant(instant) => format_instant(*instant),
            EffectiveValue::Unparsed { text, .. } => text.clone(),
        }
    }

    /// The value as an instant; literal text is read as UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            EffectiveValue::Literal(text) => parse_date_text(text, None),
            EffectiveValue::Instant(instant) => Some(*instant),
            EffectiveValue::Unparsed { .. } => None,
        }
    }
}

/// Resolve a clause's value mode into the value an emitter prints.
pub fn resolve_value(mode: &ValueMode, ctx: &TimeContext) -> EffectiveValue {
    match mode {
        ValueMode::Literal(text) => EffectiveValue::Literal(text.clone()),
        ValueMode::TimePreset(preset) => EffectiveValue::Instant(resolve_preset(*preset, ctx)),
        ValueMode::CustomRange { start, is_local } => {
            let offset = is_local.then_some(ctx.local_offset);
            match parse_date_text(start, offset) {
                Some(instant) => EffectiveValue::Instant(instant),
                None => {
                    warn!(text = %start, "custom range start is not a recognizable date");
                    EffectiveValue::Unparsed {
                        text: start.clone(),
                        is_local: *is_local,
                    }
                }
            }
        }
    }
}

/// The absolute start instant a relative preset denotes.
pub fn resolve_preset(preset: TimePreset, ctx: &TimeContext) -> DateTime<Utc> {
    match preset {
        TimePreset::LastHour => ctx.now - TimeDelta::hours(1),
        TimePreset::Last24Hours => ctx.now - TimeDelta::hours(24),
        TimePreset::Last7Days => ctx.now - TimeDelta::days(7),
        TimePreset::Last31Days => ctx.now - TimeDelta::days(31),
        TimePreset::Last365Days => ctx.now - TimeDelta::days(365),
        TimePreset::CurrentMonth => {
            let today = ctx.local_today();
            ctx.local_midnight(today.with_day(1).unwrap_or(today))
        }
        TimePreset::CurrentYear => {
            let today = ctx.local_today();
            ctx.local_midnight(today.with_ordinal(1).unwrap_or(today))
        }
    }
}

/// Parse user-entered date text.
///
/// Text carrying its own offset (RFC 3339 / RFC 2822) is honoured as is.
/// Naive text is read in `local_offset` when given, otherwise as UTC.
pub fn parse_date_text(text: &str, local_offset: Option<FixedOffset>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;

    Some(match local_offset {
        Some(offset) => local_to_utc(naive, offset),
        None => Utc.from_utc_datetime(&naive),
    })
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// 100ns ticks since 0001-01-01, left-padded with zeros to 20 digits.
/// `None` when the tick count does not fit in an `i64`.
pub fn ticks_with_padding(instant: DateTime<Utc>) -> Option<String> {
    let ticks = instant
        .timestamp_millis()
        .checked_mul(TICKS_PER_MILLISECOND)?
        .checked_add(EPOCH_TICKS)?;
    Some(format!("{:020}", ticks))
}

/// Whole seconds since the unix epoch.
pub fn unix_seconds(instant: DateTime<Utc>) -> i64 {
    instant.timestamp()
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&(naive - shift))
}
