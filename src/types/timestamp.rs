use std::fmt;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::result::{illegal_operation, IonResult};
use crate::types::decimal::Decimal;
use crate::types::integer::UInt;

/// The precision of a [Timestamp]'s fields. Fields beyond the declared precision are not
/// part of the value; `2001-01T` and `2001-01-01T00:00Z` are different timestamps even
/// though they refer to related instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    /// Year-level precision (e.g. `2010T`)
    Year,
    /// Month-level precision (e.g. `2010-10T`)
    Month,
    /// Day-level precision (e.g. `2010-10-24`)
    Day,
    /// Minute-level precision (e.g. `2010-10-24T12:51+00:00`)
    HourAndMinute,
    /// Second-level precision or greater (e.g. `2010-10-24T12:51:30.123+00:00`)
    Second,
}

/// The fractional-seconds portion of a [Timestamp] with [Precision::Second].
///
/// Fractions with nine or fewer decimal places are stored as a digit count; the digits
/// themselves live in the timestamp's nanoseconds field. Greater precision (or coefficients
/// too large for a nanosecond field) are stored losslessly as a [Decimal].
#[derive(Debug, Clone)]
pub enum Mantissa {
    /// The number of decimal places of precision in the timestamp's nanoseconds
    Digits(u32),
    /// An arbitrary-precision fraction in the range `[0.0, 1.0)`
    Arbitrary(Decimal),
}

const NANOSECONDS_EXPONENT: i64 = -9;

/// Represents a point in time to a specified degree of precision.
///
/// The `date_time` field holds the timestamp's fields as they appear in its text
/// representation (that is: in the timezone of its offset). Timestamps with an unknown
/// offset represent their fields as written, with no timezone conversion possible.
#[derive(Debug, Clone)]
pub struct Timestamp {
    pub(crate) date_time: NaiveDateTime,
    pub(crate) offset: Option<FixedOffset>,
    pub(crate) precision: Precision,
    pub(crate) fractional_seconds: Option<Mantissa>,
}

impl Timestamp {
    /// Begins building a [Timestamp] with [Precision::Year].
    pub fn with_year(year: u32) -> TimestampBuilder {
        TimestampBuilder {
            precision: Precision::Year,
            year,
            ..Default::default()
        }
    }

    /// Begins building a [Timestamp] with [Precision::Day].
    pub fn with_ymd(year: u32, month: u32, day: u32) -> TimestampBuilder {
        Timestamp::with_year(year).with_month(month).with_day(day)
    }

    /// Begins building a [Timestamp] with [Precision::Second].
    pub fn with_ymd_hms(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> TimestampBuilder {
        Timestamp::with_ymd(year, month, day).with_hms(hour, minute, second)
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// The timestamp's timezone, or `None` if the offset is unknown.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// The timestamp's offset from UTC in minutes, or `None` if the offset is unknown.
    pub fn offset_minutes(&self) -> Option<i32> {
        self.offset.map(|offset| offset.local_minus_utc() / 60)
    }

    pub fn year(&self) -> u32 {
        self.date_time.year() as u32
    }

    pub fn month(&self) -> u32 {
        self.date_time.month()
    }

    pub fn day(&self) -> u32 {
        self.date_time.day()
    }

    pub fn hour(&self) -> u32 {
        self.date_time.hour()
    }

    pub fn minute(&self) -> u32 {
        self.date_time.minute()
    }

    pub fn second(&self) -> u32 {
        self.date_time.second()
    }

    /// The fractional-seconds portion of this timestamp as a [Decimal] in `[0.0, 1.0)`,
    /// preserving its scale. Returns `None` if the timestamp's precision does not include
    /// fractional seconds.
    pub fn fractional_seconds_as_decimal(&self) -> Option<Decimal> {
        match self.fractional_seconds.as_ref()? {
            Mantissa::Digits(0) => None,
            Mantissa::Digits(number_of_digits) => {
                let scale_down = 10u64.pow(9 - number_of_digits);
                let coefficient = self.date_time.nanosecond() as u64 / scale_down;
                Some(Decimal::new(coefficient as i64, -(*number_of_digits as i64)))
            }
            Mantissa::Arbitrary(decimal) => Some(decimal.clone()),
        }
    }

    /// This timestamp's fields shifted to UTC, the representation used by the binary
    /// encoding. Timestamps with an unknown offset are passed through unchanged.
    pub(crate) fn date_time_utc(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.date_time - Duration::seconds(offset.local_minus_utc() as i64),
            None => self.date_time,
        }
    }
}

// Timestamps are equivalent when their precisions match, their offsets match, their fields
// agree up to the declared precision, and their fractional seconds (if any) have the same
// coefficient and scale.
impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        if self.precision != other.precision {
            return false;
        }
        if self.offset != other.offset {
            return false;
        }
        let mut fields_equal = self.year() == other.year();
        if self.precision >= Precision::Month {
            fields_equal &= self.month() == other.month();
        }
        if self.precision >= Precision::Day {
            fields_equal &= self.day() == other.day();
        }
        if self.precision >= Precision::HourAndMinute {
            fields_equal &= self.hour() == other.hour() && self.minute() == other.minute();
        }
        if self.precision >= Precision::Second {
            fields_equal &= self.second() == other.second();
            fields_equal &=
                self.fractional_seconds_as_decimal() == other.fractional_seconds_as_decimal();
        }
        fields_equal
    }
}

impl Eq for Timestamp {}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year())?;
        if self.precision == Precision::Year {
            return write!(f, "T");
        }
        write!(f, "-{:02}", self.month())?;
        if self.precision == Precision::Month {
            return write!(f, "T");
        }
        write!(f, "-{:02}", self.day())?;
        if self.precision == Precision::Day {
            return Ok(());
        }
        write!(f, "T{:02}:{:02}", self.hour(), self.minute())?;
        if self.precision >= Precision::Second {
            write!(f, ":{:02}", self.second())?;
            if let Some(fractional) = self.fractional_seconds_as_decimal() {
                let digits = fractional.coefficient().magnitude().to_string();
                let scale = (-fractional.exponent()) as usize;
                write!(f, ".{:0>width$}", digits, width = scale)?;
            }
        }
        match self.offset_minutes() {
            None => write!(f, "-00:00"),
            Some(0) => write!(f, "Z"),
            Some(minutes) => {
                let sign = if minutes < 0 { '-' } else { '+' };
                let magnitude = minutes.abs();
                write!(f, "{}{:02}:{:02}", sign, magnitude / 60, magnitude % 60)
            }
        }
    }
}

/// Constructs a [Timestamp] field by field, validating ranges and calendar rules when one of
/// the `build*` methods is called.
#[derive(Debug, Clone, Default)]
pub struct TimestampBuilder {
    precision: Precision,
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanoseconds: u32,
    fractional_seconds: Option<Mantissa>,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Year
    }
}

impl TimestampBuilder {
    pub fn with_month(mut self, month: u32) -> Self {
        self.precision = Precision::Month;
        self.month = month;
        self
    }

    pub fn with_day(mut self, day: u32) -> Self {
        self.precision = Precision::Day;
        self.day = day;
        self
    }

    pub fn with_hour_and_minute(mut self, hour: u32, minute: u32) -> Self {
        self.precision = Precision::HourAndMinute;
        self.hour = hour;
        self.minute = minute;
        self
    }

    pub fn with_second(mut self, second: u32) -> Self {
        self.precision = Precision::Second;
        self.second = second;
        self
    }

    pub fn with_hms(self, hour: u32, minute: u32, second: u32) -> Self {
        self.with_hour_and_minute(hour, minute).with_second(second)
    }

    /// Sets a fractional-seconds component with millisecond precision.
    pub fn with_milliseconds(mut self, milliseconds: u32) -> Self {
        self.fractional_seconds = Some(Mantissa::Digits(3));
        self.nanoseconds = milliseconds * 1_000_000;
        self
    }

    /// Sets a fractional-seconds component with microsecond precision.
    pub fn with_microseconds(mut self, microseconds: u32) -> Self {
        self.fractional_seconds = Some(Mantissa::Digits(6));
        self.nanoseconds = microseconds * 1_000;
        self
    }

    /// Sets a fractional-seconds component with nanosecond precision.
    pub fn with_nanoseconds(mut self, nanoseconds: u32) -> Self {
        self.fractional_seconds = Some(Mantissa::Digits(9));
        self.nanoseconds = nanoseconds;
        self
    }

    /// Sets an arbitrary-precision fractional-seconds component. The provided decimal must
    /// be in the range `[0.0, 1.0)`. Fractions that fit in a nanoseconds field are stored
    /// that way; greater precision is retained as-is.
    pub fn with_fractional_seconds(mut self, fractional_seconds: Decimal) -> Self {
        let exponent = fractional_seconds.exponent();
        let coefficient_digits = fractional_seconds.precision() as i64;
        let representable_as_nanoseconds = exponent >= NANOSECONDS_EXPONENT
            && exponent < 0
            && coefficient_digits <= -exponent
            && !fractional_seconds.coefficient().is_negative_zero();
        if representable_as_nanoseconds {
            if let Some(coefficient) = fractional_seconds.coefficient().magnitude().as_u64() {
                let number_of_digits = (-exponent) as u32;
                self.nanoseconds =
                    (coefficient * 10u64.pow(9 - number_of_digits)) as u32;
                self.fractional_seconds = Some(Mantissa::Digits(number_of_digits));
                return self;
            }
        }
        self.fractional_seconds = Some(Mantissa::Arbitrary(fractional_seconds));
        self
    }

    fn build_date_time(&self) -> IonResult<NaiveDateTime> {
        if self.year == 0 || self.year > 9999 {
            return illegal_operation(format!(
                "timestamp year {} is outside the supported range 1-9999",
                self.year
            ));
        }
        let month = if self.precision >= Precision::Month {
            self.month
        } else {
            1
        };
        let day = if self.precision >= Precision::Day {
            self.day
        } else {
            1
        };
        let date = NaiveDate::from_ymd_opt(self.year as i32, month, day).ok_or_else(|| {
            crate::result::illegal_operation_raw(format!(
                "{:04}-{:02}-{:02} is not a valid date",
                self.year, month, day
            ))
        })?;
        let (hour, minute) = if self.precision >= Precision::HourAndMinute {
            (self.hour, self.minute)
        } else {
            (0, 0)
        };
        let second = if self.precision >= Precision::Second {
            self.second
        } else {
            0
        };
        let nanoseconds = match &self.fractional_seconds {
            Some(Mantissa::Digits(_)) => self.nanoseconds,
            _ => 0,
        };
        date.and_hms_nano_opt(hour, minute, second, nanoseconds)
            .ok_or_else(|| {
                crate::result::illegal_operation_raw(format!(
                    "{hour:02}:{minute:02}:{second:02} is not a valid time of day"
                ))
            })
    }

    fn validate_fractional_seconds(&self) -> IonResult<()> {
        if let Some(Mantissa::Arbitrary(decimal)) = &self.fractional_seconds {
            if decimal.coefficient().is_negative_zero()
                || decimal.coefficient().sign() == crate::types::coefficient::Sign::Negative
            {
                return illegal_operation("fractional seconds cannot be negative");
            }
            if decimal.exponent() >= 0 && !decimal.coefficient().is_zero() {
                return illegal_operation("fractional seconds must be less than one second");
            }
            let number_of_digits = decimal.precision() as i64;
            if number_of_digits > -decimal.exponent() {
                return illegal_operation("fractional seconds must be less than one second");
            }
        }
        Ok(())
    }

    /// Builds the timestamp with an unknown offset. Timestamps with time components whose
    /// offset is unknown are written with the `-00:00` offset notation.
    pub fn build(self) -> IonResult<Timestamp> {
        self.build_at_unknown_offset()
    }

    pub fn build_at_unknown_offset(self) -> IonResult<Timestamp> {
        self.validate_fractional_seconds()?;
        let date_time = self.build_date_time()?;
        let fractional_seconds = if self.precision == Precision::Second {
            self.fractional_seconds
        } else {
            None
        };
        Ok(Timestamp {
            date_time,
            offset: None,
            precision: self.precision,
            fractional_seconds,
        })
    }

    /// Builds the timestamp at the specified offset from UTC, expressed in minutes.
    pub fn build_at_offset(self, offset_minutes: i32) -> IonResult<Timestamp> {
        if offset_minutes.abs() > 1439 {
            return illegal_operation(format!(
                "timestamp offset {offset_minutes} is outside the supported range -1439..=1439 minutes"
            ));
        }
        if self.precision < Precision::HourAndMinute {
            return illegal_operation(
                "only timestamps with a time component can have a known offset",
            );
        }
        let offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            crate::result::illegal_operation_raw(format!(
                "timestamp offset {offset_minutes} minutes is invalid"
            ))
        })?;
        let mut timestamp = self.build_at_unknown_offset()?;
        timestamp.offset = Some(offset);
        Ok(timestamp)
    }

    /// Builds the timestamp in UTC.
    pub fn build_utc(self) -> IonResult<Timestamp> {
        self.build_at_offset(0)
    }
}

/// Scales a number of nanoseconds down to the requested number of decimal digits, for
/// writers that need a timestamp's fraction as a coefficient.
fn nanoseconds_scaled(nanoseconds: u32, number_of_digits: u32) -> u64 {
    if number_of_digits >= 9 {
        return nanoseconds as u64;
    }
    nanoseconds as u64 / 10u64.pow(9 - number_of_digits)
}

/// Converts a fractional-seconds mantissa to (coefficient magnitude, exponent), for the
/// binary encoder.
pub(crate) fn mantissa_coefficient_and_exponent(mantissa: &Mantissa, nanoseconds: u32) -> (UInt, i64) {
    match mantissa {
        Mantissa::Digits(number_of_digits) => (
            UInt::U64(nanoseconds_scaled(nanoseconds, *number_of_digits)),
            -(*number_of_digits as i64),
        ),
        Mantissa::Arbitrary(decimal) => (
            decimal.coefficient().magnitude().clone(),
            decimal.exponent(),
        ),
    }
}

#[cfg(test)]
mod timestamp_tests {
    use super::*;
    use rstest::*;

    #[test]
    fn builder_tracks_precision() -> IonResult<()> {
        assert_eq!(Timestamp::with_year(2021).build()?.precision(), Precision::Year);
        assert_eq!(
            Timestamp::with_year(2021).with_month(2).build()?.precision(),
            Precision::Month
        );
        assert_eq!(
            Timestamp::with_ymd(2021, 2, 8).build()?.precision(),
            Precision::Day
        );
        assert_eq!(
            Timestamp::with_ymd(2021, 2, 8)
                .with_hour_and_minute(11, 30)
                .build_at_offset(-300)?
                .precision(),
            Precision::HourAndMinute
        );
        assert_eq!(
            Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
                .build_utc()?
                .precision(),
            Precision::Second
        );
        Ok(())
    }

    #[test]
    fn equality_requires_matching_offsets() -> IonResult<()> {
        let utc = Timestamp::with_ymd_hms(2021, 2, 8, 16, 30, 0).build_utc()?;
        let minus_five = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 0).build_at_offset(-300)?;
        // Same instant, different offsets
        assert_eq!(utc.date_time_utc(), minus_five.date_time_utc());
        assert_ne!(utc, minus_five);
        Ok(())
    }

    #[test]
    fn equality_requires_matching_precision() -> IonResult<()> {
        let year = Timestamp::with_year(2021).build()?;
        let month = Timestamp::with_year(2021).with_month(1).build()?;
        assert_ne!(year, month);
        Ok(())
    }

    #[test]
    fn fractional_seconds_preserve_scale() -> IonResult<()> {
        let millis = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
            .with_milliseconds(193)
            .build_utc()?;
        assert_eq!(
            millis.fractional_seconds_as_decimal(),
            Some(Decimal::new(193, -3))
        );

        // 193 milliseconds expressed to six decimal places is a distinct value
        let micros = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
            .with_microseconds(193_000)
            .build_utc()?;
        assert_eq!(
            micros.fractional_seconds_as_decimal(),
            Some(Decimal::new(193_000, -6))
        );
        assert_ne!(millis, micros);
        Ok(())
    }

    #[test]
    fn sub_nanosecond_precision_is_preserved() -> IonResult<()> {
        // 999 picoseconds: more precise than the nanoseconds field can hold
        let timestamp = Timestamp::with_ymd_hms(2001, 1, 1, 0, 0, 0)
            .with_fractional_seconds(Decimal::new(999, -12))
            .build_utc()?;
        assert_eq!(
            timestamp.fractional_seconds_as_decimal(),
            Some(Decimal::new(999, -12))
        );
        Ok(())
    }

    #[rstest]
    #[case(Timestamp::with_year(2021), "2021T")]
    #[case(Timestamp::with_year(2021).with_month(2), "2021-02T")]
    #[case(Timestamp::with_ymd(2021, 2, 8), "2021-02-08")]
    fn display_date_precisions(#[case] builder: TimestampBuilder, #[case] expected: &str) {
        assert_eq!(format!("{}", builder.build().unwrap()), expected);
    }

    #[test]
    fn display_times_and_offsets() -> IonResult<()> {
        let unknown = Timestamp::with_ymd(2021, 2, 8)
            .with_hour_and_minute(11, 30)
            .build()?;
        assert_eq!(format!("{unknown}"), "2021-02-08T11:30-00:00");

        let utc = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2).build_utc()?;
        assert_eq!(format!("{utc}"), "2021-02-08T11:30:02Z");

        let offset = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
            .with_milliseconds(45)
            .build_at_offset(-330)?;
        assert_eq!(format!("{offset}"), "2021-02-08T11:30:02.045-05:30");
        Ok(())
    }

    #[test]
    fn rejects_invalid_fields() {
        assert!(Timestamp::with_ymd(2021, 2, 30).build().is_err());
        assert!(Timestamp::with_ymd(2021, 13, 1).build().is_err());
        assert!(Timestamp::with_year(0).build().is_err());
        assert!(Timestamp::with_ymd_hms(2021, 2, 8, 24, 0, 0).build_utc().is_err());
        assert!(Timestamp::with_ymd(2021, 2, 8)
            .with_hour_and_minute(1, 2)
            .build_at_offset(1440)
            .is_err());
    }

    #[test]
    fn leap_day_is_calendar_checked() {
        assert!(Timestamp::with_ymd(2020, 2, 29).build().is_ok());
        assert!(Timestamp::with_ymd(2021, 2, 29).build().is_err());
    }

    #[test]
    fn offsets_at_the_boundaries() -> IonResult<()> {
        let east = Timestamp::with_ymd(2021, 1, 1)
            .with_hour_and_minute(0, 0)
            .build_at_offset(1439)?;
        assert_eq!(east.offset_minutes(), Some(1439));
        let west = Timestamp::with_ymd(2021, 1, 1)
            .with_hour_and_minute(0, 0)
            .build_at_offset(-1439)?;
        assert_eq!(west.offset_minutes(), Some(-1439));
        assert_eq!(format!("{west}"), "2021-01-01T00:00-23:59");
        Ok(())
    }
}
