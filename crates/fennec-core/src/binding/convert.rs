//! Raw string to typed value conversion.
//!
//! Parsing never depends on the host locale: `.` is always the decimal
//! separator and dates use fixed formats.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::binding::value::{BoundValue, FieldKind, FieldType};
use crate::error::ConversionError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Convert one raw value to the declared field type.
///
/// A nullable target given an empty or whitespace value yields
/// [`BoundValue::Null`]; that is not an error.
pub fn convert(raw: &str, target: &FieldType) -> Result<BoundValue, ConversionError> {
    if target.nullable && raw.trim().is_empty() {
        return Ok(BoundValue::Null);
    }

    let name = target.type_name;
    match target.kind {
        FieldKind::String => Ok(BoundValue::String(raw.to_string())),
        FieldKind::Bool => parse_bool(raw).map(BoundValue::Bool),
        FieldKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(BoundValue::Char(c)),
                _ => Err(ConversionError::invalid(raw, "char")),
            }
        }
        FieldKind::I8 => signed::<i8>(raw, name),
        FieldKind::I16 => signed::<i16>(raw, name),
        FieldKind::I32 => signed::<i32>(raw, name),
        FieldKind::I64 => signed::<i64>(raw, name),
        FieldKind::Isize => signed::<isize>(raw, name),
        FieldKind::U8 => unsigned::<u8>(raw, name),
        FieldKind::U16 => unsigned::<u16>(raw, name),
        FieldKind::U32 => unsigned::<u32>(raw, name),
        FieldKind::U64 => unsigned::<u64>(raw, name),
        FieldKind::Usize => unsigned::<usize>(raw, name),
        FieldKind::F32 => raw
            .trim()
            .parse::<f32>()
            .map(|v| BoundValue::Float(f64::from(v)))
            .map_err(|_| ConversionError::invalid(raw, name)),
        FieldKind::F64 => raw
            .trim()
            .parse::<f64>()
            .map(BoundValue::Float)
            .map_err(|_| ConversionError::invalid(raw, name)),
        FieldKind::Uuid => Uuid::parse_str(raw.trim())
            .map(BoundValue::Uuid)
            .map_err(|_| ConversionError::new(format!("'{}' is not a valid UUID format", raw))),
        FieldKind::Date => parse_date(raw.trim())
            .map(BoundValue::Date)
            .ok_or_else(|| ConversionError::new(format!("'{}' is not a valid date format", raw))),
        FieldKind::Time => parse_time(raw.trim())
            .map(BoundValue::Time)
            .ok_or_else(|| ConversionError::new(format!("'{}' is not a valid time format", raw))),
        FieldKind::DateTime => parse_naive_date_time(raw.trim())
            .map(BoundValue::DateTime)
            .ok_or_else(|| ConversionError::invalid(raw, "date-time")),
        FieldKind::DateTimeUtc => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| BoundValue::DateTimeUtc(dt.with_timezone(&Utc)))
            .map_err(|_| ConversionError::invalid(raw, "date-time")),
        FieldKind::DateTimeOffset => DateTime::parse_from_rfc3339(raw.trim())
            .map(BoundValue::DateTimeOffset)
            .map_err(|_| ConversionError::invalid(raw, "date-time with offset")),
        FieldKind::Enum { variants } => parse_enum(raw, variants, name).map(BoundValue::Enum),
        FieldKind::Scalar { parse } => parse(raw)
            .map(BoundValue::Other)
            .map_err(|_| ConversionError::invalid(raw, name)),
        FieldKind::File
        | FieldKind::FileList
        | FieldKind::FileCollection
        | FieldKind::StreamFile
        | FieldKind::StreamFileList => Err(ConversionError::new(format!(
            "'{}' cannot be bound from a text value",
            name
        ))),
        FieldKind::Opaque => Err(ConversionError::new(format!("'{}' is not bindable", name))),
    }
}

fn parse_bool(raw: &str) -> Result<bool, ConversionError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConversionError::invalid(raw, "boolean"))
    }
}

fn signed<T>(raw: &str, name: &str) -> Result<BoundValue, ConversionError>
where
    T: std::str::FromStr + TryInto<i64>,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .and_then(|v| v.try_into().ok())
        .map(BoundValue::Signed)
        .ok_or_else(|| ConversionError::invalid(raw, name))
}

fn unsigned<T>(raw: &str, name: &str) -> Result<BoundValue, ConversionError>
where
    T: std::str::FromStr + TryInto<u64>,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .and_then(|v| v.try_into().ok())
        .map(BoundValue::Unsigned)
        .ok_or_else(|| ConversionError::invalid(raw, name))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn parse_naive_date_time(raw: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_enum(raw: &str, variants: &[&str], name: &str) -> Result<usize, ConversionError> {
    let trimmed = raw.trim();
    if let Some(index) = variants.iter().position(|v| v.eq_ignore_ascii_case(trimmed)) {
        return Ok(index);
    }
    match trimmed.parse::<usize>() {
        Ok(index) if index < variants.len() => Ok(index),
        _ => Err(ConversionError::new(format!(
            "'{}' is not a valid value for {}",
            raw, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(kind: FieldKind) -> FieldType {
        FieldType::new(kind, "test")
    }

    #[test]
    fn nullable_whitespace_is_null() {
        let target = FieldType::new(FieldKind::I32, "i32").nullable();
        assert!(matches!(convert("   ", &target), Ok(BoundValue::Null)));
    }

    #[test]
    fn non_nullable_empty_number_fails() {
        let target = FieldType::new(FieldKind::I32, "i32");
        let err = convert("", &target).unwrap_err();
        assert_eq!(err.message(), "'' is not a valid i32");
    }

    #[test]
    fn isize_widens_into_signed() {
        assert!(matches!(convert("-3", &ty(FieldKind::Isize)), Ok(BoundValue::Signed(-3))));
    }

    #[test]
    fn enum_index_out_of_range() {
        let target = ty(FieldKind::Enum {
            variants: &["Red", "Green"],
        });
        assert!(convert("2", &target).is_err());
        assert!(matches!(convert("1", &target), Ok(BoundValue::Enum(1))));
    }
}
