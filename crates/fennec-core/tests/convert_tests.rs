use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use fennec_core::BindValue;
use fennec_core::binding::{Bindable, BoundValue, FieldKind, FieldType, convert};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, BindValue)]
enum UserStatus {
    Active,
    Inactive,
    #[bind(rename = "on-hold")]
    OnHold,
}

fn ty<T: Bindable>() -> FieldType {
    T::field_type()
}

#[test]
fn test_integer_conversion() {
    assert!(matches!(convert("42", &ty::<i32>()), Ok(BoundValue::Signed(42))));
    assert!(matches!(convert("7", &ty::<u8>()), Ok(BoundValue::Unsigned(7))));

    let err = convert("300", &ty::<u8>()).unwrap_err();
    assert_eq!(err.message(), "'300' is not a valid u8");

    let err = convert("abc", &ty::<i32>()).unwrap_err();
    assert_eq!(err.message(), "'abc' is not a valid i32");
}

#[test]
fn test_decimal_point_is_always_dot() {
    match convert("3.25", &ty::<f64>()) {
        Ok(BoundValue::Float(v)) => assert!((v - 3.25).abs() < f64::EPSILON),
        other => panic!("unexpected {:?}", other),
    }
    assert!(convert("3,25", &ty::<f64>()).is_err());
}

#[test]
fn test_nullable_blank_is_null() {
    assert!(matches!(convert("", &ty::<Option<i32>>()), Ok(BoundValue::Null)));
    assert!(matches!(convert("  ", &ty::<Option<Uuid>>()), Ok(BoundValue::Null)));
    assert!(convert("", &ty::<i32>()).is_err());
}

#[test]
fn test_bool_is_case_insensitive() {
    assert!(matches!(convert("TRUE", &ty::<bool>()), Ok(BoundValue::Bool(true))));
    assert!(matches!(convert("False", &ty::<bool>()), Ok(BoundValue::Bool(false))));
    assert!(convert("yes", &ty::<bool>()).is_err());
}

#[test]
fn test_char_requires_exactly_one() {
    assert!(matches!(convert("x", &ty::<char>()), Ok(BoundValue::Char('x'))));
    assert!(convert("xy", &ty::<char>()).is_err());
    assert!(convert("", &ty::<char>()).is_err());
}

#[test]
fn test_uuid_is_strict() {
    let id = Uuid::new_v4();
    match convert(&id.to_string(), &ty::<Uuid>()) {
        Ok(BoundValue::Uuid(parsed)) => assert_eq!(parsed, id),
        other => panic!("unexpected {:?}", other),
    }
    let err = convert("not-a-uuid", &ty::<Uuid>()).unwrap_err();
    assert_eq!(err.message(), "'not-a-uuid' is not a valid UUID format");
}

#[test]
fn test_date_formats() {
    let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    for raw in ["2024-03-15", "03/15/2024"] {
        match convert(raw, &ty::<NaiveDate>()) {
            Ok(BoundValue::Date(d)) => assert_eq!(d, expected),
            other => panic!("{} gave {:?}", raw, other),
        }
    }
    assert!(convert("15.03.2024", &ty::<NaiveDate>()).is_err());
}

#[test]
fn test_time_formats() {
    match convert("14:30", &ty::<NaiveTime>()) {
        Ok(BoundValue::Time(t)) => assert_eq!((t.hour(), t.minute()), (14, 30)),
        other => panic!("unexpected {:?}", other),
    }
    match convert("08:05:09.250", &ty::<NaiveTime>()) {
        Ok(BoundValue::Time(t)) => {
            assert_eq!((t.hour(), t.minute(), t.second()), (8, 5, 9));
            assert_eq!(t.nanosecond(), 250_000_000);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_naive_date_time_accepts_space_and_date_only() {
    let value: chrono::NaiveDateTime =
        Bindable::from_bound(convert("2024-03-15 10:00:00", &ty::<chrono::NaiveDateTime>()).unwrap())
            .unwrap();
    assert_eq!(value.hour(), 10);

    let midnight: chrono::NaiveDateTime =
        Bindable::from_bound(convert("2024-03-15", &ty::<chrono::NaiveDateTime>()).unwrap()).unwrap();
    assert_eq!((midnight.day(), midnight.hour()), (15, 0));
}

#[test]
fn test_offset_date_time_round_trip_format() {
    let raw = "2024-03-15T10:00:00+02:00";
    let value: chrono::DateTime<chrono::FixedOffset> =
        Bindable::from_bound(convert(raw, &ty::<chrono::DateTime<chrono::FixedOffset>>()).unwrap())
            .unwrap();
    assert_eq!(value.to_rfc3339(), raw);
    assert!(convert("2024-03-15 10:00", &ty::<chrono::DateTime<chrono::Utc>>()).is_err());
}

#[test]
fn test_enum_by_name_rename_and_ordinal() {
    let target = ty::<UserStatus>();
    let by_name: UserStatus = Bindable::from_bound(convert("inactive", &target).unwrap()).unwrap();
    assert_eq!(by_name, UserStatus::Inactive);

    let renamed: UserStatus = Bindable::from_bound(convert("ON-HOLD", &target).unwrap()).unwrap();
    assert_eq!(renamed, UserStatus::OnHold);

    let by_ordinal: UserStatus = Bindable::from_bound(convert("0", &target).unwrap()).unwrap();
    assert_eq!(by_ordinal, UserStatus::Active);

    let err = convert("Deleted", &target).unwrap_err();
    assert_eq!(err.message(), "'Deleted' is not a valid value for UserStatus");
}

#[test]
fn test_enum_default_is_first_variant() {
    assert!(UserStatus::Active.is_default_value());
    assert!(!UserStatus::OnHold.is_default_value());
    assert!(matches!(ty::<UserStatus>().kind, FieldKind::Enum { variants } if variants.len() == 3));
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Sku(String);

impl std::str::FromStr for Sku {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("SKU-") {
            Ok(Sku(s.to_string()))
        } else {
            Err(format!("'{}' is not a SKU", s))
        }
    }
}

fennec_core::bindable_from_str!(Sku);

#[test]
fn test_user_scalar_via_from_str() {
    let sku: Sku = Bindable::from_bound(convert("SKU-1", &ty::<Sku>()).unwrap()).unwrap();
    assert_eq!(sku, Sku("SKU-1".into()));

    let err = convert("X", &ty::<Sku>()).unwrap_err();
    assert_eq!(err.message(), "'X' is not a valid Sku");
}

#[test]
fn test_file_kinds_cannot_be_converted_from_text() {
    assert!(convert("a.png", &ty::<fennec_core::FormFile>()).is_err());
}
