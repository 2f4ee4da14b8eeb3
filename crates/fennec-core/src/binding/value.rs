use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::binding::files::{FormFile, FormFiles, StreamFile};
use crate::error::ConversionError;

/// Parser for user scalar types registered with [`bindable_from_str!`].
pub type ScalarParser = fn(&str) -> Result<Arc<dyn Any + Send + Sync>, String>;

/// The conversion rule applied to a raw value.
#[derive(Clone, Copy)]
pub enum FieldKind {
    String,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Uuid,
    Date,
    Time,
    DateTime,
    DateTimeUtc,
    DateTimeOffset,
    Enum { variants: &'static [&'static str] },
    Scalar { parse: ScalarParser },
    /// A single uploaded file, matched by field name.
    File,
    /// Every uploaded file carrying the field name.
    FileList,
    /// Every uploaded file in the request, whatever its name.
    FileCollection,
    StreamFile,
    StreamFileList,
    /// Present in the shape but never converted (`#[bind(never)]` fields).
    Opaque,
}

impl FieldKind {
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            FieldKind::File
                | FieldKind::FileList
                | FieldKind::FileCollection
                | FieldKind::StreamFile
                | FieldKind::StreamFileList
        )
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Enum { variants } => f.debug_struct("Enum").field("variants", variants).finish(),
            FieldKind::Scalar { .. } => f.write_str("Scalar"),
            FieldKind::String => f.write_str("String"),
            FieldKind::Bool => f.write_str("Bool"),
            FieldKind::Char => f.write_str("Char"),
            FieldKind::I8 => f.write_str("I8"),
            FieldKind::I16 => f.write_str("I16"),
            FieldKind::I32 => f.write_str("I32"),
            FieldKind::I64 => f.write_str("I64"),
            FieldKind::Isize => f.write_str("Isize"),
            FieldKind::U8 => f.write_str("U8"),
            FieldKind::U16 => f.write_str("U16"),
            FieldKind::U32 => f.write_str("U32"),
            FieldKind::U64 => f.write_str("U64"),
            FieldKind::Usize => f.write_str("Usize"),
            FieldKind::F32 => f.write_str("F32"),
            FieldKind::F64 => f.write_str("F64"),
            FieldKind::Uuid => f.write_str("Uuid"),
            FieldKind::Date => f.write_str("Date"),
            FieldKind::Time => f.write_str("Time"),
            FieldKind::DateTime => f.write_str("DateTime"),
            FieldKind::DateTimeUtc => f.write_str("DateTimeUtc"),
            FieldKind::DateTimeOffset => f.write_str("DateTimeOffset"),
            FieldKind::File => f.write_str("File"),
            FieldKind::FileList => f.write_str("FileList"),
            FieldKind::FileCollection => f.write_str("FileCollection"),
            FieldKind::StreamFile => f.write_str("StreamFile"),
            FieldKind::StreamFileList => f.write_str("StreamFileList"),
            FieldKind::Opaque => f.write_str("Opaque"),
        }
    }
}

/// Declared type of a request field: its kind plus nullability.
#[derive(Debug, Clone, Copy)]
pub struct FieldType {
    pub kind: FieldKind,
    pub nullable: bool,
    /// Name used in conversion error messages.
    pub type_name: &'static str,
}

impl FieldType {
    pub const fn new(kind: FieldKind, type_name: &'static str) -> Self {
        FieldType {
            kind,
            nullable: false,
            type_name,
        }
    }

    pub const fn nullable(self) -> Self {
        FieldType {
            nullable: true,
            ..self
        }
    }

    pub const fn opaque(type_name: &'static str) -> Self {
        FieldType::new(FieldKind::Opaque, type_name)
    }
}

/// A converted value, waiting to be moved into a request field.
#[derive(Clone)]
pub enum BoundValue {
    /// Nullable target with no value.
    Null,
    String(String),
    Bool(bool),
    Char(char),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
    DateTimeOffset(DateTime<FixedOffset>),
    /// Index into the enum's declared variants.
    Enum(usize),
    Other(Arc<dyn Any + Send + Sync>),
    File(FormFile),
    Files(Vec<FormFile>),
    Stream(StreamFile),
    Streams(Vec<StreamFile>),
}

impl BoundValue {
    fn describe(&self) -> &'static str {
        match self {
            BoundValue::Null => "null",
            BoundValue::String(_) => "string",
            BoundValue::Bool(_) => "bool",
            BoundValue::Char(_) => "char",
            BoundValue::Signed(_) => "signed integer",
            BoundValue::Unsigned(_) => "unsigned integer",
            BoundValue::Float(_) => "float",
            BoundValue::Uuid(_) => "uuid",
            BoundValue::Date(_) => "date",
            BoundValue::Time(_) => "time",
            BoundValue::DateTime(_) => "date-time",
            BoundValue::DateTimeUtc(_) | BoundValue::DateTimeOffset(_) => "date-time with offset",
            BoundValue::Enum(_) => "enum",
            BoundValue::Other(_) => "scalar",
            BoundValue::File(_) | BoundValue::Files(_) => "file",
            BoundValue::Stream(_) | BoundValue::Streams(_) => "file stream",
        }
    }

    /// Error for a value of the wrong shape reaching a field.
    pub fn mismatch(&self, target: &str) -> ConversionError {
        ConversionError::new(format!("cannot bind a {} value to {}", self.describe(), target))
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Null => f.write_str("Null"),
            BoundValue::String(v) => f.debug_tuple("String").field(v).finish(),
            BoundValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            BoundValue::Char(v) => f.debug_tuple("Char").field(v).finish(),
            BoundValue::Signed(v) => f.debug_tuple("Signed").field(v).finish(),
            BoundValue::Unsigned(v) => f.debug_tuple("Unsigned").field(v).finish(),
            BoundValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
            BoundValue::Uuid(v) => f.debug_tuple("Uuid").field(v).finish(),
            BoundValue::Date(v) => f.debug_tuple("Date").field(v).finish(),
            BoundValue::Time(v) => f.debug_tuple("Time").field(v).finish(),
            BoundValue::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            BoundValue::DateTimeUtc(v) => f.debug_tuple("DateTimeUtc").field(v).finish(),
            BoundValue::DateTimeOffset(v) => f.debug_tuple("DateTimeOffset").field(v).finish(),
            BoundValue::Enum(v) => f.debug_tuple("Enum").field(v).finish(),
            BoundValue::Other(_) => f.write_str("Other(..)"),
            BoundValue::File(v) => f.debug_tuple("File").field(v).finish(),
            BoundValue::Files(v) => f.debug_tuple("Files").field(v).finish(),
            BoundValue::Stream(v) => f.debug_tuple("Stream").field(v).finish(),
            BoundValue::Streams(v) => f.debug_tuple("Streams").field(v).finish(),
        }
    }
}

/// A type that request fields can be declared as.
///
/// Implemented for the primitive, date, UUID and file types out of the box,
/// for `Option<T>` of any of them, for enums via `#[derive(BindValue)]`, and
/// for any `FromStr` type via [`bindable_from_str!`].
pub trait Bindable: Sized + Send + 'static {
    fn field_type() -> FieldType;

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError>;

    /// Whether the value equals the type's default (`None`, zero, `false`,
    /// empty string, nil UUID, first enum variant).
    fn is_default_value(&self) -> bool;

    /// The value a field takes when nothing was bound to it, if it has one.
    fn absent() -> Option<Self> {
        None
    }
}

impl<T: Bindable> Bindable for Option<T> {
    fn field_type() -> FieldType {
        T::field_type().nullable()
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Null => Ok(None),
            other => T::from_bound(other).map(Some),
        }
    }

    fn is_default_value(&self) -> bool {
        self.is_none()
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

macro_rules! bindable_int {
    ($($ty:ty => $kind:ident, $variant:ident);* $(;)?) => {
        $(
            impl Bindable for $ty {
                fn field_type() -> FieldType {
                    FieldType::new(FieldKind::$kind, stringify!($ty))
                }

                fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
                    match value {
                        BoundValue::$variant(n) => <$ty>::try_from(n)
                            .map_err(|_| ConversionError::invalid(&n.to_string(), stringify!($ty))),
                        other => Err(other.mismatch(stringify!($ty))),
                    }
                }

                fn is_default_value(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

bindable_int! {
    i8 => I8, Signed;
    i16 => I16, Signed;
    i32 => I32, Signed;
    i64 => I64, Signed;
    isize => Isize, Signed;
    u8 => U8, Unsigned;
    u16 => U16, Unsigned;
    u32 => U32, Unsigned;
    u64 => U64, Unsigned;
    usize => Usize, Unsigned;
}

impl Bindable for f64 {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::F64, "f64")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Float(v) => Ok(v),
            other => Err(other.mismatch("f64")),
        }
    }

    fn is_default_value(&self) -> bool {
        *self == 0.0
    }
}

impl Bindable for f32 {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::F32, "f32")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Float(v) => Ok(v as f32),
            other => Err(other.mismatch("f32")),
        }
    }

    fn is_default_value(&self) -> bool {
        *self == 0.0
    }
}

/// Implements [`Bindable`] for a type with a dedicated `BoundValue` variant.
macro_rules! bindable_simple {
    ($ty:ty, $kind:ident, $name:literal, $variant:ident, $default:expr) => {
        impl Bindable for $ty {
            fn field_type() -> FieldType {
                FieldType::new(FieldKind::$kind, $name)
            }

            fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
                match value {
                    BoundValue::$variant(v) => Ok(v),
                    other => Err(other.mismatch($name)),
                }
            }

            fn is_default_value(&self) -> bool {
                *self == $default
            }
        }
    };
}

bindable_simple!(String, String, "string", String, "");
bindable_simple!(bool, Bool, "boolean", Bool, false);
bindable_simple!(char, Char, "char", Char, '\0');
bindable_simple!(Uuid, Uuid, "UUID", Uuid, Uuid::nil());
bindable_simple!(NaiveDate, Date, "date", Date, NaiveDate::default());
bindable_simple!(NaiveTime, Time, "time", Time, NaiveTime::default());
bindable_simple!(NaiveDateTime, DateTime, "date-time", DateTime, NaiveDateTime::default());
bindable_simple!(
    DateTime<Utc>,
    DateTimeUtc,
    "UTC date-time",
    DateTimeUtc,
    DateTime::<Utc>::default()
);
bindable_simple!(
    DateTime<FixedOffset>,
    DateTimeOffset,
    "date-time with offset",
    DateTimeOffset,
    DateTime::<FixedOffset>::default()
);

impl Bindable for FormFile {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::File, "file")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::File(file) => Ok(file),
            other => Err(other.mismatch("file")),
        }
    }

    fn is_default_value(&self) -> bool {
        false
    }
}

impl Bindable for Vec<FormFile> {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::FileList, "file list")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Files(files) => Ok(files),
            BoundValue::File(file) => Ok(vec![file]),
            other => Err(other.mismatch("file list")),
        }
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn absent() -> Option<Self> {
        Some(Vec::new())
    }
}

impl Bindable for FormFiles {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::FileCollection, "file collection")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Files(files) => Ok(FormFiles::new(files)),
            other => Err(other.mismatch("file collection")),
        }
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn absent() -> Option<Self> {
        Some(FormFiles::default())
    }
}

impl Bindable for StreamFile {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::StreamFile, "file stream")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Stream(file) => Ok(file),
            other => Err(other.mismatch("file stream")),
        }
    }

    fn is_default_value(&self) -> bool {
        false
    }
}

impl Bindable for Vec<StreamFile> {
    fn field_type() -> FieldType {
        FieldType::new(FieldKind::StreamFileList, "file stream list")
    }

    fn from_bound(value: BoundValue) -> Result<Self, ConversionError> {
        match value {
            BoundValue::Streams(files) => Ok(files),
            BoundValue::Stream(file) => Ok(vec![file]),
            other => Err(other.mismatch("file stream list")),
        }
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }

    fn absent() -> Option<Self> {
        Some(Vec::new())
    }
}

#[doc(hidden)]
pub fn parse_scalar<T>(raw: &str) -> Result<Arc<dyn Any + Send + Sync>, String>
where
    T: std::str::FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>)
        .map_err(|e| e.to_string())
}

#[doc(hidden)]
pub fn scalar_from_bound<T>(value: BoundValue, type_name: &str) -> Result<T, ConversionError>
where
    T: Clone + Send + Sync + 'static,
{
    match value {
        BoundValue::Other(any) => match any.downcast::<T>() {
            Ok(typed) => Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone())),
            Err(_) => Err(ConversionError::new(format!(
                "cannot bind a scalar value to {}",
                type_name
            ))),
        },
        other => Err(other.mismatch(type_name)),
    }
}

/// Make a `FromStr` type bindable as a request field.
///
/// The type must also be `Clone + Default + PartialEq + Send + Sync`.
///
/// ```rust,ignore
/// #[derive(Clone, Default, PartialEq)]
/// struct Sku(String);
/// impl std::str::FromStr for Sku { /* ... */ }
///
/// fennec_core::bindable_from_str!(Sku);
/// ```
#[macro_export]
macro_rules! bindable_from_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::binding::Bindable for $ty {
                fn field_type() -> $crate::binding::FieldType {
                    $crate::binding::FieldType::new(
                        $crate::binding::FieldKind::Scalar {
                            parse: $crate::binding::value::parse_scalar::<$ty>,
                        },
                        stringify!($ty),
                    )
                }

                fn from_bound(
                    value: $crate::binding::BoundValue,
                ) -> ::std::result::Result<Self, $crate::error::ConversionError> {
                    $crate::binding::value::scalar_from_bound::<$ty>(value, stringify!($ty))
                }

                fn is_default_value(&self) -> bool {
                    *self == <$ty as ::std::default::Default>::default()
                }
            }
        )+
    };
}
