//! Untyped event arguments.
//!
//! Emitters fire events with an ordered sequence of [`Variant`] values.
//! Handlers declare typed parameters; [`FromVariant`] performs the checked
//! conversion for each position.

use signalkit_core::{BinaryCodec, CodecError, Decoder, Encoder};

signalkit_core::define_id!(
    /// Identity of an engine object passed as an event argument
    pub ObjectId,
    "Object"
);

/// 2D vector argument
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector argument
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A single untyped event argument
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector2(Vector2),
    Vector3(Vector3),
    Object(ObjectId),
    Array(Vec<Variant>),
}

impl Variant {
    /// Name of the contained type, used in dispatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Nil => "nil",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::Str(_) => "string",
            Variant::Vector2(_) => "vector2",
            Variant::Vector3(_) => "vector3",
            Variant::Object(_) => "object",
            Variant::Array(_) => "array",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    fn tag(&self) -> u8 {
        match self {
            Variant::Nil => 0,
            Variant::Bool(_) => 1,
            Variant::Int(_) => 2,
            Variant::Float(_) => 3,
            Variant::Str(_) => 4,
            Variant::Vector2(_) => 5,
            Variant::Vector3(_) => 6,
            Variant::Object(_) => 7,
            Variant::Array(_) => 8,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Nil => write!(f, "nil"),
            Variant::Bool(v) => write!(f, "{}", v),
            Variant::Int(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Str(v) => write!(f, "{:?}", v),
            Variant::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Variant::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Variant::Object(id) => write!(f, "{}", id),
            Variant::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Checked conversion from an untyped argument to a handler parameter type
pub trait FromVariant: Sized {
    /// Type name reported when the conversion fails
    const TYPE_NAME: &'static str;

    /// Convert, or `None` when the variant holds an incompatible type
    fn from_variant(value: &Variant) -> Option<Self>;
}

impl FromVariant for Variant {
    const TYPE_NAME: &'static str = "any";

    fn from_variant(value: &Variant) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromVariant for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromVariant for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromVariant for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromVariant for u32 {
    const TYPE_NAME: &'static str = "int";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

// Integer arguments widen to float parameters; floats never narrow to ints.
impl FromVariant for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Float(v) => Some(*v),
            Variant::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromVariant for f32 {
    const TYPE_NAME: &'static str = "float";

    fn from_variant(value: &Variant) -> Option<Self> {
        f64::from_variant(value).map(|v| v as f32)
    }
}

impl FromVariant for String {
    const TYPE_NAME: &'static str = "string";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromVariant for Vector2 {
    const TYPE_NAME: &'static str = "vector2";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Vector2(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromVariant for Vector3 {
    const TYPE_NAME: &'static str = "vector3";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Vector3(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromVariant for ObjectId {
    const TYPE_NAME: &'static str = "object";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Object(id) => Some(*id),
            _ => None,
        }
    }
}

impl FromVariant for Vec<Variant> {
    const TYPE_NAME: &'static str = "array";

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl<T: FromVariant> FromVariant for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Nil => Some(None),
            other => T::from_variant(other).map(Some),
        }
    }
}

macro_rules! impl_from_for_variant {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_for_variant! {
    bool => Bool,
    i32 => Int as i64,
    i64 => Int,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    String => Str,
    Vector2 => Vector2,
    Vector3 => Vector3,
    ObjectId => Object,
    Vec<Variant> => Array,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Str(value.to_string())
    }
}

impl From<()> for Variant {
    fn from(_: ()) -> Self {
        Variant::Nil
    }
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
    fn from(value: Option<T>) -> Self {
        value.map_or(Variant::Nil, Into::into)
    }
}

/// Build a `Vec<Variant>` argument list from values convertible into [`Variant`].
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Variant::from($value)),*]
    };
}

fn encode_variant(value: &Variant, enc: &mut Encoder) {
    enc.put_u8(value.tag());
    match value {
        Variant::Nil => {}
        Variant::Bool(v) => enc.put_bool(*v),
        Variant::Int(v) => enc.put_i64(*v),
        Variant::Float(v) => enc.put_f64(*v),
        Variant::Str(v) => enc.put_str(v),
        Variant::Vector2(v) => {
            enc.put_f32(v.x);
            enc.put_f32(v.y);
        }
        Variant::Vector3(v) => {
            enc.put_f32(v.x);
            enc.put_f32(v.y);
            enc.put_f32(v.z);
        }
        Variant::Object(id) => enc.put_u64(id.get()),
        Variant::Array(items) => {
            enc.put_len(items.len());
            for item in items {
                encode_variant(item, enc);
            }
        }
    }
}

/// Deepest array nesting accepted when decoding a [`Variant`]
pub const MAX_NESTING: usize = 64;

/// `depth` counts the arrays enclosing the value being read.
fn decode_variant(dec: &mut Decoder<'_>, depth: usize) -> Result<Variant, CodecError> {
    let value = match dec.take_u8()? {
        0 => Variant::Nil,
        1 => Variant::Bool(dec.take_bool()?),
        2 => Variant::Int(dec.take_i64()?),
        3 => Variant::Float(dec.take_f64()?),
        4 => Variant::Str(dec.take_str()?),
        5 => Variant::Vector2(Vector2::new(dec.take_f32()?, dec.take_f32()?)),
        6 => Variant::Vector3(Vector3::new(
            dec.take_f32()?,
            dec.take_f32()?,
            dec.take_f32()?,
        )),
        7 => Variant::Object(ObjectId::from(dec.take_u64()?)),
        8 if depth >= MAX_NESTING => {
            return Err(CodecError::NestingTooDeep { limit: MAX_NESTING })
        }
        8 => {
            let len = dec.take_len()?;
            // Every element needs at least its tag byte.
            let mut items = Vec::with_capacity(len.min(dec.remaining()));
            for _ in 0..len {
                items.push(decode_variant(dec, depth + 1)?);
            }
            Variant::Array(items)
        }
        tag => {
            return Err(CodecError::InvalidTag {
                tag,
                type_name: "Variant",
            })
        }
    };
    Ok(value)
}

impl BinaryCodec for Variant {
    const VERSION: u8 = 1;

    fn encode_fields(&self, enc: &mut Encoder) {
        encode_variant(self, enc);
    }

    fn decode_fields(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decode_variant(dec, 0)
    }
}
