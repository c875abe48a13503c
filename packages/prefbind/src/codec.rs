//! Value codecs: conversions between typed values and store primitives.
//!
//! Every supported value type names its codec through [`Storable`], so the
//! pair used by a binding is picked at compile time from the declared type.
//! Binding a type without a `Storable` impl does not compile.

use std::marker::PhantomData;

use bytes::Bytes;
use prefs_store::Primitive;
use url::Url;

/// Converts between a value type `V` and the store's primitives.
///
/// Both directions are pure. `decode` returns `None` when the stored entry is
/// absent or cannot be read as `V`; the binding then falls back to its
/// default. `encode` returning `None` means "clear the entry".
///
/// # Implementing Custom Codecs
///
/// ```rust
/// use prefbind::{Codec, Primitive};
///
/// /// Stores a port number as a string, e.g. "8080".
/// struct PortAsString;
///
/// impl Codec<u16> for PortAsString {
///     fn decode(&self, stored: Option<&Primitive>) -> Option<u16> {
///         stored?.as_str()?.parse().ok()
///     }
///
///     fn encode(&self, value: &u16) -> Option<Primitive> {
///         Some(Primitive::from(value.to_string()))
///     }
/// }
/// ```
pub trait Codec<V>: Send + Sync {
    /// Read `V` from a stored primitive, or `None` if it is absent or unusable.
    fn decode(&self, stored: Option<&Primitive>) -> Option<V>;

    /// Turn `V` into the primitive to store, or `None` to clear the entry.
    fn encode(&self, value: &V) -> Option<Primitive>;
}

impl<V, C: Codec<V> + ?Sized> Codec<V> for Box<C> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<V> {
        self.as_ref().decode(stored)
    }

    fn encode(&self, value: &V) -> Option<Primitive> {
        self.as_ref().encode(value)
    }
}

/// A type that can be bound to a store entry.
///
/// Implemented for `bool`, the integer and float types, `String`, `Vec<u8>`,
/// `Bytes`, `Url`, and `Option` of any of these. Enums opt in through
/// [`StringRawValue`] or [`IntegerRawValue`], usually via
/// [`raw_value_enum!`](crate::raw_value_enum).
pub trait Storable: Clone + Send + Sync + 'static {
    type Codec: Codec<Self> + Default + 'static;
}

/// A [`Storable`] type that is not itself optional.
///
/// Only these can be wrapped in `Option`. A nested option has no faithful
/// encoding: `Some(None)` and `None` would both clear the entry.
///
/// ```compile_fail
/// fn storable<T: prefbind::Storable>() {}
/// storable::<Option<Option<i64>>>();
/// ```
pub trait BaseStorable: Storable {}

/// Codec built from a pair of functions.
pub struct FnCodec<D, E> {
    decode: D,
    encode: E,
}

impl<D, E> FnCodec<D, E> {
    pub fn new(decode: D, encode: E) -> Self {
        Self { decode, encode }
    }
}

impl<V, D, E> Codec<V> for FnCodec<D, E>
where
    D: Fn(Option<&Primitive>) -> Option<V> + Send + Sync,
    E: Fn(&V) -> Option<Primitive> + Send + Sync,
{
    fn decode(&self, stored: Option<&Primitive>) -> Option<V> {
        (self.decode)(stored)
    }

    fn encode(&self, value: &V) -> Option<Primitive> {
        (self.encode)(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec<bool> for BoolCodec {
    fn decode(&self, stored: Option<&Primitive>) -> Option<bool> {
        stored?.as_bool()
    }

    fn encode(&self, value: &bool) -> Option<Primitive> {
        Some(Primitive::Bool(*value))
    }
}

impl Storable for bool {
    type Codec = BoolCodec;
}

impl BaseStorable for bool {}

/// Integer types storable as `Primitive::Integer`.
pub trait IntegerValue: Copy + Send + Sync + 'static {
    fn to_i64(self) -> i64;
    fn from_i64(value: i64) -> Option<Self>;
}

macro_rules! integer_value {
    ($($t:ty),*) => {
        $(
            impl IntegerValue for $t {
                fn to_i64(self) -> i64 {
                    self as i64
                }

                fn from_i64(value: i64) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }

            impl Storable for $t {
                type Codec = IntegerCodec<$t>;
            }

            impl BaseStorable for $t {}
        )*
    };
}

integer_value!(i8, i16, i32, i64, isize, u8, u16, u32);

/// Reads `Primitive::Integer` values that fit in `T`; out of range is a
/// decode failure.
pub struct IntegerCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for IntegerCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: IntegerValue> Codec<T> for IntegerCodec<T> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<T> {
        T::from_i64(stored?.as_integer()?)
    }

    fn encode(&self, value: &T) -> Option<Primitive> {
        Some(Primitive::Integer(value.to_i64()))
    }
}

/// Float types storable as `Primitive::Float`.
pub trait FloatValue: Copy + Send + Sync + 'static {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl FloatValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl FloatValue for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

/// Reads `Primitive::Float`, and widens `Primitive::Integer`.
pub struct FloatCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for FloatCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: FloatValue> Codec<T> for FloatCodec<T> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<T> {
        match stored? {
            Primitive::Float(f) => Some(T::from_f64(*f)),
            Primitive::Integer(i) => Some(T::from_f64(*i as f64)),
            _ => None,
        }
    }

    fn encode(&self, value: &T) -> Option<Primitive> {
        Some(Primitive::Float(value.to_f64()))
    }
}

impl Storable for f64 {
    type Codec = FloatCodec<f64>;
}

impl BaseStorable for f64 {}

impl Storable for f32 {
    type Codec = FloatCodec<f32>;
}

impl BaseStorable for f32 {}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn decode(&self, stored: Option<&Primitive>) -> Option<String> {
        stored?.as_str().map(str::to_string)
    }

    fn encode(&self, value: &String) -> Option<Primitive> {
        Some(Primitive::String(value.clone()))
    }
}

impl Storable for String {
    type Codec = StringCodec;
}

impl BaseStorable for String {}

/// Reads `Primitive::Bytes` into `Vec<u8>` or `Bytes`.
pub struct BytesCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for BytesCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: From<Bytes> + AsRef<[u8]>> Codec<T> for BytesCodec<T> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<T> {
        stored?.as_bytes().cloned().map(T::from)
    }

    fn encode(&self, value: &T) -> Option<Primitive> {
        Some(Primitive::Bytes(Bytes::copy_from_slice(value.as_ref())))
    }
}

impl Storable for Vec<u8> {
    type Codec = BytesCodec<Vec<u8>>;
}

impl BaseStorable for Vec<u8> {}

impl Storable for Bytes {
    type Codec = BytesCodec<Bytes>;
}

impl BaseStorable for Bytes {}

/// Stores a URL as its string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlCodec;

impl Codec<Url> for UrlCodec {
    fn decode(&self, stored: Option<&Primitive>) -> Option<Url> {
        Url::parse(stored?.as_str()?).ok()
    }

    fn encode(&self, value: &Url) -> Option<Primitive> {
        Some(Primitive::String(value.as_str().to_string()))
    }
}

impl Storable for Url {
    type Codec = UrlCodec;
}

impl BaseStorable for Url {}

/// Lifts a codec for `T` to `Option<T>`: an absent entry decodes to
/// `Some(None)`, and `None` encodes to clearing the entry.
///
/// A present but unreadable entry is still a decode failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalCodec<C>(pub C);

impl<T, C: Codec<T>> Codec<Option<T>> for OptionalCodec<C> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<Option<T>> {
        match stored {
            None => Some(None),
            Some(p) => self.0.decode(Some(p)).map(Some),
        }
    }

    fn encode(&self, value: &Option<T>) -> Option<Primitive> {
        self.0.encode(value.as_ref()?)
    }
}

impl<T: BaseStorable> Storable for Option<T> {
    type Codec = OptionalCodec<T::Codec>;
}

/// An enum-like type represented in the store by a string.
pub trait StringRawValue: Sized {
    fn raw_value(&self) -> &str;
    fn from_raw_value(raw: &str) -> Option<Self>;
}

/// An enum-like type represented in the store by an integer.
pub trait IntegerRawValue: Sized {
    fn raw_value(&self) -> i64;
    fn from_raw_value(raw: i64) -> Option<Self>;
}

pub struct StringEnumCodec<E>(PhantomData<fn() -> E>);

impl<E> Default for StringEnumCodec<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E: StringRawValue> Codec<E> for StringEnumCodec<E> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<E> {
        E::from_raw_value(stored?.as_str()?)
    }

    fn encode(&self, value: &E) -> Option<Primitive> {
        Some(Primitive::from(value.raw_value()))
    }
}

pub struct IntegerEnumCodec<E>(PhantomData<fn() -> E>);

impl<E> Default for IntegerEnumCodec<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E: IntegerRawValue> Codec<E> for IntegerEnumCodec<E> {
    fn decode(&self, stored: Option<&Primitive>) -> Option<E> {
        E::from_raw_value(stored?.as_integer()?)
    }

    fn encode(&self, value: &E) -> Option<Primitive> {
        Some(Primitive::Integer(value.raw_value()))
    }
}

/// Implement [`StringRawValue`] or [`IntegerRawValue`], plus [`Storable`] and
/// [`BaseStorable`], for a fieldless enum.
///
/// ```rust
/// use prefbind::{raw_value_enum, StringRawValue};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Theme {
///     Light,
///     Dark,
/// }
///
/// raw_value_enum!(Theme: String {
///     Light => "light",
///     Dark => "dark",
/// });
///
/// assert_eq!(Theme::Dark.raw_value(), "dark");
/// assert_eq!(Theme::from_raw_value("light"), Some(Theme::Light));
/// ```
#[macro_export]
macro_rules! raw_value_enum {
    ($ty:ty : String { $($variant:ident => $raw:literal),+ $(,)? }) => {
        impl $crate::StringRawValue for $ty {
            fn raw_value(&self) -> &str {
                match self {
                    $(Self::$variant => $raw,)+
                }
            }

            fn from_raw_value(raw: &str) -> ::std::option::Option<Self> {
                match raw {
                    $($raw => ::std::option::Option::Some(Self::$variant),)+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::Storable for $ty {
            type Codec = $crate::StringEnumCodec<$ty>;
        }

        impl $crate::BaseStorable for $ty {}
    };
    ($ty:ty : i64 { $($variant:ident => $raw:literal),+ $(,)? }) => {
        impl $crate::IntegerRawValue for $ty {
            fn raw_value(&self) -> i64 {
                match self {
                    $(Self::$variant => $raw,)+
                }
            }

            fn from_raw_value(raw: i64) -> ::std::option::Option<Self> {
                match raw {
                    $($raw => ::std::option::Option::Some(Self::$variant),)+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::Storable for $ty {
            type Codec = $crate::IntegerEnumCodec<$ty>;
        }

        impl $crate::BaseStorable for $ty {}
    };
}
