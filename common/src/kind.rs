//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// Variants are stored as `INT2` in Postgres and are (de)serialized as
/// `SCREAMING_SNAKE_CASE` strings.
///
/// # Example
///
/// ```rust
/// use common::define_kind;
///
/// define_kind! {
///     #[doc = "Status of a booking."]
///     enum Status {
///         #[doc = "Awaiting a decision."]
///         Pending = 1,
///
///         #[doc = "Accepted."]
///         Confirmed = 2,
///     }
/// }
///
/// assert_eq!(Status::from_u8(2), Some(Status::Confirmed));
/// assert_eq!(Status::Pending.to_string(), "PENDING");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $crate::__with_serde! {
            #[derive(
                Clone,
                Copy,
                Debug,
                $crate::private::strum::Display,
                $crate::private::strum::EnumString,
                Eq,
                Hash,
                PartialEq,
            )]
            #[doc = $doc]
            #[repr(u8)]
            #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
            pub enum $name {
                $(
                     #[doc = $variant_doc]
                     $variant = $value,
                )*
            }
        }

        impl $name {
            /// All the variants of this kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Converts the provided [`u8`] representation back into a
            /// variant, if it denotes any.
            #[must_use]
            pub fn from_u8(value: u8) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.u8() == value)
            }
        }

        $(
            impl $crate::FromParam<$value> for $name {
                const VALUE: $name = $name::$variant;
            }
        )*

        $crate::__with_postgres! {
            impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
                $crate::private::postgres_types::accepts!(INT2);

                fn from_sql(
                    ty: &$crate::private::postgres_types::Type,
                    raw: &[u8],
                ) -> Result<
                    $name,
                    Box<dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send>,
                > {
                    let v = u8::try_from(
                        <i16 as $crate::private::postgres_types::FromSql<'_>>::from_sql(
                            ty, raw,
                        )?,
                    )?;
                    Self::from_u8(v).ok_or_else(|| ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    ).into())
                }
            }

            impl $crate::private::postgres_types::ToSql for $name {
                $crate::private::postgres_types::accepts!(INT2);
                $crate::private::postgres_types::to_sql_checked!();

                fn to_sql(
                    &self,
                    ty: &$crate::private::postgres_types::Type,
                    w: &mut $crate::private::postgres_types::private::BytesMut,
                ) -> Result<
                    $crate::private::postgres_types::IsNull,
                    ::std::boxed::Box<
                        dyn ::std::error::Error
                            + ::core::marker::Sync
                            + ::core::marker::Send
                    >,
                > {
                    <i16 as $crate::private::postgres_types::ToSql>::to_sql(
                        &i16::from(self.u8()),
                        ty,
                        w,
                    )
                }
            }
        }
    };
}

/// Emits the provided items with Serde derives, if the `serde` feature of
/// this crate is enabled.
#[cfg(feature = "serde")]
#[doc(hidden)]
#[macro_export]
macro_rules! __with_serde {
    ($item:item) => {
        #[derive(
            $crate::private::serde::Deserialize,
            $crate::private::serde::Serialize,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        $item
    };
}

/// Emits the provided items with Serde derives, if the `serde` feature of
/// this crate is enabled.
#[cfg(not(feature = "serde"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __with_serde {
    ($item:item) => {
        $item
    };
}

/// Emits the provided items, if the `postgres` feature of this crate is
/// enabled.
#[cfg(feature = "postgres")]
#[doc(hidden)]
#[macro_export]
macro_rules! __with_postgres {
    ($($item:item)*) => {
        $($item)*
    };
}

/// Emits the provided items, if the `postgres` feature of this crate is
/// enabled.
#[cfg(not(feature = "postgres"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __with_postgres {
    ($($item:item)*) => {};
}

/// Helper trait converting const parameter to a value.
pub trait FromParam<const PARAM: u8> {
    /// Value of the parameter.
    const VALUE: Self;
}
