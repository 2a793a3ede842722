//! Document identifiers for type-safe entity references.
//!
//! Stored entities are keyed by a 12-byte [`DocumentId`] rendered as 24
//! lowercase hex characters. Use the `define_id!` macro to create type-safe
//! wrappers that prevent accidentally mixing IDs from different entity types.
//!
//! Cart line items use [`LineItemId`], which is either a stored document id
//! (issued by the server) or a `local-<uuid>` id issued by a client-side
//! shadow cart.

use core::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input does not have exactly 24 characters.
    #[error("document id must be {expected} hex characters (got {len})")]
    Length {
        /// Required length.
        expected: usize,
        /// Length of the input.
        len: usize,
    },
    /// The input contains non-hex characters.
    #[error("document id must contain only hex characters")]
    NotHex,
    /// A `local-` id whose suffix is not a UUID.
    #[error("invalid local line item id")]
    InvalidLocal,
    /// A local id was supplied where only stored ids are accepted.
    #[error("local line item ids are not accepted here")]
    UnexpectedLocal,
}

/// A 12-byte document identifier.
///
/// Generated ids start with the creation time in unix seconds (big-endian)
/// followed by 8 random bytes, so they sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId([u8; 12]);

impl DocumentId {
    /// Length of the textual form.
    pub const HEX_LEN: usize = 24;

    /// Generate a fresh document id.
    #[must_use]
    pub fn generate() -> Self {
        let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        let mut bytes = [0_u8; 12];
        let (head, tail) = bytes.split_at_mut(4);
        head.copy_from_slice(&secs.to_be_bytes());
        tail.copy_from_slice(&rand::random::<[u8; 8]>());
        Self(bytes)
    }

    /// Parse a document id from its 24-character hex form.
    ///
    /// Upper-case hex is accepted and normalized to lower case.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Length`] or [`IdError::NotHex`] for malformed input.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != Self::HEX_LEN {
            return Err(IdError::Length {
                expected: Self::HEX_LEN,
                len: s.len(),
            });
        }

        let mut bytes = [0_u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdError::NotHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DocumentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for DocumentId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for DocumentId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&'r str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(s.trim())?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for DocumentId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around [`DocumentId`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]` (validated on input)
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Constructors: `generate()`, `parse()`
/// - `Display`, `FromStr`, and `From<DocumentId>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use shopcart_core::define_id;
/// define_id!(WishlistId);
/// define_id!(ReviewId);
///
/// let wishlist = WishlistId::parse("65f1c0ffee00000000000001").unwrap();
/// let review = ReviewId::generate();
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = review;
/// # let _ = (wishlist, review);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($crate::DocumentId);

        impl $name {
            /// Generate a fresh ID.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::DocumentId::generate())
            }

            /// Parse an ID from its 24-character hex form.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not 24 hex characters.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                $crate::DocumentId::parse(s).map(Self)
            }

            /// Get the underlying document id.
            #[must_use]
            pub const fn as_document_id(&self) -> $crate::DocumentId {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$crate::DocumentId> for $name {
            fn from(id: $crate::DocumentId) -> Self {
                Self(id)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$crate::DocumentId as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$crate::DocumentId as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <$crate::DocumentId as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$crate::DocumentId as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(CartId);

/// Prefix of line item ids issued by a client-side shadow cart.
pub const LOCAL_LINE_PREFIX: &str = "local-";

/// Identifier of a line within a cart.
///
/// Server-issued ids are document ids; shadow carts issue `local-<uuid>` ids
/// so the two can never collide or be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LineItemId {
    /// Issued by the authoritative cart store.
    Stored(DocumentId),
    /// Issued by a client-side shadow cart.
    Local(Uuid),
}

impl LineItemId {
    /// Generate a new server-side line id.
    #[must_use]
    pub fn generate_stored() -> Self {
        Self::Stored(DocumentId::generate())
    }

    /// Generate a new client-side line id.
    #[must_use]
    pub fn generate_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    /// Parse either form of line id.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is neither a document id nor a
    /// `local-<uuid>` id.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        match s.strip_prefix(LOCAL_LINE_PREFIX) {
            Some(rest) => Uuid::parse_str(rest)
                .map(Self::Local)
                .map_err(|_| IdError::InvalidLocal),
            None => DocumentId::parse(s).map(Self::Stored),
        }
    }

    /// Parse a line id that must have been issued by the server.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::UnexpectedLocal`] for `local-` ids, or a parse
    /// error for anything that is not a document id.
    pub fn parse_stored(s: &str) -> Result<Self, IdError> {
        match Self::parse(s)? {
            Self::Local(_) => Err(IdError::UnexpectedLocal),
            stored @ Self::Stored(_) => Ok(stored),
        }
    }

    /// Returns true if the id was issued by a shadow cart.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{id}"),
            Self::Local(uuid) => write!(f, "{LOCAL_LINE_PREFIX}{uuid}"),
        }
    }
}

impl FromStr for LineItemId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LineItemId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LineItemId> for String {
    fn from(id: LineItemId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_round_trip_through_text() {
        let id = DocumentId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), DocumentId::HEX_LEN);
        assert_eq!(DocumentId::parse(&text).unwrap(), id);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            DocumentId::parse("abc"),
            Err(IdError::Length {
                expected: 24,
                len: 3
            })
        );
        assert!(DocumentId::parse("65f1c0ffee000000000000011").is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert_eq!(
            DocumentId::parse("65f1c0ffee00000000000zzz"),
            Err(IdError::NotHex)
        );
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = ProductId::parse("65F1C0FFEE000000000000AB").unwrap();
        assert_eq!(id.to_string(), "65f1c0ffee000000000000ab");
    }

    #[test]
    fn test_typed_id_serde_is_transparent_and_validated() {
        let id = ProductId::parse("65f1c0ffee000000000000ab").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65f1c0ffee000000000000ab\"");
        assert_eq!(serde_json::from_str::<ProductId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<ProductId>("\"not-an-id\"").is_err());
    }

    #[test]
    fn test_line_item_id_forms_are_distinguishable() {
        let stored = LineItemId::generate_stored();
        let local = LineItemId::generate_local();

        assert!(!stored.is_local());
        assert!(local.is_local());
        assert!(local.to_string().starts_with(LOCAL_LINE_PREFIX));
        assert_eq!(LineItemId::parse(&stored.to_string()).unwrap(), stored);
        assert_eq!(LineItemId::parse(&local.to_string()).unwrap(), local);
    }

    #[test]
    fn test_parse_stored_rejects_local_ids() {
        let local = LineItemId::generate_local().to_string();
        assert_eq!(
            LineItemId::parse_stored(&local),
            Err(IdError::UnexpectedLocal)
        );
        assert_eq!(
            LineItemId::parse("local-nope"),
            Err(IdError::InvalidLocal)
        );
    }
}
