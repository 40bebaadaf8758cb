//! Newtype wrappers around `String` for all domain entity identifiers.
//!
//! Identifiers in MicroBadge are opaque strings assigned by whoever creates
//! the record (`"B001"`, `"RULE-123456"`, `"EVT-9F2C01AB"`, UUIDs for
//! engine-created rows). Using distinct types prevents accidentally passing
//! a `UserId` where a `BadgeId` is expected. When the `sqlx` feature is
//! enabled, each ID type also encodes and decodes as PostgreSQL `TEXT`.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `String`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Create a fresh, time-ordered identifier.
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a person who can hold badges or grant them.
    UserId
);

define_id!(
    /// Identifier of a badge definition.
    BadgeId
);

define_id!(
    /// Identifier of an automatic grant rule.
    RuleId
);

define_id!(
    /// Identifier of an intake event.
    EventId
);

define_id!(
    /// Identifier of a user-badge grant record.
    GrantId
);

define_id!(
    /// Identifier of a point ledger entry.
    PointTransactionId
);

define_id!(
    /// Identifier of a quota definition.
    QuotaId
);

define_id!(
    /// Identifier of an organization node.
    OrgId
);

define_id!(
    /// Identifier of a user tag.
    TagId
);

define_id!(
    /// Identifier of an audit log entry.
    AuditLogId
);

impl EventId {
    /// Create an intake event identifier of the form `EVT-1A2B3C4D`.
    pub fn generate_event() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("EVT-{}", simple[..8].to_uppercase()))
    }
}
