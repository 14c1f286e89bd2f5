//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` table, and its name matches the `name` column.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// All variants in seed order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Database `name` value.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Parse from a database status ID.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Internal(format!(
                        concat!("Unknown ", stringify!($name), " id {}"),
                        other
                    ))),
                }
            }

            /// Parse from a status name (case-insensitive).
            pub fn from_name(name: &str) -> Result<Self, CoreError> {
                let lowered = name.trim().to_ascii_lowercase();
                match lowered.as_str() {
                    $( $label => Ok($name::$variant), )+
                    _ => Err(CoreError::Validation(format!(
                        "Invalid status '{name}'. Must be one of: {:?}",
                        [$( $label ),+]
                    ))),
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Order lifecycle status.
    OrderStatus {
        Pending = 1 => "pending",
        Paid = 2 => "paid",
        Processing = 3 => "processing",
        Shipped = 4 => "shipped",
        Delivered = 5 => "delivered",
        Cancelled = 6 => "cancelled",
        Refunded = 7 => "refunded",
    }
}

define_status_enum! {
    /// Support ticket status.
    TicketStatus {
        Open = 1 => "open",
        Answered = 2 => "answered",
        Closed = 3 => "closed",
    }
}
