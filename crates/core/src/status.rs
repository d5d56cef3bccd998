//! Text-backed lifecycle enums.
//!
//! Each variant's string form matches the value stored in the corresponding
//! `TEXT` column and the `CHECK` constraint in the migrations.

use crate::error::CoreError;

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the stored string value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::InvalidArgument(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$($val),+].join(", ")
                    ))),
                }
            }
        }
    };
}

define_text_enum! {
    /// Project lifecycle status.
    ProjectStatus {
        Active = "ACTIVE",
        Done = "DONE",
    }
}

define_text_enum! {
    /// Project membership role, highest privilege first.
    MemberRole {
        Owner = "OWNER",
        Admin = "ADMIN",
        Member = "MEMBER",
    }
}

define_text_enum! {
    /// Project membership status.
    MemberStatus {
        Invited = "INVITED",
        Active = "ACTIVE",
    }
}

define_text_enum! {
    /// Issue workflow status.
    IssueStatus {
        Unassigned = "UNASSIGNED",
        InProgress = "IN_PROGRESS",
        Done = "DONE",
    }
}

impl MemberRole {
    /// OWNER or ADMIN.
    pub fn is_manager(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}
