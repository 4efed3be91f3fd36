//! Status helper enums mapping to SMALLINT columns.
//!
//! Each enum variant's discriminant matches the numeric value stored in the
//! corresponding status column. No magic numbers in queries — always go
//! through `.id()`.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Generation job lifecycle status.
    JobStatus {
        /// Admitted, waiting for a processor claim.
        Queued = 1,
        /// Claimed by a processor; `started_at` is set.
        Processing = 2,
        /// Finished with a result image; `completed_at` is set.
        Completed = 3,
        /// Finished with an error message; `completed_at` is set.
        Failed = 4,
    }
}

impl JobStatus {
    /// Human-readable status string used in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Resolve a raw status id back to the enum. Unknown ids are treated
    /// as failed so a corrupt row never looks live.
    pub fn from_id(id: StatusId) -> JobStatus {
        match id {
            1 => JobStatus::Queued,
            2 => JobStatus::Processing,
            3 => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }
}
