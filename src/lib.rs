pub mod layout;
pub mod checksum;
pub mod crypto;
pub mod types;
pub mod icf;
pub mod sysfile;
pub mod sync;
pub mod config;

pub use layout::{FixedLayout, FixedStr, LayoutError};
pub use types::{Timestamp, Version};
pub use icf::{EntryType, Icf, IcfEntry, IcfError, IcfHeader};
pub use sysfile::{get_record, update_record, RecordKind, Slot, SysData, SysRecord, SysfileError};
pub use sync::{reconcile, BookkeepingPolicy, CreditPolicy, SyncError, SyncPolicy};
pub use config::{Config, ConfigError};
