//! Persisted entity models (spec §3): tagged enums and record structs for
//! every entity the catalog, lock manager, history, and version gate own.

mod enums;
mod history;
mod lock;
mod table_definition;
mod table_schema;
mod tenant;
mod version_memo;

pub use enums::{DatabaseType, ExecutionStatus, LockType, MigrationType, PartitionType, TimeInterval};
pub use history::MigrationHistoryEntry;
pub use lock::{LockKey, MigrationLock};
pub use table_definition::{Column, ColumnType, DefaultValue, Index, TableDefinition};
pub use table_schema::TableSchema;
pub use tenant::{ActivePredicate, StoreDirectoryConfig, TenantDescriptor, TenantStatus};
pub use version_memo::{MigrationVersion, PartitionRule};
