//! Managed SQL worklist
//!
//! Raw findings from audit plans and audit records collapse into one item
//! per dedup key. Producers only ever merge; status, remark and assignees
//! belong to humans and change through [`triage`] alone.
//!
//! - [`key`]: dedup key builder
//! - [`merge`]: batch insert-or-merge
//! - [`filter`] / [`query`]: filtered, paginated reads
//! - [`summary`]: total / bad / solved counts
//! - [`triage`]: workflow updates and soft delete

pub mod filter;
pub mod key;
pub mod merge;
pub mod query;
pub mod summary;
pub mod triage;
pub mod types;

pub use filter::{Pagination, Predicate, SqlManageFilter};
pub use key::DedupKey;
pub use merge::{merge_batch, MergeReport};
pub use query::{find_by_dedup_key, get_item, list_all, query};
pub use summary::{is_bad, tally, SqlManageSummary};
pub use triage::{soft_delete, update_items, SqlManageUpdate};
pub use types::{
    AuditResult, ManagedSqlItem, RawFinding, SqlManageList, SqlManageSource, SqlManageStatus,
    SqlManageView,
};
