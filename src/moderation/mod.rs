/// Moderation core
///
/// Role hierarchy, ban and report ledgers, and the service that drives
/// ban/unban, report/dismiss, role changes and deletion.
pub mod bans;
pub mod reports;
pub mod roles;
pub mod service;
pub mod target;

pub use bans::{BanLedger, ACCOUNT_UNBAN_PREFIX};
pub use reports::ReportLedger;
pub use roles::Role;
pub use service::{ModerationService, MAX_REASON_LENGTH};
pub use target::{BanTarget, ReportTarget};
