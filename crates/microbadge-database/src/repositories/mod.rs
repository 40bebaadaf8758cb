//! PostgreSQL implementations of the store traits.

pub mod audit;
pub mod badge;
pub mod directory;
pub mod event;
pub mod grant;
pub mod points;
pub mod quota;
pub mod rule;

pub use audit::AuditLogRepository;
pub use badge::BadgeRepository;
pub use directory::DirectoryRepository;
pub use event::EventRepository;
pub use grant::GrantRepository;
pub use points::PointRepository;
pub use quota::QuotaRepository;
pub use rule::RuleRepository;
