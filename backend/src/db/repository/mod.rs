//! Repository trait definitions for the storage layer.
//!
//! Each persisted entity has its own focused trait. Every adapter (REST,
//! raw SQL, in-memory, and the fallback chain itself) implements all of them,
//! so callers never depend on a particular backend.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`user`]: users (lookup by id or username)
//! - [`professional`]: professionals
//! - [`activity_type`]: activity types (lookup by id or code)
//! - [`time_slot`]: time slots
//! - [`schedule`]: weekly schedule rows, plus the connection health check
//!
//! # Contract
//!
//! The same shape repeats for every entity:
//!
//! | Operation | Returns | "Nothing matched" |
//! |---|---|---|
//! | `get_*` | `Option<T>` | `Ok(None)` |
//! | `list_*` | `Vec<T>` ordered by a documented key | `Ok(vec![])` |
//! | `create_*` | `T` with server-assigned fields | n/a; constraint violations are `PersistenceError` |
//! | `update_*` | `Option<T>` | `Ok(None)`, no row is created |
//! | `delete_*` | `bool` | `Ok(false)` |
//!
//! Each call is exactly one round trip to the backend. There is no caching or
//! batching.
//!
//! # Convenience Trait Bound
//!
//! ```ignore
//! async fn weekly_view<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let professionals = repo.list_professionals().await?;
//!     let monday = repo.list_schedules(&ScheduleFilter::by_day(Weekday::Segunda)).await?;
//!     Ok(())
//! }
//! ```

pub mod activity_type;
pub mod error;
pub mod professional;
pub mod schedule;
pub mod time_slot;
pub mod user;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use activity_type::ActivityTypeRepository;
pub use professional::ProfessionalRepository;
pub use schedule::ScheduleRepository;
pub use time_slot::TimeSlotRepository;
pub use user::UserRepository;

/// Composite trait bound for a complete storage backend.
///
/// Automatically implemented for any type implementing all five entity traits.
pub trait FullRepository:
    UserRepository
    + ProfessionalRepository
    + ActivityTypeRepository
    + TimeSlotRepository
    + ScheduleRepository
{
}

// Blanket implementation: any type implementing all five traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: UserRepository
        + ProfessionalRepository
        + ActivityTypeRepository
        + TimeSlotRepository
        + ScheduleRepository
{
}
