//! Roadmap domain models.
//!
//! Provides the data types the allocator consumes and produces: stories,
//! developers, configuration, the workday calendar and run diagnostics.
//!
//! # Field ownership
//!
//! | Owned by the backlog | Owned by the allocator |
//! |----------------------|------------------------|
//! | `id`, `size`, `status` | `developer_id` |
//! | `priority`, `wave` | `start_date`, `end_date` |
//! | `dependencies` | `duration`, `schedule_order` |

mod calendar;
mod config;
mod developer;
mod diagnostic;
mod story;

pub use calendar::{Period, WorkCalendar};
pub use config::{AllocationConfig, AllocationPolicy, RepairLimits, Velocity};
pub use developer::Developer;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use story::{ScheduleFields, Story, StoryStatus, STORY_POINTS, WAVE_WEIGHT};
