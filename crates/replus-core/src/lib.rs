//! # replus-core
//!
//! Domain model and workflows for the replus workout tracker.
//!
//! Everything here is independent of HTTP and of the storage engine. The
//! storage engine is reached through the [`WorkoutRepository`] trait, and
//! every operation takes the caller's [`UserId`] explicitly.
//!
//! ## Key Types
//!
//! - [`Session`], [`Exercise`], [`Line`] - the three owned entity kinds
//! - [`WorkoutService`] - query facade and the create/rename/delete pipeline
//! - [`WorkoutError`] - duplicate name, not found, validation and storage errors
//!
//! ## Saving
//!
//! Every save runs the same steps in order:
//!
//! 1. validate the raw form fields
//! 2. attach the owner and parent references
//! 3. reject case-insensitive name collisions (inserts only)
//! 4. derive or refresh the slug
//! 5. commit, translating storage unique violations into [`WorkoutError::DuplicateName`]
//!
//! ```rust,ignore
//! use replus_core::{NameForm, UserId, WorkoutService};
//!
//! let service = WorkoutService::new(repo);
//! let user = UserId(1);
//! let session = service.create_session(user, &NameForm::new("Leg Day"))?;
//! assert_eq!(session.slug, "leg-day");
//! ```

mod error;
mod repository;
pub mod slug;
pub mod stats;
mod types;
pub mod validate;
mod workouts;

pub use error::{FieldErrors, StoreError, UniqueField, WorkoutError};
pub use repository::{NameScope, WorkoutRepository};
pub use stats::{average_reps, ExerciseStats, UserStats};
pub use types::{
    EntityKind, Exercise, ExerciseDraft, Line, LineDraft, LineForm, NameForm, Scope, Session,
    SessionDraft, UserId,
};
pub use workouts::WorkoutService;
