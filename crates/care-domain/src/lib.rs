// care-domain library entry point
pub mod benefit;
pub mod catalog;
pub mod error;
pub mod note;
pub mod participant;
pub mod phase;
pub mod progress_event;
pub mod submission;
pub use benefit::{format_cents, Benefit, BenefitType};
pub use catalog::{CatalogEntry, EventCatalog, EventMultiset, DEFAULT_PROGRAM_MONTHS};
pub use error::{DateField, ValidationError};
pub use note::ParticipantNote;
pub use participant::Participant;
pub use phase::{ParticipantStatus, Phase};
pub use progress_event::ProgressEvent;
pub use submission::{check_dates, EventSubmission};
