//! Record validation and roster assembly.
//!
//! [`validator`] turns one raw spreadsheet row into a validated
//! [`TeamMember`](rostersync_shared::TeamMember) or an explicit rejection;
//! [`builder`] runs the validator over a whole sheet, resolves member images
//! through a pluggable seam, and assembles the ordered, publishable
//! [`RosterDocument`](rostersync_shared::RosterDocument).

pub mod builder;
pub mod validator;

pub use builder::{BuildOutcome, NoImages, ResolveImage, build};
pub use validator::{CHAIR_ROLE, FieldIssue, FieldOutcome, RowOutcome, RowRejection, validate};
