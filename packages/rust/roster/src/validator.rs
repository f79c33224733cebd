//! Row validation: one raw spreadsheet row → a team member, or a rejection.
//!
//! Validation severity is two-tier and explicit: a missing required field
//! rejects the whole record, while a malformed optional URL only clears that
//! field. Both show up as [`FieldIssue`]s so the policy is visible to callers
//! and tests rather than silently swallowed.

use rostersync_shared::{RawRow, TeamMember};
use url::Url;

/// Role label applied when the chair flag is affirmative.
pub const CHAIR_ROLE: &str = "Chair";

/// Flag value treated as affirmative, compared case-insensitively.
const AFFIRMATIVE: &str = "yes";

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// What happened to one field during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The value was malformed and the field was cleared; the record survives.
    Cleared,
    /// The field violation rejected the whole record.
    RecordRejected,
}

/// One field-level validation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub outcome: FieldOutcome,
}

/// A rejected row, identified by spreadsheet row number and member name when
/// one was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub row: usize,
    pub name: Option<String>,
    pub issues: Vec<FieldIssue>,
}

/// Result of validating a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The include flag was not affirmative. A normal filter, not an error.
    Excluded,
    /// The row produced a member; `issues` lists any cleared URL fields.
    Accepted {
        member: TeamMember,
        issues: Vec<FieldIssue>,
    },
    /// The row violated a hard rule and is skipped.
    Rejected(RowRejection),
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one mapped row. `index` is the 1-based spreadsheet row number,
/// used only for reporting.
///
/// The `ignore` column opts a row IN when affirmative; the column name is a
/// historical misnomer carried by the source spreadsheet.
pub fn validate(index: usize, row: &RawRow) -> RowOutcome {
    if !is_affirmative(row.get_trimmed("ignore")) {
        return RowOutcome::Excluded;
    }

    let name = row.get_trimmed("name");
    if name.is_empty() {
        return RowOutcome::Rejected(RowRejection {
            row: index,
            name: None,
            issues: vec![FieldIssue {
                field: "name",
                outcome: FieldOutcome::RecordRejected,
            }],
        });
    }

    let mut member = TeamMember::named(name);
    member.committee = row.get_trimmed("committee").to_string();
    if is_affirmative(row.get_trimmed("chair")) {
        member.role = CHAIR_ROLE.into();
    }

    let mut issues: Vec<FieldIssue> = Vec::new();
    let mut url_field = |field: &'static str| -> Option<Url> {
        let value = row.get_trimmed(field);
        if value.is_empty() {
            return None;
        }
        match parse_http_url(value) {
            Some(url) => Some(url),
            None => {
                issues.push(FieldIssue {
                    field,
                    outcome: FieldOutcome::Cleared,
                });
                None
            }
        }
    };

    member.github = url_field("github");
    member.linkedin = url_field("linkedin");
    member.website = url_field("website");
    member.twitter = url_field("twitter");
    member.bluesky = url_field("bluesky");
    member.mastodon = url_field("mastodon");
    member.image_url = url_field("image");

    RowOutcome::Accepted { member, issues }
}

fn is_affirmative(value: &str) -> bool {
    value.eq_ignore_ascii_case(AFFIRMATIVE)
}

/// Parse a well-formed http(s) URL; anything else is `None`.
fn parse_http_url(value: &str) -> Option<Url> {
    let url = Url::parse(value).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
