//! Roster assembly: rows → validated members → grouped, ordered document.

use tracing::{info, warn};

use rostersync_shared::{Committee, RawRow, Result, RosterConfig, RosterDocument, TeamMember};

use crate::validator::{self, RowOutcome, RowRejection};

// ---------------------------------------------------------------------------
// Image resolution seam
// ---------------------------------------------------------------------------

/// Attaches a local image file name to a member.
///
/// The production implementation probes and downloads over HTTP; tests and
/// dry runs substitute fakes. An `Err` here is always soft for the batch: the
/// member is published without an image.
#[allow(async_fn_in_trait)]
pub trait ResolveImage {
    /// Return the local file name for the member's image, or `None` when the
    /// member has no usable image reference.
    async fn resolve(&mut self, member: &TeamMember) -> Result<Option<String>>;
}

/// Resolver that never attaches images.
pub struct NoImages;

impl ResolveImage for NoImages {
    async fn resolve(&mut self, _member: &TeamMember) -> Result<Option<String>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Result of assembling the roster from a batch of rows.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The fully formed publishable document.
    pub document: RosterDocument,
    /// Rows that produced a member.
    pub accepted: usize,
    /// Rows filtered by the include flag.
    pub excluded: usize,
    /// Rows skipped for hard schema violations.
    pub rejections: Vec<RowRejection>,
    /// Members that ended up with an `image_name`.
    pub images_attached: usize,
}

/// Build the roster document from mapped rows, in original row order.
///
/// Per-row failures never escalate: rejected rows are collected and the batch
/// continues. The returned document is always complete; callers that cannot
/// produce `rows` at all abort before getting here.
pub async fn build<R: ResolveImage>(
    rows: &[RawRow],
    config: &RosterConfig,
    resolver: &mut R,
) -> BuildOutcome {
    let total = rows.len();
    let mut committees: Vec<Committee> = Vec::new();
    let mut accepted = 0usize;
    let mut excluded = 0usize;
    let mut rejections: Vec<RowRejection> = Vec::new();
    let mut images_attached = 0usize;

    for (i, row) in rows.iter().enumerate() {
        let index = i + 1;
        match validator::validate(index, row) {
            RowOutcome::Excluded => excluded += 1,
            RowOutcome::Rejected(rejection) => {
                warn!(
                    row = rejection.row,
                    name = ?rejection.name,
                    "row rejected, continuing with the rest of the batch"
                );
                rejections.push(rejection);
            }
            RowOutcome::Accepted { mut member, issues } => {
                info!(row = index, total, name = %member.name, "processing record");
                for issue in &issues {
                    warn!(
                        row = index,
                        name = %member.name,
                        field = issue.field,
                        "cleared field: not a well-formed http(s) URL"
                    );
                }

                if member.committee.is_empty() {
                    member.committee = config.default_committee.clone();
                }

                match resolver.resolve(&member).await {
                    Ok(Some(file_name)) => {
                        member.image_name = Some(file_name);
                        images_attached += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            name = %member.name,
                            error = %e,
                            "image resolution failed, publishing without image"
                        );
                    }
                }
                // The remote reference is working state only, never published.
                member.image_url = None;

                push_member(&mut committees, member);
                accepted += 1;
            }
        }
    }

    let committees = sort_committees(committees, &config.sort_order);

    info!(
        accepted,
        excluded,
        rejected = rejections.len(),
        committees = committees.len(),
        "roster assembled"
    );

    BuildOutcome {
        document: RosterDocument {
            team_images: config.image_dir.clone(),
            default_image: config.default_image.clone(),
            types: committees,
        },
        accepted,
        excluded,
        rejections,
        images_attached,
    }
}

/// Append a member to its committee, creating the committee on first sight.
fn push_member(committees: &mut Vec<Committee>, member: TeamMember) {
    match committees.iter_mut().find(|c| c.name == member.committee) {
        Some(committee) => committee.members.push(member),
        None => committees.push(Committee {
            name: member.committee.clone(),
            comment: String::new(),
            members: vec![member],
        }),
    }
}

/// Committees named in `sort_order` first, in that order; the rest follow in
/// first-seen order. Stable and deterministic.
fn sort_committees(committees: Vec<Committee>, sort_order: &[String]) -> Vec<Committee> {
    let (mut listed, unlisted): (Vec<_>, Vec<_>) = committees
        .into_iter()
        .partition(|c| sort_order.contains(&c.name));
    listed.sort_by_key(|c| sort_order.iter().position(|n| n == &c.name));
    listed.extend(unlisted);
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostersync_shared::RosterSyncError;

    fn config() -> RosterConfig {
        RosterConfig {
            sort_order: vec!["Board".into(), "Volunteers".into()],
            ..Default::default()
        }
    }

    fn row(name: &str, committee: &str, chair: &str) -> RawRow {
        RawRow::from_pairs([
            ("name", name),
            ("committee", committee),
            ("chair", chair),
            ("ignore", "yes"),
        ])
    }

    /// Records every member it sees and attaches a deterministic name.
    struct Recording {
        seen: Vec<String>,
    }

    impl ResolveImage for Recording {
        async fn resolve(&mut self, member: &TeamMember) -> Result<Option<String>> {
            self.seen.push(member.name.clone());
            Ok(Some(format!(
                "{}.png",
                member.name.to_lowercase().replace(' ', "_")
            )))
        }
    }

    /// Always fails, like a network outage during download.
    struct Failing;

    impl ResolveImage for Failing {
        async fn resolve(&mut self, _member: &TeamMember) -> Result<Option<String>> {
            Err(RosterSyncError::Network("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn committee_ordering_is_deterministic() {
        let rows = vec![
            row("Vera", "Volunteers", ""),
            row("Olga", "Other", ""),
            row("Bob", "Board", "yes"),
        ];

        let outcome = build(&rows, &config(), &mut NoImages).await;
        let names: Vec<&str> = outcome
            .document
            .types
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Board", "Volunteers", "Other"]);
    }

    #[tokio::test]
    async fn one_member_per_included_row_with_chair_role() {
        let rows = vec![
            row("Jane Doe", "Board", "yes"),
            row("John Roe", "Board", ""),
            RawRow::from_pairs([("name", "Skipped"), ("ignore", "no")]),
        ];

        let outcome = build(&rows, &config(), &mut NoImages).await;
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.excluded, 1);
        assert!(outcome.rejections.is_empty());

        let board = &outcome.document.types[0];
        assert_eq!(board.members.len(), 2);
        assert_eq!(board.members[0].name, "Jane Doe");
        assert_eq!(board.members[0].role, "Chair");
        assert_eq!(board.members[1].role, "");
    }

    #[tokio::test]
    async fn rejected_rows_do_not_stop_the_batch() {
        let rows = vec![
            RawRow::from_pairs([("ignore", "yes")]), // no name
            row("Jane Doe", "Board", ""),
        ];

        let outcome = build(&rows, &config(), &mut NoImages).await;
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].row, 1);
    }

    #[tokio::test]
    async fn blank_committee_falls_back_to_default() {
        let rows = vec![row("Jane Doe", "", "")];
        let outcome = build(&rows, &config(), &mut NoImages).await;
        assert_eq!(outcome.document.types[0].name, "other");
    }

    #[tokio::test]
    async fn resolver_failure_publishes_member_without_image() {
        let rows = vec![row("Jane Doe", "Board", "")];
        let outcome = build(&rows, &config(), &mut Failing).await;

        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.images_attached, 0);
        let member = &outcome.document.types[0].members[0];
        assert!(member.image_name.is_none());
        assert!(member.image_url.is_none());
    }

    #[tokio::test]
    async fn resolver_runs_per_accepted_member_and_remote_url_is_cleared() {
        let mut rows = vec![
            row("Jane Doe", "Board", ""),
            RawRow::from_pairs([("name", "Skipped"), ("ignore", "no")]),
            row("John Roe", "Volunteers", ""),
        ];
        rows[0].insert("image", "https://example.com/jane.jpg");

        let mut resolver = Recording { seen: Vec::new() };
        let outcome = build(&rows, &config(), &mut resolver).await;

        assert_eq!(resolver.seen, vec!["Jane Doe", "John Roe"]);
        assert_eq!(outcome.images_attached, 2);
        let jane = &outcome.document.types[0].members[0];
        assert_eq!(jane.image_name.as_deref(), Some("jane_doe.png"));
        assert!(jane.image_url.is_none());
    }

    #[tokio::test]
    async fn insertion_order_is_preserved_within_committees() {
        let rows = vec![
            row("A", "Board", ""),
            row("B", "Volunteers", ""),
            row("C", "Board", ""),
        ];

        let outcome = build(&rows, &config(), &mut NoImages).await;
        let board = &outcome.document.types[0];
        let names: Vec<&str> = board.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
