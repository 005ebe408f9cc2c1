//! Core types for a scan run
//!
//! Defines the values that flow through the engine:
//! - Project and scan identifiers
//! - Scope selection (organization, folder or single project)
//! - Tri-state enablement signals and usage evidence
//! - Per-project classification rows and the ordered report

use crate::error::ConfigurationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque project identifier, unique within a scope
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a project identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique scan run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Ulid);

impl ScanId {
    /// Generate new scan ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource-hierarchy node whose descendant projects are scanned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    /// Organization identifier
    Organization(String),
    /// Folder identifier
    Folder(String),
}

impl Scope {
    /// Build a scope from an organization/folder selection
    ///
    /// # Errors
    /// - `ConfigurationError::NoScope` if neither is supplied
    /// - `ConfigurationError::ConflictingScopes` if both are supplied
    /// - `ConfigurationError::EmptyIdentifier` if the supplied id is blank
    pub fn from_selection(
        organization: Option<&str>,
        folder: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let (kind, id) = pick_one(&[("organization", organization), ("folder", folder)])?;
        Ok(match kind {
            "organization" => Self::Organization(id),
            _ => Self::Folder(id),
        })
    }

    /// Scope identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Organization(id) | Self::Folder(id) => id,
        }
    }

    /// Scope kind as a lowercase word
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Organization(_) => "organization",
            Self::Folder(_) => "folder",
        }
    }

    /// Reject blank identifiers on scopes built without `from_selection`
    ///
    /// # Errors
    /// `ConfigurationError::EmptyIdentifier` if the id is blank
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.id().trim().is_empty() {
            return Err(ConfigurationError::EmptyIdentifier(self.kind()));
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.id())
    }
}

/// What a scan run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanTarget {
    /// Every project enumerated under a scope
    Scope(Scope),
    /// One explicitly named project
    Project(ProjectId),
}

impl ScanTarget {
    /// Build a target from the three mutually exclusive selectors
    ///
    /// # Errors
    /// - `ConfigurationError::NoScope` if nothing is supplied
    /// - `ConfigurationError::ConflictingScopes` if more than one is supplied
    /// - `ConfigurationError::EmptyIdentifier` if the supplied id is blank
    pub fn from_selection(
        organization: Option<&str>,
        folder: Option<&str>,
        project: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let (kind, id) = pick_one(&[
            ("organization", organization),
            ("folder", folder),
            ("project", project),
        ])?;
        Ok(match kind {
            "organization" => Self::Scope(Scope::Organization(id)),
            "folder" => Self::Scope(Scope::Folder(id)),
            _ => Self::Project(ProjectId::new(id)),
        })
    }

    /// Reject blank identifiers
    ///
    /// # Errors
    /// `ConfigurationError::EmptyIdentifier` if the id is blank
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Scope(scope) => scope.validate(),
            Self::Project(id) if id.as_str().trim().is_empty() => {
                Err(ConfigurationError::EmptyIdentifier("project"))
            }
            Self::Project(_) => Ok(()),
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scope(scope) => scope.fmt(f),
            Self::Project(id) => write!(f, "project/{id}"),
        }
    }
}

fn pick_one(
    selectors: &[(&'static str, Option<&str>)],
) -> Result<(&'static str, String), ConfigurationError> {
    let supplied: Vec<(&'static str, &str)> = selectors
        .iter()
        .filter_map(|(kind, id)| id.map(|id| (*kind, id)))
        .collect();

    match supplied.as_slice() {
        [] => Err(ConfigurationError::NoScope),
        [(kind, id)] => {
            let kind = *kind;
            let id = id.trim();
            if id.is_empty() {
                return Err(ConfigurationError::EmptyIdentifier(kind));
            }
            Ok((kind, id.to_string()))
        }
        many => Err(ConfigurationError::ConflictingScopes(
            many.iter().map(|(kind, _)| *kind).collect(),
        )),
    }
}

/// A project to scan, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Project identifier
    pub id: ProjectId,
    /// Scope the project was enumerated under (`None` for single-project runs)
    pub scope: Option<Scope>,
}

impl Project {
    /// Project found while enumerating `scope`
    #[inline]
    #[must_use]
    pub fn enumerated(id: ProjectId, scope: Scope) -> Self {
        Self {
            id,
            scope: Some(scope),
        }
    }

    /// Project named directly by the operator
    #[inline]
    #[must_use]
    pub fn standalone(id: ProjectId) -> Self {
        Self { id, scope: None }
    }
}

/// Tri-state enablement signal
///
/// `Unknown` means the probe failed; it is never folded into `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Confirmed enabled
    Enabled,
    /// Confirmed not enabled
    Disabled,
    /// Probe failed
    Unknown,
}

impl Signal {
    /// Whether the signal is a confirmed `Enabled`
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Whether the signal is a confirmed value
    #[inline]
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Operator-facing label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Enabled => "Yes",
            Self::Disabled => "No",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which detection stage produced the usage evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    /// Legacy-registry bucket naming convention matched
    StorageHeuristic,
    /// Legacy registry image listing
    ImageListing,
    /// No detection stage ran to completion
    None,
}

/// Whether a usage result was positively verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Verified by a recognized response
    Confirmed,
    /// Defaulted because the response could not be interpreted
    Assumed,
}

/// Evidence that the legacy registry holds data for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageEvidence {
    /// Whether legacy images were found
    pub found: bool,
    /// Stage that produced the result
    pub source: UsageSource,
    /// Whether the result was verified
    pub confidence: Confidence,
}

impl UsageEvidence {
    /// A legacy-registry bucket was found
    #[inline]
    #[must_use]
    pub fn storage_hit() -> Self {
        Self {
            found: true,
            source: UsageSource::StorageHeuristic,
            confidence: Confidence::Confirmed,
        }
    }

    /// The image listing succeeded; `found` reflects whether it was non-empty
    #[inline]
    #[must_use]
    pub fn listed(found: bool) -> Self {
        Self {
            found,
            source: UsageSource::ImageListing,
            confidence: Confidence::Confirmed,
        }
    }

    /// The registry namespace does not exist
    #[inline]
    #[must_use]
    pub fn namespace_absent() -> Self {
        Self::listed(false)
    }

    /// The image listing failed in an unrecognized way
    #[inline]
    #[must_use]
    pub fn assumed_absent() -> Self {
        Self {
            found: false,
            source: UsageSource::ImageListing,
            confidence: Confidence::Assumed,
        }
    }

    /// Detection deliberately not run (legacy API confirmed disabled)
    #[inline]
    #[must_use]
    pub fn not_probed() -> Self {
        Self {
            found: false,
            source: UsageSource::None,
            confidence: Confidence::Confirmed,
        }
    }

    /// Detection never produced a result
    #[inline]
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            found: false,
            source: UsageSource::None,
            confidence: Confidence::Assumed,
        }
    }

    /// Whether the evidence is a defaulted guess
    #[inline]
    #[must_use]
    pub fn is_assumed(&self) -> bool {
        self.confidence == Confidence::Assumed
    }

    /// Operator-facing label; assumed negatives stay distinguishable
    #[must_use]
    pub fn label(&self) -> &'static str {
        match (self.found, self.confidence) {
            (true, _) => "Yes",
            (false, Confidence::Confirmed) => "No",
            (false, Confidence::Assumed) => "No (assumed)",
        }
    }
}

impl fmt::Display for UsageEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Advisory note attached to each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Note {
    /// Next-gen registry API is enabled
    NextGenAdopted,
    /// Legacy usage found without next-gen adoption
    MigrationNeeded,
    /// Nothing actionable
    NoAction,
}

impl Note {
    /// Note text as shown to the operator
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NextGenAdopted => "Already using next-gen registry",
            Self::MigrationNeeded => "Potential migration needed",
            Self::NoAction => "-",
        }
    }
}

impl From<Note> for &'static str {
    fn from(note: Note) -> Self {
        note.as_str()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one project; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// Project the row describes
    pub project_id: ProjectId,
    /// Legacy registry API enablement (informational)
    pub legacy_api: Signal,
    /// Legacy registry usage evidence
    pub usage: UsageEvidence,
    /// Next-gen registry API enablement
    pub next_gen_api: Signal,
    /// Advisory note
    pub note: Note,
}

impl ClassificationResult {
    /// Row for a project whose pipeline failed outright
    #[must_use]
    pub fn degraded(project_id: ProjectId) -> Self {
        let usage = UsageEvidence::unavailable();
        Self {
            project_id,
            legacy_api: Signal::Unknown,
            usage,
            next_gen_api: Signal::Unknown,
            note: crate::classifier::classify(Signal::Unknown, usage, Signal::Unknown),
        }
    }

    /// Next-gen adopted while legacy images are still present
    ///
    /// The note reports adoption only; this exposes the suppressed residue.
    #[inline]
    #[must_use]
    pub fn legacy_residue(&self) -> bool {
        self.next_gen_api.is_enabled() && self.usage.found
    }

    /// Whether any signal in the row is a degraded value
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.legacy_api.is_known() || !self.next_gen_api.is_known() || self.usage.is_assumed()
    }
}

/// Ordered scan output, indexed like the enumeration
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Run identifier
    pub scan_id: ScanId,
    /// What was scanned
    pub target: ScanTarget,
    /// One row per finished project, in enumeration order
    pub rows: Vec<ClassificationResult>,
    /// Projects never started because the run was cancelled, in enumeration order
    pub skipped: Vec<ProjectId>,
    /// Whether the run was cancelled before completion
    pub cancelled: bool,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    /// Rows in enumeration order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[ClassificationResult] {
        &self.rows
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the report has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every enumerated project has a row
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.skipped.is_empty()
    }

    /// Project ids of the rows, in order
    pub fn project_ids(&self) -> impl Iterator<Item = &ProjectId> {
        self.rows.iter().map(|row| &row.project_id)
    }

    /// Rows carrying at least one degraded signal
    pub fn degraded_rows(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.rows.iter().filter(|row| row.is_degraded())
    }
}
