//! Verdict classification
//!
//! Fixed precedence:
//! 1. Next-gen API enabled wins, even with legacy usage present
//! 2. Legacy usage found means migration is needed
//! 3. Otherwise nothing is actionable
//!
//! The legacy API signal is carried in the row for context but never gates
//! the note; usage evidence drives urgency.

use crate::types::{Note, Signal, UsageEvidence};

/// Classify one project's signals into a note
#[must_use]
pub fn classify(_legacy_api: Signal, usage: UsageEvidence, next_gen_api: Signal) -> Note {
    if next_gen_api.is_enabled() {
        Note::NextGenAdopted
    } else if usage.found {
        Note::MigrationNeeded
    } else {
        Note::NoAction
    }
}
