//! Which variants may be submitted for approval.
//!
//! Everything here is a pure function over a point-in-time snapshot of an
//! item's variants. Nothing reads or writes storage.

use serde::{Deserialize, Serialize};

use crate::model::culture::Culture;
use crate::model::variant::PublicationState;

/// One variant as seen by the send-to-publish workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSnapshot {
    pub culture: Culture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: PublicationState,
    #[serde(default)]
    pub is_dirty: bool,
    /// The culture currently being edited.
    #[serde(default)]
    pub active: bool,
    /// Selected for submission.
    #[serde(default)]
    pub send_to_publish: bool,
}

impl VariantSnapshot {
    pub fn new(culture: Culture, state: PublicationState) -> Self {
        Self {
            culture,
            name: None,
            state,
            is_dirty: false,
            active: false,
            send_to_publish: false,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn dirty(mut self) -> Self {
        self.is_dirty = true;
        self
    }

    #[must_use]
    pub const fn active(mut self) -> Self {
        self.active = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub variants: Vec<VariantSnapshot>,
    pub disable_submission: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Modified,
    Unmodified,
}

impl Classification {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Unmodified => "unmodified",
        }
    }
}

/// Unsaved edits, never published, or published with pending changes.
#[must_use]
pub fn is_modified(variant: &VariantSnapshot) -> bool {
    variant.is_dirty
        || matches!(
            variant.state,
            PublicationState::Draft | PublicationState::PublishedPendingChanges
        )
}

/// Clean and either live as-is or not created at all.
#[must_use]
pub fn is_unmodified(variant: &VariantSnapshot) -> bool {
    !variant.is_dirty
        && matches!(
            variant.state,
            PublicationState::Published | PublicationState::NotCreated
        )
}

/// Total classification; the two predicates never overlap or leave a gap.
#[must_use]
pub fn classify(variant: &VariantSnapshot) -> Classification {
    if is_modified(variant) {
        Classification::Modified
    } else {
        Classification::Unmodified
    }
}

/// Order variants for the dialog and pre-select the one being edited.
///
/// Active variants move to the front, keeping their relative order, as do
/// the rest. When `active_culture` is given it replaces the snapshots' own
/// `active` flags. Only the first active variant is selected.
#[must_use]
pub fn compute_eligibility(
    mut variants: Vec<VariantSnapshot>,
    active_culture: Option<&Culture>,
) -> Eligibility {
    apply(&mut variants, active_culture);
    let disable_submission = variants.is_empty();
    Eligibility {
        variants,
        disable_submission,
    }
}

pub(crate) fn apply(variants: &mut [VariantSnapshot], active_culture: Option<&Culture>) {
    if let Some(culture) = active_culture {
        for variant in variants.iter_mut() {
            variant.active = variant.culture == *culture;
        }
    }

    // `sort_by_key` is stable, so equal keys keep their order.
    variants.sort_by_key(|v| !v.active);

    let mut selected = false;
    for variant in variants.iter_mut() {
        variant.send_to_publish = variant.active && !selected;
        selected |= variant.send_to_publish;
    }
}

/// Clear every selection flag.
pub fn reset_selection(variants: &mut [VariantSnapshot]) {
    for variant in variants {
        variant.send_to_publish = false;
    }
}
