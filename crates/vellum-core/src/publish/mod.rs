//! Send-to-publish eligibility.

pub mod dialog;
pub mod eligibility;

pub use dialog::SendToPublishDialog;
pub use eligibility::{
    Classification, Eligibility, VariantSnapshot, classify, compute_eligibility, is_modified,
    is_unmodified, reset_selection,
};
