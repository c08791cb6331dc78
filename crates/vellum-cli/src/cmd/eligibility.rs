//! `vl eligibility`: send-to-publish view of an item's variants.
//!
//! Without `--submit` this only reports the ordered variants, their
//! classification and which one is pre-selected. With `--submit` the
//! selection is run through the send-to-publish dialog and every selected
//! culture that carries changes is published.

use std::path::Path;

use clap::Args;
use serde::Serialize;

use vellum_core::db::content::SqliteContentRepository;
use vellum_core::db::repository::Repository;
use vellum_core::publish::{
    SendToPublishDialog, VariantSnapshot, classify, compute_eligibility,
};
use vellum_core::{Culture, VellumError};

use super::open_project;
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
#[command(
    after_help = "EXAMPLES:\n    # Which variants would be offered while editing French?\n    vl eligibility 1 --culture fr\n\n    # Publish French and German in one go\n    vl eligibility 1 --culture fr --select de --submit"
)]
pub struct EligibilityArgs {
    pub id: i64,

    /// Culture being edited (default: the project's default language).
    #[arg(long)]
    pub culture: Option<Culture>,

    /// Also select these cultures (repeatable).
    #[arg(long = "select", value_name = "CULTURE")]
    pub selected: Vec<Culture>,

    /// Publish the selected cultures that carry changes.
    #[arg(long)]
    pub submit: bool,
}

#[derive(Debug, Serialize)]
struct VariantRow {
    #[serde(flatten)]
    snapshot: VariantSnapshot,
    classification: &'static str,
}

#[derive(Debug, Serialize)]
struct EligibilityOutput {
    id: i64,
    variants: Vec<VariantRow>,
    disable_submission: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<Vec<Culture>>,
}

/// Mark `selected` in the dialog without flipping already-selected ones.
fn select_all(dialog: &mut SendToPublishDialog<'_>, selected: &[Culture]) -> Vec<Culture> {
    let mut missing = Vec::new();
    for culture in selected {
        let already = dialog
            .variants()
            .iter()
            .any(|v| v.culture == *culture && v.send_to_publish);
        if !already && dialog.toggle(culture).is_none() {
            missing.push(culture.clone());
        }
    }
    missing
}

pub fn run_eligibility(
    args: &EligibilityArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let languages = project.config.languages.cultures();
    let active = args
        .culture
        .clone()
        .or_else(|| project.config.languages.default.clone());
    let repo = SqliteContentRepository::new(&project.conn);

    let run = || -> Result<EligibilityOutput, VellumError> {
        let mut item = repo.get(args.id)?;
        let active = item.editing_culture(active.as_ref());
        let snapshots = item.variant_snapshots(&languages, active.as_ref());
        let eligibility = compute_eligibility(snapshots.clone(), active.as_ref());

        let published = if args.submit || !args.selected.is_empty() {
            let mut working = snapshots;
            let mut dialog = SendToPublishDialog::open(&mut working, active.as_ref());
            let missing = select_all(&mut dialog, &args.selected);
            if !missing.is_empty() {
                tracing::warn!(?missing, "selected cultures are not offered for this item");
            }
            if args.submit {
                let cultures = dialog.submit();
                for culture in &cultures {
                    item.publish_culture(Some(culture))?;
                }
                repo.update(&mut item)?;
                Some(cultures)
            } else {
                let preview = dialog.submission();
                dialog.cancel();
                Some(preview)
            }
        } else {
            None
        };

        Ok(EligibilityOutput {
            id: item.id(),
            variants: eligibility
                .variants
                .into_iter()
                .map(|snapshot| VariantRow {
                    classification: classify(&snapshot).as_str(),
                    snapshot,
                })
                .collect(),
            disable_submission: eligibility.disable_submission,
            published,
        })
    };

    let result = run().map_err(|e| fail(output, e))?;
    let verb = if args.submit { "published" } else { "would submit" };
    render_mode(
        output,
        &result,
        |r, w| {
            for row in &r.variants {
                let v = &row.snapshot;
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    v.culture,
                    v.state,
                    row.classification,
                    if v.active { "active" } else { "-" },
                    if v.send_to_publish { "selected" } else { "-" }
                )?;
            }
            if let Some(cultures) = &r.published {
                let codes: Vec<&str> = cultures.iter().map(Culture::as_str).collect();
                writeln!(w, "{verb}\t{}", codes.join(","))?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Send to publish: item {}", r.id))?;
            if r.disable_submission {
                writeln!(w, "Nothing to publish: the item has no variants.")?;
            }
            for row in &r.variants {
                let v = &row.snapshot;
                let mark = if v.send_to_publish { "[x]" } else { "[ ]" };
                let active = if v.active { " (editing)" } else { "" };
                writeln!(
                    w,
                    "{mark} {:<8} {:<26} {}{active}",
                    v.culture.as_str(),
                    v.state.as_str(),
                    row.classification
                )?;
            }
            if let Some(cultures) = &r.published {
                let codes: Vec<&str> = cultures.iter().map(Culture::as_str).collect();
                writeln!(w)?;
                pretty_kv(w, verb, if codes.is_empty() { "-".to_string() } else { codes.join(", ") })?;
            }
            Ok(())
        },
    )
}
