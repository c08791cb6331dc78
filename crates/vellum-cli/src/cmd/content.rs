//! `vl content`: create, inspect and edit content items.
//!
//! Every mutating subcommand loads the item, applies one change through the
//! core model and saves it back; saving folds pending edits on published
//! variants into `PublishedPendingChanges`.

use std::io::Write;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use vellum_core::db::content::{
    SqliteContentRepository, delete_content_with_relations, next_content_id,
};
use vellum_core::db::content_types::SqliteContentTypeRepository;
use vellum_core::db::repository::Repository;
use vellum_core::model::content::ROOT_ID;
use vellum_core::{ContentItem, ContentSettings, Culture, NameChange, VellumError};

use super::{Project, open_project};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render, render_mode};

// ---------------------------------------------------------------------------
// Clap types
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ContentArgs {
    #[command(subcommand)]
    pub command: ContentCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContentCommand {
    #[command(
        about = "Create a content item",
        after_help = "EXAMPLES:\n    # Article named in English\n    vl content create --type article --culture en --name \"Hello\"\n\n    # Invariant child item\n    vl content create --type settings --name Site --parent 1"
    )]
    Create(CreateArgs),

    #[command(about = "Show a content item with all of its variants")]
    Show(ItemArgs),

    #[command(
        about = "Set or clear the name of a culture (or of an invariant item)",
        after_help = "EXAMPLES:\n    vl content name 1 \"Bonjour\" --culture fr\n\n    # A blank name clears the culture variant\n    vl content name 1 \"\" --culture fr"
    )]
    Name(NameArgs),

    #[command(
        about = "Set a property value",
        after_help = "EXAMPLES:\n    # Values parse as JSON, falling back to a plain string\n    vl content set 1 title \"Hello world\" --culture en\n    vl content set 1 rating 4\n    vl content set 1 body '{\"text\":\"hi\"}' --group blocks --culture en"
    )]
    Set(SetArgs),

    #[command(about = "Publish a culture (or an invariant item)")]
    Publish(CultureArgs),

    #[command(about = "Take a published culture back to draft")]
    Unpublish(CultureArgs),

    #[command(
        about = "Move an item under a new parent",
        after_help = "EXAMPLES:\n    vl content move 3 --parent 1\n    vl content move 3 --root --sort-order 2"
    )]
    Move(MoveArgs),

    #[command(about = "Delete an item (and, by default, the relations it parents)")]
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Content type id or alias.
    #[arg(long = "type", value_name = "TYPE")]
    pub content_type: String,

    #[arg(long)]
    pub name: Option<String>,

    /// Culture the name applies to (culture-variant types).
    #[arg(long)]
    pub culture: Option<Culture>,

    /// Parent item id (default: root).
    #[arg(long)]
    pub parent: Option<i64>,

    /// Explicit item id (default: next free id).
    #[arg(long)]
    pub id: Option<i64>,

    #[arg(long, default_value_t = 0)]
    pub sort_order: u32,
}

#[derive(Args, Debug)]
pub struct ItemArgs {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    pub id: i64,
    pub name: String,
    #[arg(long)]
    pub culture: Option<Culture>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub id: i64,
    pub alias: String,
    pub value: String,
    #[arg(long)]
    pub culture: Option<Culture>,
    /// Nested element group holding the value.
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Args, Debug)]
pub struct CultureArgs {
    pub id: i64,
    #[arg(long)]
    pub culture: Option<Culture>,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["parent", "root"])))]
pub struct MoveArgs {
    pub id: i64,
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(long)]
    pub root: bool,
    #[arg(long, default_value_t = 0)]
    pub sort_order: u32,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub id: i64,
    /// Keep relations even when `relations.cascade_on_delete` is on.
    #[arg(long)]
    pub keep_relations: bool,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct NameOutput {
    ok: bool,
    id: i64,
    culture: Option<Culture>,
    change: &'static str,
    state: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    ok: bool,
    id: i64,
    relations_removed: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const fn change_label(change: NameChange) -> &'static str {
    match change {
        NameChange::Created => "created",
        NameChange::Renamed => "renamed",
        NameChange::Unchanged => "unchanged",
        NameChange::Cleared => "cleared",
        NameChange::Removed => "removed",
        NameChange::Ignored => "ignored",
    }
}

/// CLI values are JSON when they parse as JSON, otherwise plain strings.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn resolve_type_id(project: &Project, raw: &str) -> Result<i64, VellumError> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(id);
    }
    SqliteContentTypeRepository::new(&project.conn)
        .find_by_alias(raw)?
        .map(|t| t.id)
        .ok_or_else(|| {
            VellumError::missing_content_type(format!("no content type with alias '{raw}'"))
        })
}

fn load(project: &Project, id: i64) -> Result<ContentItem, VellumError> {
    SqliteContentRepository::new(&project.conn).get(id)
}

fn save(project: &Project, item: &mut ContentItem) -> Result<(), VellumError> {
    SqliteContentRepository::new(&project.conn).update(item)
}

/// Re-derive paths below `parent` after it moved.
fn relocate_descendants(
    repo: &SqliteContentRepository<'_>,
    parent: &ContentItem,
) -> Result<usize, VellumError> {
    let mut moved = 0;
    for mut child in repo.children(parent.id())? {
        let sort_order = child.sort_order();
        child.move_to(parent, sort_order)?;
        repo.update(&mut child)?;
        moved += 1 + relocate_descendants(repo, &child)?;
    }
    Ok(moved)
}

fn write_item_pretty(item: &ContentItem, w: &mut dyn Write) -> std::io::Result<()> {
    let title = item
        .variants()
        .iter()
        .find_map(|(_, v)| v.name())
        .unwrap_or("(unnamed)");
    pretty_section(w, &format!("{title} (id {})", item.id()))?;
    pretty_kv(w, "type", &item.content_type().alias)?;
    pretty_kv(w, "path", item.path())?;
    pretty_kv(w, "level", item.level().to_string())?;
    pretty_kv(w, "sort order", item.sort_order().to_string())?;
    if item.trashed() {
        pretty_kv(w, "trashed", "yes")?;
    }
    pretty_kv(w, "created", item.create_date().format("%Y-%m-%d %H:%M:%S UTC").to_string())?;
    pretty_kv(w, "updated", item.update_date().format("%Y-%m-%d %H:%M:%S UTC").to_string())?;
    for (culture, variant) in item.variants().iter() {
        writeln!(w)?;
        pretty_kv(w, "culture", culture.as_str())?;
        pretty_kv(w, "name", variant.name().unwrap_or("-"))?;
        pretty_kv(w, "state", variant.state().as_str())?;
        for (alias, value) in variant.values() {
            pretty_kv(w, alias, value.to_string())?;
        }
    }
    Ok(())
}

fn write_item_text(item: &ContentItem, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        item.id(),
        item.content_type().alias,
        item.path(),
        item.trashed()
    )?;
    for (culture, variant) in item.variants().iter() {
        writeln!(
            w,
            "  {}\t{}\t{}",
            culture,
            variant.state(),
            variant.name().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn render_item(output: OutputMode, item: &ContentItem) -> anyhow::Result<()> {
    render_mode(
        output,
        item,
        write_item_text,
        write_item_pretty,
    )
}

// ---------------------------------------------------------------------------
// Command runners
// ---------------------------------------------------------------------------

pub fn run_content(
    args: &ContentArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    match &args.command {
        ContentCommand::Create(a) => run_create(a, output, &project),
        ContentCommand::Show(a) => {
            let item = load(&project, a.id).map_err(|e| fail(output, e))?;
            render_item(output, &item)
        }
        ContentCommand::Name(a) => run_name(a, output, &project),
        ContentCommand::Set(a) => run_set(a, output, &project),
        ContentCommand::Publish(a) => run_publication(a, true, output, &project),
        ContentCommand::Unpublish(a) => run_publication(a, false, output, &project),
        ContentCommand::Move(a) => run_move(a, output, &project),
        ContentCommand::Delete(a) => run_delete(a, output, &project),
    }
}

fn run_create(args: &CreateArgs, output: OutputMode, project: &Project) -> anyhow::Result<()> {
    let repo = SqliteContentRepository::new(&project.conn);
    let types = SqliteContentTypeRepository::new(&project.conn);

    let build = || -> Result<ContentItem, VellumError> {
        let type_id = resolve_type_id(project, &args.content_type)?;
        let id = match args.id {
            Some(id) => id,
            None => next_content_id(&project.conn)?,
        };

        let mut settings = ContentSettings::new(type_id);
        settings.id = Some(id);
        settings.name.clone_from(&args.name);
        settings.culture.clone_from(&args.culture);
        settings.sort_order = Some(args.sort_order);
        if let Some(parent_id) = args.parent.filter(|&p| p != ROOT_ID) {
            let parent = repo.get(parent_id)?;
            settings.parent_id = Some(parent_id);
            settings.path = Some(format!("{},{id}", parent.path()));
            settings.level = Some(parent.level() + 1);
        }

        let mut item = ContentItem::build(settings, &types)?;
        repo.create(&mut item)?;
        Ok(item)
    };

    let item = build().map_err(|e| fail(output, e))?;
    render_item(output, &item)
}

fn run_name(args: &NameArgs, output: OutputMode, project: &Project) -> anyhow::Result<()> {
    let apply = || -> Result<NameOutput, VellumError> {
        let mut item = load(project, args.id)?;
        let change = match &args.culture {
            Some(culture) => item.set_culture_name(culture, &args.name)?,
            None => item.set_name(&args.name)?,
        };
        save(project, &mut item)?;
        Ok(NameOutput {
            ok: true,
            id: item.id(),
            culture: args.culture.clone(),
            change: change_label(change),
            state: item.publication_state(args.culture.as_ref()).to_string(),
        })
    };

    let result = apply().map_err(|e| fail(output, e))?;
    render(output, &result, |r, w| {
        let culture = r.culture.as_ref().map_or("*", Culture::as_str);
        writeln!(w, "✓ {} name {} [{culture}] ({})", r.id, r.change, r.state)
    })
}

fn run_set(args: &SetArgs, output: OutputMode, project: &Project) -> anyhow::Result<()> {
    let value = parse_value(&args.value);
    let apply = || -> Result<ContentItem, VellumError> {
        let mut item = load(project, args.id)?;
        match &args.group {
            Some(group) => item.set_group_value(
                group,
                &args.alias,
                value.clone(),
                args.culture.as_ref(),
            )?,
            None => item.set_value(&args.alias, value.clone(), args.culture.as_ref())?,
        }
        save(project, &mut item)?;
        Ok(item)
    };

    let item = apply().map_err(|e| fail(output, e))?;
    render_item(output, &item)
}

fn run_publication(
    args: &CultureArgs,
    publish: bool,
    output: OutputMode,
    project: &Project,
) -> anyhow::Result<()> {
    let apply = || -> Result<ContentItem, VellumError> {
        let mut item = load(project, args.id)?;
        if publish {
            item.publish_culture(args.culture.as_ref())?;
        } else {
            item.unpublish_culture(args.culture.as_ref())?;
        }
        save(project, &mut item)?;
        Ok(item)
    };

    let item = apply().map_err(|e| fail(output, e))?;
    render_item(output, &item)
}

fn run_move(args: &MoveArgs, output: OutputMode, project: &Project) -> anyhow::Result<()> {
    let repo = SqliteContentRepository::new(&project.conn);
    let apply = || -> Result<ContentItem, VellumError> {
        let mut item = repo.get(args.id)?;
        match args.parent {
            Some(parent_id) if !args.root && parent_id != ROOT_ID => {
                let parent = repo.get(parent_id)?;
                item.move_to(&parent, args.sort_order)?;
            }
            _ => item.move_to_root(args.sort_order),
        }
        repo.update(&mut item)?;
        let descendants = relocate_descendants(&repo, &item)?;
        tracing::debug!(content_id = item.id(), descendants, "moved subtree");
        Ok(item)
    };

    let item = apply().map_err(|e| fail(output, e))?;
    render_item(output, &item)
}

fn run_delete(args: &DeleteArgs, output: OutputMode, project: &Project) -> anyhow::Result<()> {
    let cascade = project.config.relations.cascade_on_delete && !args.keep_relations;
    let removed = if cascade {
        delete_content_with_relations(&project.conn, args.id)
    } else {
        SqliteContentRepository::new(&project.conn)
            .delete(args.id)
            .map(|()| 0)
    }
    .map_err(|e| fail(output, e))?;

    let result = DeleteOutput {
        ok: true,
        id: args.id,
        relations_removed: removed,
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ deleted item {} ({} relation(s) removed)",
            r.id, r.relations_removed
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_as_json_then_string() {
        assert_eq!(parse_value("4"), serde_json::json!(4));
        assert_eq!(parse_value("true"), serde_json::json!(true));
        assert_eq!(parse_value("{\"a\":1}"), serde_json::json!({ "a": 1 }));
        assert_eq!(parse_value("Hello world"), serde_json::json!("Hello world"));
    }

    #[test]
    fn every_name_change_has_a_label() {
        let labels = [
            NameChange::Created,
            NameChange::Renamed,
            NameChange::Unchanged,
            NameChange::Cleared,
            NameChange::Removed,
            NameChange::Ignored,
        ]
        .map(change_label);
        let unique: std::collections::BTreeSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
