//! `vl type`: register and list content types.

use std::path::Path;

use clap::{Args, Subcommand};

use vellum_core::ContentType;
use vellum_core::db::content_types::{ContentTypeFilter, SqliteContentTypeRepository};
use vellum_core::db::repository::Repository;

use super::open_project;
use crate::output::{
    CliError, OutputMode, fail, pretty_kv, pretty_section, render, render_error, render_mode,
};

#[derive(Args, Debug)]
pub struct TypeArgs {
    #[command(subcommand)]
    pub command: TypeCommand,
}

#[derive(Subcommand, Debug)]
pub enum TypeCommand {
    #[command(
        about = "Register a content type",
        after_help = "EXAMPLES:\n    # Culture-variant article with a per-culture title and a shared author\n    vl type add article --vary --culture-property title --property author\n\n    # Invariant settings type with a nested element group\n    vl type add settings --property theme --group blocks"
    )]
    Add(TypeAddArgs),

    #[command(about = "List registered content types")]
    List(TypeListArgs),
}

#[derive(Args, Debug)]
pub struct TypeAddArgs {
    /// Unique alias of the new type.
    pub alias: String,

    /// Explicit type id (default: next free id).
    #[arg(long)]
    pub id: Option<i64>,

    /// Items of this type vary by culture.
    #[arg(long)]
    pub vary: bool,

    /// Invariant property alias (repeatable).
    #[arg(long = "property", value_name = "ALIAS")]
    pub properties: Vec<String>,

    /// Culture-variant property alias (repeatable; needs `--vary`).
    #[arg(long = "culture-property", value_name = "ALIAS")]
    pub culture_properties: Vec<String>,

    /// Nested element group alias (repeatable).
    #[arg(long = "group", value_name = "ALIAS")]
    pub groups: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TypeListArgs {
    /// Only types that vary by culture.
    #[arg(long)]
    pub varying: bool,
}

pub fn run_type(args: &TypeArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    match &args.command {
        TypeCommand::Add(a) => run_type_add(a, output, project_root),
        TypeCommand::List(a) => run_type_list(a, output, project_root),
    }
}

fn run_type_add(args: &TypeAddArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    if !args.culture_properties.is_empty() && !args.vary {
        let msg = "--culture-property requires --vary";
        render_error(output, &CliError::new(msg))?;
        anyhow::bail!("{msg}");
    }

    let project = open_project(project_root, output)?;
    let repo = SqliteContentTypeRepository::new(&project.conn);
    let id = match args.id {
        Some(id) => id,
        None => repo.next_id().map_err(|e| fail(output, e))?,
    };

    let mut content_type = ContentType::new(id, args.alias.trim());
    if args.vary {
        content_type = content_type.varying_by_culture();
    }
    for alias in &args.properties {
        content_type = content_type.with_property(alias, false);
    }
    for alias in &args.culture_properties {
        content_type = content_type.with_property(alias, true);
    }
    for alias in &args.groups {
        content_type = content_type.with_element_group(alias);
    }

    repo.create(&mut content_type).map_err(|e| fail(output, e))?;
    render(output, &content_type, |t, w| {
        writeln!(w, "✓ registered content type {} ({})", t.alias, t.id)
    })
}

fn run_type_list(
    args: &TypeListArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let repo = SqliteContentTypeRepository::new(&project.conn);
    let filter = ContentTypeFilter {
        varies_by_culture: args.varying.then_some(true),
        ..ContentTypeFilter::default()
    };
    let types = repo.query(&filter).map_err(|e| fail(output, e))?;

    render_mode(
        output,
        &types,
        |types, w| {
            writeln!(w, "id\talias\tvaries\tproperties\tgroups")?;
            for t in types {
                let props: Vec<&str> = t.property_aliases().collect();
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    t.id,
                    t.alias,
                    t.varies_by_culture,
                    props.join(","),
                    t.element_groups.join(",")
                )?;
            }
            Ok(())
        },
        |types, w| {
            if types.is_empty() {
                return writeln!(w, "No content types registered. Add one with `vl type add`.");
            }
            for t in types {
                pretty_section(w, &format!("{} (id {})", t.alias, t.id))?;
                pretty_kv(w, "varies", if t.varies_by_culture { "by culture" } else { "no" })?;
                for p in &t.property_types {
                    let scope = if p.varies_by_culture { "culture" } else { "invariant" };
                    pretty_kv(w, "property", format!("{} [{scope}]", p.alias))?;
                }
                for g in &t.element_groups {
                    pretty_kv(w, "group", g)?;
                }
                writeln!(w)?;
            }
            Ok(())
        },
    )
}
