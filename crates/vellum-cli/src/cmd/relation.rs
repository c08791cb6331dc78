//! `vl relation`: manage typed relations between entities.
//!
//! Subcommands:
//! - `vl relation add <parent> <child> --type <alias>`: upsert an edge
//! - `vl relation list`: filter by endpoint and alias
//! - `vl relation rm <id>` / `vl relation rm-parent <parent>`: delete edges
//! - `vl relation deps <id>`: transitive dependencies plus direct neighbours
//! - `vl relation types`: list (or register) relation types

use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use vellum_core::db::relations::{RelationFilter, RelationRepository, SqliteRelationRepository};
use vellum_core::db::repository::Repository;
use vellum_core::{EntityKind, Relation, RelationType};

use super::open_project;
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render, render_mode};

// ---------------------------------------------------------------------------
// Clap types
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct RelationArgs {
    #[command(subcommand)]
    pub command: RelationCommand,
}

#[derive(Subcommand, Debug)]
pub enum RelationCommand {
    #[command(
        about = "Relate two entities (idempotent per parent, child and type)",
        after_help = "EXAMPLES:\n    # Item 1 embeds item 2\n    vl relation add 1 2 --type umbDocument\n\n    # Record where a copy came from\n    vl relation add 1 5 --type relateDocumentOnCopy --comment \"copied\""
    )]
    Add(AddArgs),

    #[command(
        about = "List relations",
        after_help = "EXAMPLES:\n    vl relation list --parent 1\n    vl relation list --id 2 --type umbDocument"
    )]
    List(ListArgs),

    #[command(about = "Delete one relation by id")]
    Rm(RmArgs),

    #[command(
        name = "rm-parent",
        about = "Delete every relation of a parent, optionally limited to some types",
        after_help = "EXAMPLES:\n    # All relations parented by 1\n    vl relation rm-parent 1\n\n    # Only dependency relations\n    vl relation rm-parent 1 --type umbDocument --type umbMedia"
    )]
    RmParent(RmParentArgs),

    #[command(about = "Show what an entity depends on (or what depends on it)")]
    Deps(DepsArgs),

    #[command(
        about = "List relation types, or register one",
        after_help = "EXAMPLES:\n    vl relation types\n    vl relation types --add relatedArticle --name \"Related article\" --bidirectional"
    )]
    Types(TypesArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub parent: i64,
    pub child: i64,
    /// Relation type alias.
    #[arg(long = "type", value_name = "ALIAS")]
    pub alias: String,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "id")]
    pub parent: Option<i64>,
    #[arg(long, conflicts_with = "id")]
    pub child: Option<i64>,
    /// Either endpoint.
    #[arg(long)]
    pub id: Option<i64>,
    #[arg(long = "type", value_name = "ALIAS")]
    pub alias: Option<String>,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct RmParentArgs {
    pub parent: i64,
    /// Only delete relations of these types (repeatable).
    #[arg(long = "type", value_name = "ALIAS")]
    pub aliases: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    pub id: i64,
    /// List dependents instead of dependencies.
    #[arg(long)]
    pub reverse: bool,
}

#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Register a relation type with this alias.
    #[arg(long, value_name = "ALIAS", requires = "name")]
    pub add: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    /// Edges mean "parent depends on child".
    #[arg(long, requires = "add")]
    pub dependency: bool,
    #[arg(long, requires = "add")]
    pub bidirectional: bool,
    /// Entity kind on the parent end (needs `--child-kind`).
    #[arg(long, value_name = "KIND", requires_all = ["add", "child_kind"])]
    pub parent_kind: Option<EntityKind>,
    /// Entity kind on the child end (needs `--parent-kind`).
    #[arg(long, value_name = "KIND", requires = "parent_kind")]
    pub child_kind: Option<EntityKind>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RemovedOutput {
    ok: bool,
    parent_id: Option<i64>,
    removed: usize,
}

#[derive(Debug, Serialize)]
struct DepsOutput {
    id: i64,
    direction: &'static str,
    ids: Vec<i64>,
    referenced: bool,
    /// Direct neighbours over every relation type.
    related: Vec<Neighbour>,
}

#[derive(Debug, Serialize)]
struct Neighbour {
    id: i64,
    alias: String,
}

// ---------------------------------------------------------------------------
// Command runners
// ---------------------------------------------------------------------------

pub fn run_relation(
    args: &RelationArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = open_project(project_root, output)?;
    let repo = SqliteRelationRepository::new(&project.conn);
    match &args.command {
        RelationCommand::Add(a) => run_add(a, output, &repo),
        RelationCommand::List(a) => run_list(a, output, &repo),
        RelationCommand::Rm(a) => {
            repo.delete(a.id).map_err(|e| fail(output, e))?;
            let result = RemovedOutput {
                ok: true,
                parent_id: None,
                removed: 1,
            };
            render(output, &result, |_, w| writeln!(w, "✓ removed relation {}", a.id))
        }
        RelationCommand::RmParent(a) => run_rm_parent(a, output, &repo),
        RelationCommand::Deps(a) => run_deps(a, output, &repo),
        RelationCommand::Types(a) => run_types(a, output, &repo),
    }
}

fn run_add(
    args: &AddArgs,
    output: OutputMode,
    repo: &SqliteRelationRepository<'_>,
) -> anyhow::Result<()> {
    let mut relation = Relation::new(args.parent, args.child, args.alias.trim());
    if let Some(comment) = &args.comment {
        relation = relation.with_comment(comment);
    }
    repo.create(&mut relation).map_err(|e| fail(output, e))?;
    render(output, &relation, |r, w| {
        writeln!(
            w,
            "✓ relation {}: {} -[{}]-> {}",
            r.id, r.parent_id, r.relation_type_alias, r.child_id
        )
    })
}

fn run_list(
    args: &ListArgs,
    output: OutputMode,
    repo: &SqliteRelationRepository<'_>,
) -> anyhow::Result<()> {
    let filter = RelationFilter {
        parent_id: args.parent,
        child_id: args.child,
        parent_or_child_id: args.id,
        relation_type_alias: args.alias.clone(),
        limit: args.limit,
    };
    let relations = repo.query(&filter).map_err(|e| fail(output, e))?;

    render_mode(
        output,
        &relations,
        |relations, w| {
            writeln!(w, "id\tparent\tchild\ttype\tcomment")?;
            for r in relations {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    r.id,
                    r.parent_id,
                    r.child_id,
                    r.relation_type_alias,
                    r.comment.as_deref().unwrap_or("")
                )?;
            }
            Ok(())
        },
        |relations, w| {
            if relations.is_empty() {
                return writeln!(w, "No relations found.");
            }
            pretty_section(w, &format!("{} relation(s)", relations.len()))?;
            for r in relations {
                writeln!(
                    w,
                    "#{:<6} {} -[{}]-> {}",
                    r.id, r.parent_id, r.relation_type_alias, r.child_id
                )?;
                if let Some(comment) = &r.comment {
                    writeln!(w, "        {comment}")?;
                }
            }
            Ok(())
        },
    )
}

fn run_rm_parent(
    args: &RmParentArgs,
    output: OutputMode,
    repo: &SqliteRelationRepository<'_>,
) -> anyhow::Result<()> {
    let aliases: Vec<&str> = args.aliases.iter().map(String::as_str).collect();
    let removed = repo
        .delete_by_parent(args.parent, &aliases)
        .map_err(|e| fail(output, e))?;

    let result = RemovedOutput {
        ok: true,
        parent_id: Some(args.parent),
        removed,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ removed {} relation(s) of parent {}", r.removed, args.parent)
    })
}

fn run_deps(
    args: &DepsArgs,
    output: OutputMode,
    repo: &SqliteRelationRepository<'_>,
) -> anyhow::Result<()> {
    let graph = repo.graph().map_err(|e| fail(output, e))?;
    let (direction, ids) = if args.reverse {
        ("dependents", graph.dependents_of(args.id))
    } else {
        ("dependencies", graph.dependencies_of(args.id))
    };
    let result = DepsOutput {
        id: args.id,
        direction,
        ids,
        referenced: graph.is_referenced(args.id),
        related: graph
            .related(args.id)
            .into_iter()
            .map(|(id, alias)| Neighbour {
                id,
                alias: alias.to_string(),
            })
            .collect(),
    };

    render_mode(
        output,
        &result,
        |r, w| {
            for id in &r.ids {
                writeln!(w, "{id}")?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("{} of {}", r.direction, r.id))?;
            if r.ids.is_empty() {
                writeln!(w, "(none)")?;
            }
            for id in &r.ids {
                writeln!(w, "  {id}")?;
            }
            pretty_kv(w, "referenced", if r.referenced { "yes" } else { "no" })?;
            for n in &r.related {
                pretty_kv(w, "related", format!("{} via {}", n.id, n.alias))?;
            }
            Ok(())
        },
    )
}

fn run_types(
    args: &TypesArgs,
    output: OutputMode,
    repo: &SqliteRelationRepository<'_>,
) -> anyhow::Result<()> {
    if let (Some(alias), Some(name)) = (&args.add, &args.name) {
        let mut relation_type = RelationType::new(alias.trim(), name);
        if args.dependency {
            relation_type = relation_type.dependency();
        }
        if args.bidirectional {
            relation_type = relation_type.bidirectional();
        }
        if let (Some(parent), Some(child)) = (args.parent_kind, args.child_kind) {
            relation_type = relation_type.between(parent, child);
        }
        repo.save_relation_type(&relation_type)
            .map_err(|e| fail(output, e))?;
    }

    let types = repo.list_relation_types().map_err(|e| fail(output, e))?;
    render_mode(
        output,
        &types,
        |types, w| {
            writeln!(w, "alias\tname\tdependency\tbidirectional")?;
            for t in types {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    t.alias, t.name, t.is_dependency, t.is_bidirectional
                )?;
            }
            Ok(())
        },
        |types, w| {
            pretty_section(w, "Relation types")?;
            for t in types {
                let mut flags = Vec::new();
                if t.is_dependency {
                    flags.push("dependency");
                }
                if t.is_bidirectional {
                    flags.push("bidirectional");
                }
                let suffix = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                pretty_kv(w, &t.alias, format!("{}{suffix}", t.name))?;
            }
            Ok(())
        },
    )
}
