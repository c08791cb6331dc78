use tempfile::TempDir;
use vellum_core::db::open_store;
use vellum_core::db::relations::{
    RelationFilter, RelationRepository, SqliteRelationRepository, delete_relations_by_parent,
};
use vellum_core::db::repository::Repository;
use vellum_core::model::relation::aliases;
use vellum_core::{Relation, VellumError};

fn temp_store() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(".vellum").join("store.sqlite3");
    (dir, path)
}

fn seed(repo: &SqliteRelationRepository<'_>) {
    for (parent, child, alias) in [
        (10, 11, aliases::DOCUMENT_DEPENDENCY),
        (10, 12, aliases::DOCUMENT_DEPENDENCY),
        (10, 13, aliases::MEDIA_DEPENDENCY),
        (10, 14, aliases::RELATE_DOCUMENT_ON_COPY),
        (20, 10, aliases::DOCUMENT_DEPENDENCY),
        (20, 21, aliases::MEDIA_DEPENDENCY),
    ] {
        repo.create(&mut Relation::new(parent, child, alias))
            .expect("create relation");
    }
}

fn count(repo: &SqliteRelationRepository<'_>, filter: &RelationFilter) -> usize {
    repo.query(filter).expect("query relations").len()
}

#[test]
fn delete_by_parent_without_aliases_leaves_other_parents() {
    let (_dir, path) = temp_store();
    let conn = open_store(&path).expect("open store");
    let repo = SqliteRelationRepository::new(&conn);
    seed(&repo);

    assert_eq!(repo.delete_by_parent(10, &[]).expect("delete"), 4);
    assert_eq!(count(&repo, &RelationFilter::parent(10)), 0);
    assert_eq!(count(&repo, &RelationFilter::parent(20)), 2);
}

#[test]
fn delete_by_parent_with_alias_keeps_other_aliases() {
    let (_dir, path) = temp_store();
    let conn = open_store(&path).expect("open store");
    let repo = SqliteRelationRepository::new(&conn);
    seed(&repo);

    assert_eq!(
        repo.delete_by_parent(10, &[aliases::DOCUMENT_DEPENDENCY])
            .expect("delete"),
        2
    );
    let left = repo.get_by_parent(10, None).expect("list");
    assert_eq!(left.len(), 2);
    assert!(
        left.iter()
            .all(|r| r.relation_type_alias != aliases::DOCUMENT_DEPENDENCY)
    );
    assert_eq!(
        count(
            &repo,
            &RelationFilter::parent(20).with_alias(aliases::DOCUMENT_DEPENDENCY)
        ),
        1
    );
}

#[test]
fn delete_by_parent_with_no_match_is_a_successful_no_op() {
    let (_dir, path) = temp_store();
    let conn = open_store(&path).expect("open store");
    let repo = SqliteRelationRepository::new(&conn);
    seed(&repo);

    assert_eq!(repo.delete_by_parent(999, &[]).expect("delete"), 0);
    assert_eq!(
        repo.delete_by_parent(10, &["relateParentMediaFolderOnDelete"])
            .expect("delete"),
        0
    );
    assert_eq!(count(&repo, &RelationFilter::default()), 6);
}

#[test]
fn concurrent_reader_never_sees_a_partial_delete() {
    let (_dir, path) = temp_store();
    let writer = open_store(&path).expect("open writer");
    let reader = open_store(&path).expect("open reader");
    seed(&SqliteRelationRepository::new(&writer));

    let tx = writer.unchecked_transaction().expect("begin");
    assert_eq!(
        delete_relations_by_parent(&tx, 10, &[]).expect("delete inside tx"),
        4
    );

    let readers_view = SqliteRelationRepository::new(&reader);
    assert_eq!(count(&readers_view, &RelationFilter::parent(10)), 4);

    tx.commit().expect("commit");
    assert_eq!(count(&readers_view, &RelationFilter::parent(10)), 0);
}

#[test]
fn keyed_operations_on_missing_ids_are_not_found() {
    let (_dir, path) = temp_store();
    let conn = open_store(&path).expect("open store");
    let repo = SqliteRelationRepository::new(&conn);

    assert!(matches!(
        repo.get(1),
        Err(VellumError::NotFound { entity: "relation", .. })
    ));
    assert!(repo.delete(1).is_err_and(|e| e.is_not_found()));
}

#[test]
fn relations_survive_reopen() {
    let (_dir, path) = temp_store();
    {
        let conn = open_store(&path).expect("open store");
        seed(&SqliteRelationRepository::new(&conn));
    }
    let conn = open_store(&path).expect("reopen store");
    let repo = SqliteRelationRepository::new(&conn);
    assert_eq!(count(&repo, &RelationFilter::default()), 6);

    let graph = repo.graph().expect("graph");
    assert_eq!(graph.dependencies_of(20), vec![10, 11, 12, 13, 21]);
    assert_eq!(graph.dependents_of(11), vec![10, 20]);
}
