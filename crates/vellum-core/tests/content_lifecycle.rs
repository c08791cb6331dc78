use serde_json::json;
use vellum_core::db::content::SqliteContentRepository;
use vellum_core::db::content_types::SqliteContentTypeRepository;
use vellum_core::db::open_store_in_memory;
use vellum_core::db::repository::Repository;
use vellum_core::model::content_type::NoContentTypes;
use vellum_core::publish::{
    Classification, SendToPublishDialog, classify, compute_eligibility, is_modified,
    is_unmodified,
};
use vellum_core::{
    ContentItem, ContentSettings, ContentType, Culture, ErrorCode, NameChange, PropertyData,
    PublicationState, VellumError,
};

fn culture(code: &str) -> Culture {
    code.parse().unwrap()
}

fn article() -> ContentType {
    ContentType::new(1, "article")
        .varying_by_culture()
        .with_property("title", true)
        .with_property("author", false)
}

/// `en` published and clean, `fr` draft, `de` published with unsaved edits.
fn multilingual_item() -> ContentItem {
    let (en, fr, de) = (culture("en"), culture("fr"), culture("de"));
    let mut settings = ContentSettings::new(article());
    settings.id = Some(1000);
    for (c, name) in [(&en, "Hello"), (&fr, "Bonjour"), (&de, "Hallo")] {
        settings.culture_names.insert(c.clone(), name.to_string());
    }
    let mut item = ContentItem::build(settings, &NoContentTypes).unwrap();
    item.publish_culture(Some(&en)).unwrap();
    item.publish_culture(Some(&de)).unwrap();
    item.reset_dirty_properties(true);
    item.set_value("title", "Hallo Welt", Some(&de)).unwrap();
    item
}

#[test]
fn eligibility_scenario_orders_active_first_and_classifies() {
    let item = multilingual_item();
    let languages = [culture("en"), culture("fr"), culture("de")];
    let fr = culture("fr");

    let snapshots = item.variant_snapshots(&languages, None);
    let result = compute_eligibility(snapshots, Some(&fr));

    let order: Vec<_> = result.variants.iter().map(|v| v.culture.as_str()).collect();
    assert_eq!(order, vec!["fr", "en", "de"]);
    assert!(result.variants[0].send_to_publish);
    assert!(!result.disable_submission);

    let by_code = |code: &str| {
        result
            .variants
            .iter()
            .find(|v| v.culture.as_str() == code)
            .unwrap()
    };
    assert!(is_unmodified(by_code("en")));
    assert!(!is_modified(by_code("en")));
    assert_eq!(classify(by_code("fr")), Classification::Modified);
    assert_eq!(classify(by_code("de")), Classification::Modified);
    assert_eq!(by_code("de").state, PublicationState::Published);
    assert!(by_code("de").is_dirty);
}

#[test]
fn empty_variant_list_disables_submission() {
    let result = compute_eligibility(Vec::new(), Some(&culture("en")));
    assert!(result.disable_submission);
}

#[test]
fn dismissing_dialog_clears_selection() {
    let item = multilingual_item();
    let mut snapshots = item.variant_snapshots(&[], Some(&culture("de")));
    {
        let mut dialog = SendToPublishDialog::open(&mut snapshots, None);
        dialog.toggle(&culture("en"));
        dialog.toggle(&culture("fr"));
        assert!(dialog.variants().iter().filter(|v| v.send_to_publish).count() >= 2);
    }
    assert!(snapshots.iter().all(|v| !v.send_to_publish));
}

#[test]
fn construction_without_type_is_rejected_before_any_variant() {
    let settings = ContentSettings {
        culture: Some(culture("en")),
        name: Some("orphan".into()),
        ..ContentSettings::default()
    };
    let err = ContentItem::build(settings, &NoContentTypes).unwrap_err();
    assert!(matches!(err, VellumError::InvalidState { .. }));
    assert_eq!(err.code(), ErrorCode::ContentTypeMissing);
}

#[test]
fn naming_lifecycle_creates_clears_and_removes() {
    let en = culture("en");
    let mut item = ContentItem::build(ContentSettings::new(article()), &NoContentTypes).unwrap();
    assert_eq!(item.publication_state(Some(&en)), PublicationState::NotCreated);

    assert_eq!(item.set_culture_name(&en, "Hello").unwrap(), NameChange::Created);
    assert_eq!(item.publication_state(Some(&en)), PublicationState::Draft);

    item.set_value("title", "Hello world", Some(&en)).unwrap();
    assert_eq!(item.set_culture_name(&en, "  ").unwrap(), NameChange::Cleared);
    assert_eq!(item.publication_state(Some(&en)), PublicationState::NotCreated);
    assert_eq!(item.value("title", Some(&en)), Some(&json!("Hello world")));

    let da = culture("da");
    item.set_culture_name(&da, "Hej").unwrap();
    assert_eq!(item.set_culture_name(&da, "").unwrap(), NameChange::Removed);
    assert!(item.variants().get(&da).is_none());
}

#[test]
fn unknown_alias_and_variation_mismatch_are_typed_errors() {
    let en = culture("en");
    let mut item = ContentItem::build(ContentSettings::new(article()), &NoContentTypes).unwrap();
    assert_eq!(
        item.set_value("missing", 1, Some(&en)).unwrap_err().code(),
        ErrorCode::UnknownProperty
    );
    assert_eq!(
        item.set_value("author", "ada", Some(&en)).unwrap_err().code(),
        ErrorCode::UnsupportedVariation
    );
    assert_eq!(
        item.set_value("title", "t", None).unwrap_err().code(),
        ErrorCode::UnsupportedVariation
    );
}

#[test]
fn seeded_property_data_is_clean_and_survives_a_save() {
    let conn = open_store_in_memory().unwrap();
    let types = SqliteContentTypeRepository::new(&conn);
    types.create(&mut article()).unwrap();

    let en = culture("en");
    let mut settings = ContentSettings::new(1);
    settings.id = Some(7);
    settings.culture = Some(en.clone());
    settings.name = Some("Seeded".into());
    settings.property_data = vec![
        PropertyData::for_culture("title", "Seeded title", en.clone()),
        PropertyData::new("author", "grace"),
    ];
    let mut item = ContentItem::build(settings, &types).unwrap();
    assert!(!item.is_dirty());

    let repo = SqliteContentRepository::new(&conn);
    repo.create(&mut item).unwrap();
    let loaded = repo.get(7).unwrap();
    assert_eq!(loaded.value("title", Some(&en)), Some(&json!("Seeded title")));
    assert_eq!(loaded.value("author", None), Some(&json!("grace")));
    assert_eq!(loaded.name(Some(&en)), Some("Seeded"));
    assert_eq!(loaded.create_date().timestamp_micros(), item.create_date().timestamp_micros());
}

#[test]
fn publishing_loaded_edits_saves_as_published() {
    let conn = open_store_in_memory().unwrap();
    let types = SqliteContentTypeRepository::new(&conn);
    types.create(&mut article()).unwrap();
    let repo = SqliteContentRepository::new(&conn);

    let en = culture("en");
    let mut settings = ContentSettings::new(1);
    settings.id = Some(8);
    settings.culture = Some(en.clone());
    settings.name = Some("Launch".into());
    let mut item = ContentItem::build(settings, &types).unwrap();
    item.publish_culture(Some(&en)).unwrap();
    repo.create(&mut item).unwrap();

    let mut loaded = repo.get(8).unwrap();
    loaded.set_value("title", "new", Some(&en)).unwrap();
    loaded.publish_culture(Some(&en)).unwrap();
    repo.update(&mut loaded).unwrap();
    assert_eq!(
        repo.get(8).unwrap().publication_state(Some(&en)),
        PublicationState::Published
    );

    // An edit after the publish is still pending on the next save.
    let mut loaded = repo.get(8).unwrap();
    loaded.set_value("title", "newer", Some(&en)).unwrap();
    loaded.publish_culture(Some(&en)).unwrap();
    loaded.set_value("title", "newest", Some(&en)).unwrap();
    repo.update(&mut loaded).unwrap();
    let reloaded = repo.get(8).unwrap();
    assert_eq!(
        reloaded.publication_state(Some(&en)),
        PublicationState::PublishedPendingChanges
    );
    assert_eq!(reloaded.value("title", Some(&en)), Some(&json!("newest")));
}

#[test]
fn published_edits_no_longer_count_as_modified() {
    let mut item = multilingual_item();
    let de = culture("de");
    item.publish_culture(Some(&de)).unwrap();

    let snapshots = item.variant_snapshots(&[de.clone()], Some(&de));
    assert!(!snapshots[0].is_dirty);
    assert_eq!(classify(&snapshots[0]), Classification::Unmodified);
}
