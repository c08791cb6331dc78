use proptest::prelude::*;
use vellum_core::model::content::{ContentItem, ContentSettings};
use vellum_core::model::content_type::NoContentTypes;
use vellum_core::publish::{
    Classification, SendToPublishDialog, classify, compute_eligibility, is_modified,
    is_unmodified, reset_selection,
};
use vellum_core::{ContentType, PublicationState};

use generators::*;

fn article() -> ContentType {
    ContentType::new(1, "article")
        .varying_by_culture()
        .with_property("title", true)
        .with_property("author", false)
        .with_element_group("blocks")
}

fn apply(item: &mut ContentItem, edit: &Edit) {
    match edit {
        Edit::Name(culture, name) => {
            item.set_culture_name(culture, name).unwrap();
        }
        Edit::Title(culture, value) => item.set_value("title", value.clone(), Some(culture)).unwrap(),
        Edit::Author(value) => item.set_value("author", value.clone(), None).unwrap(),
        Edit::Block(culture, value) => item
            .set_group_value("blocks", "body", value.clone(), Some(culture))
            .unwrap(),
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn partition_is_stable_and_active_first(
        variants in arb_snapshots(),
        active in proptest::option::of(arb_culture()),
    ) {
        let expected_active = |v: &vellum_core::publish::VariantSnapshot| {
            active.as_ref().map_or(v.active, |c| v.culture == *c)
        };
        let actives: Vec<_> = variants.iter().filter(|v| expected_active(v)).map(|v| v.culture.clone()).collect();
        let others: Vec<_> = variants.iter().filter(|v| !expected_active(v)).map(|v| v.culture.clone()).collect();

        let result = compute_eligibility(variants.clone(), active.as_ref());
        let order: Vec<_> = result.variants.iter().map(|v| v.culture.clone()).collect();
        let mut expected = actives.clone();
        expected.extend(others);
        prop_assert_eq!(order, expected);

        let selected = result.variants.iter().filter(|v| v.send_to_publish).count();
        prop_assert_eq!(selected, usize::from(!actives.is_empty()));
        if !actives.is_empty() {
            prop_assert!(result.variants[0].send_to_publish);
        }
        prop_assert_eq!(result.disable_submission, variants.is_empty());
    }

    #[test]
    fn modified_and_unmodified_are_complementary(variant in arb_snapshot()) {
        prop_assert_ne!(is_modified(&variant), is_unmodified(&variant));
        let expected = if is_modified(&variant) {
            Classification::Modified
        } else {
            Classification::Unmodified
        };
        prop_assert_eq!(classify(&variant), expected);
    }

    #[test]
    fn dirty_variants_are_always_modified(variant in arb_snapshot()) {
        let dirty = variant.dirty();
        prop_assert!(is_modified(&dirty));
        prop_assert!(!is_unmodified(&dirty));
    }

    #[test]
    fn reset_selection_is_idempotent(mut variants in arb_snapshots()) {
        reset_selection(&mut variants);
        let once = variants.clone();
        reset_selection(&mut variants);
        prop_assert_eq!(&variants, &once);
        prop_assert!(variants.iter().all(|v| !v.send_to_publish));
    }

    #[test]
    fn dialog_teardown_clears_every_flag(
        mut variants in arb_snapshots(),
        active in proptest::option::of(arb_culture()),
    ) {
        {
            let _dialog = SendToPublishDialog::open(&mut variants, active.as_ref());
        }
        prop_assert!(variants.iter().all(|v| !v.send_to_publish));
    }

    #[test]
    fn set_value_never_changes_state(edits in arb_edits()) {
        let mut item = ContentItem::build(ContentSettings::new(article()), &NoContentTypes).unwrap();
        for edit in &edits {
            let before: Vec<_> = item
                .variants()
                .iter()
                .map(|(c, v)| (c.clone(), v.state()))
                .collect();
            apply(&mut item, edit);
            if !matches!(edit, Edit::Name(..)) {
                for (culture, state) in before {
                    prop_assert_eq!(item.variants().state(&culture), state);
                }
            }
        }
    }

    #[test]
    fn named_variants_exist_and_unnamed_do_not(edits in arb_edits()) {
        let mut item = ContentItem::build(ContentSettings::new(article()), &NoContentTypes).unwrap();
        for edit in &edits {
            apply(&mut item, edit);
        }
        for (_, variant) in item.variants().iter() {
            prop_assert_eq!(variant.name().is_some(), variant.state().exists());
            if variant.state() == PublicationState::NotCreated {
                prop_assert!(!variant.values().is_empty());
            }
        }
    }

    #[test]
    fn reset_dirty_twice_equals_once(edits in arb_edits(), recursive in any::<bool>()) {
        let mut item = ContentItem::build(ContentSettings::new(article()), &NoContentTypes).unwrap();
        for edit in &edits {
            apply(&mut item, edit);
        }
        item.reset_dirty_properties(recursive);
        let once = item.clone();
        item.reset_dirty_properties(recursive);
        prop_assert_eq!(item, once);
    }
}
