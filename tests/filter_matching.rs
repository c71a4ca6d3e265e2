use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tagflow::filter::{Filter, FilterKey, FilterTarget, LogicalOperator, apply_filters, passes};
use tagflow::item::{AttributeKind, TaggedItem};

fn hash_of(f: &Filter) -> u64 {
    let mut h = DefaultHasher::new();
    f.hash(&mut h);
    h.finish()
}

fn scan(name: &str) -> TaggedItem {
    TaggedItem::new(name)
        .with_filename(format!("/data/{name}.nii"))
        .with_tag("Modality", "MR")
        .with_tag("SeriesDescription", "T1 Axial")
}

#[test]
fn independently_built_filters_are_equal_and_hash_alike() {
    let a = Filter::tag("Modality").with_value("MR").exactly(false);
    let b = Filter::tag("Modality").with_value("MR").exactly(false);

    assert_ne!(a.id(), b.id());
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    let mut buckets = HashMap::new();
    buckets.insert(a, 1);
    buckets.insert(b, 2);
    assert_eq!(buckets.len(), 1);
}

#[test]
fn filters_differing_in_any_canonical_field_are_distinct() {
    let base = Filter::tag("Modality").with_value("MR");
    assert_ne!(base, Filter::tag("Modality").with_value("CT"));
    assert_ne!(base, Filter::tag("Modality").with_value("MR").exactly(false));
    assert_ne!(base, Filter::tag("Modality").with_value("MR").case_sensitive(false));
    assert_ne!(base, Filter::tag("Modality").with_value("MR").operator(LogicalOperator::Or));
    assert_ne!(base, Filter::tag("Modality"));
}

#[test]
fn canonical_key_follows_every_builder_step() {
    let f = Filter::tag("Modality")
        .with_value("MR")
        .exactly(false)
        .case_sensitive(false)
        .operator(LogicalOperator::And);

    assert_eq!(
        f.key(),
        &FilterKey {
            target: FilterTarget::Tag("Modality".to_string()),
            value: Some("MR".to_string()),
            is_case_sensitive: false,
            is_exactly: false,
            operator: LogicalOperator::And,
        }
    );
    assert_eq!(f.target(), &FilterTarget::Tag("Modality".to_string()));
    assert_eq!(f.value(), Some("MR"));

    let pinned = Filter::tag("Modality").pinned_to("CT");
    assert_eq!(pinned, Filter::tag("Modality").with_value("CT").operator(LogicalOperator::Or));
}

#[test]
fn tag_filter_without_value_checks_presence() {
    let item = scan("a");
    assert!(Filter::tag("Modality").matches(&item));
    assert!(!Filter::tag("EchoTime").matches(&item));
}

#[test]
fn tag_value_comparison_modes() {
    let item = scan("a");

    assert!(Filter::tag("SeriesDescription").with_value("T1 Axial").matches(&item));
    assert!(!Filter::tag("SeriesDescription").with_value("Axial").matches(&item));
    assert!(
        Filter::tag("SeriesDescription")
            .with_value("Axial")
            .exactly(false)
            .matches(&item)
    );
    assert!(
        !Filter::tag("SeriesDescription")
            .with_value("t1 axial")
            .matches(&item)
    );
    assert!(
        Filter::tag("SeriesDescription")
            .with_value("t1 axial")
            .case_sensitive(false)
            .matches(&item)
    );
    assert!(
        Filter::tag("SeriesDescription")
            .with_value("axial")
            .exactly(false)
            .case_sensitive(false)
            .matches(&item)
    );
}

#[test]
fn attribute_filter_targets_filename() {
    let item = scan("brain");
    let bare = TaggedItem::new("no-file");

    let f = Filter::attribute(AttributeKind::Filename)
        .with_value("brain")
        .exactly(false);
    assert!(f.matches(&item));
    assert!(!f.matches(&bare));
    assert!(Filter::attribute(AttributeKind::Filename).matches(&item));
    assert!(!Filter::attribute(AttributeKind::Filename).matches(&bare));
}

#[test]
fn filter_lists_combine_and_with_or() {
    let mr = scan("mr");
    let ct = TaggedItem::new("ct").with_tag("Modality", "CT");
    let pet = TaggedItem::new("pet").with_tag("Modality", "PT");

    let or_list = vec![
        Filter::tag("Modality").with_value("MR").operator(LogicalOperator::Or),
        Filter::tag("Modality").with_value("CT").operator(LogicalOperator::Or),
    ];
    assert!(passes(&or_list, &mr));
    assert!(passes(&or_list, &ct));
    assert!(!passes(&or_list, &pet));

    let mut and_list = or_list.clone();
    and_list.push(Filter::tag("SeriesDescription").operator(LogicalOperator::And));
    assert!(passes(&and_list, &mr));
    assert!(!passes(&and_list, &ct));

    let items = vec![mr.clone(), ct.clone(), pet.clone()];
    assert_eq!(apply_filters(&[], &items), items);
    assert_eq!(apply_filters(&and_list, &items), vec![mr]);
}
