use tagflow::errors::TagflowError;
use tagflow::filter::{Filter, LogicalOperator, apply_filter};
use tagflow::grouping::group_by;
use tagflow::item::{AttributeKind, TaggedItem};
use tagflow_test_utils::builders::{many_series_items, series_item, two_series_items};

#[test]
fn predicate_filter_yields_single_bucket_keyed_by_itself() {
    let items = two_series_items();
    let f = Filter::tag("SeriesDescription").with_value("axial");

    let groups = group_by(&items, &f).unwrap();

    assert_eq!(groups.len(), 1);
    let (key, bucket) = groups.iter().next().unwrap();
    assert_eq!(key, &f);
    assert_eq!(key.id(), f.id());
    assert_eq!(bucket, &apply_filter(&f, &items));
    assert_eq!(bucket.len(), 3);
}

#[test]
fn grouping_filter_yields_one_bucket_per_distinct_value() {
    let mut items = two_series_items();
    items.push(TaggedItem::new("untagged").with_tag("Modality", "MR"));

    let f = Filter::tag("SeriesDescription");
    let groups = group_by(&items, &f).unwrap();

    assert_eq!(groups.len(), 2);

    let axial = Filter::tag("SeriesDescription")
        .with_value("axial")
        .operator(LogicalOperator::Or);
    let sagittal = Filter::tag("SeriesDescription")
        .with_value("sagittal")
        .operator(LogicalOperator::Or);
    assert_eq!(groups[&axial].len(), 3);
    assert_eq!(groups[&sagittal].len(), 1);

    for bucket in groups.values() {
        assert!(bucket.iter().all(|i| items.contains(i)));
        assert!(bucket.iter().all(|i| i.name != "untagged"));
    }
}

#[test]
fn item_with_repeated_tag_lands_in_each_value_bucket_once() {
    let item = series_item("multi", "axial")
        .with_tag("SeriesDescription", "localizer")
        .with_tag("SeriesDescription", "axial");

    let groups = group_by(&[item], &Filter::tag("SeriesDescription")).unwrap();

    assert_eq!(groups.len(), 2);
    assert!(groups.values().all(|b| b.len() == 1));
}

#[test]
fn grouping_by_every_attribute_value_is_rejected() {
    let items = two_series_items();
    let result = group_by(&items, &Filter::attribute(AttributeKind::Filename));

    match result {
        Err(TagflowError::UnsupportedGrouping(msg)) => assert!(msg.contains("filename")),
        other => panic!("expected UnsupportedGrouping, got {other:?}"),
    }
}

#[test]
fn empty_input_yields_no_buckets() {
    let groups = group_by(&[], &Filter::tag("SeriesDescription")).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn equal_items_collapse_within_each_of_many_buckets() {
    let mut items = many_series_items(5_000);
    items.extend(many_series_items(5_000));

    let groups = group_by(&items, &Filter::tag("SeriesDescription")).unwrap();

    assert_eq!(groups.len(), 5_000);
    assert!(groups.values().all(|bucket| bucket.len() == 1));
    let key = Filter::tag("SeriesDescription")
        .with_value("series-00042")
        .operator(LogicalOperator::Or);
    assert_eq!(groups[&key], vec![series_item("img42", "series-00042")]);
}
