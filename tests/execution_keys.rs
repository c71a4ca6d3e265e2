use tagflow::dag::{ExecutionKey, aggregate, execution_key, filters_of, OperatorStatus};
use tagflow::filter::Filter;

#[test]
fn key_round_trips_through_its_filter_list() {
    let f = Filter::tag("SeriesDescription").with_value("axial");
    assert_eq!(filters_of(&execution_key(Some(&f))), vec![f]);
    assert_eq!(execution_key(None), ExecutionKey::Blank);
    assert!(filters_of(&ExecutionKey::Blank).is_empty());
}

#[test]
fn nested_keys_extend_and_trim_the_group_path() {
    let outer = Filter::tag("PatientID").with_value("p1");
    let inner = Filter::tag("SeriesDescription").with_value("axial");

    let k1 = ExecutionKey::Blank.child(&outer);
    let k2 = k1.child(&inner);

    assert_eq!(k1, execution_key(Some(&outer)));
    assert_eq!(filters_of(&k2), vec![outer.clone(), inner.clone()]);
    assert_eq!(k2.group(), Some(&inner));
    assert_eq!(k2.parent(), k1);
    assert_eq!(k1.parent(), ExecutionKey::Blank);
    assert_eq!(ExecutionKey::Blank.parent(), ExecutionKey::Blank);

    // Same inner value under a different outer group is a different key.
    let other = ExecutionKey::Blank
        .child(&Filter::tag("PatientID").with_value("p2"))
        .child(&inner);
    assert_ne!(k2, other);
}

#[test]
fn status_aggregation_precedence() {
    use OperatorStatus::*;

    assert_eq!(aggregate([Failed, Running, Pending]), Failed);
    assert_eq!(aggregate([Unexecutable, Pending]), Unexecutable);
    assert_eq!(aggregate([Completed, Completed]), Completed);
    assert_eq!(aggregate([]), Pending);
    assert_eq!(aggregate([Pending, Pending]), Pending);
    assert_eq!(aggregate([Running, Pending]), Running);
    assert_eq!(aggregate([Failed, Unexecutable, Completed]), Failed);
    assert_eq!(aggregate([Completed, Pending]), Running);
}

#[test]
fn terminal_statuses() {
    assert!(OperatorStatus::Completed.is_terminal());
    assert!(OperatorStatus::Failed.is_terminal());
    assert!(OperatorStatus::Unexecutable.is_terminal());
    assert!(!OperatorStatus::Pending.is_terminal());
    assert!(!OperatorStatus::Running.is_terminal());
}
