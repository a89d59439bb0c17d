use sheet_migrate::diff::{Diff, FieldSpec, ObservedField, compare};
use sheet_migrate::plan::{ChangeKind, ChangeType, build_plan};
use sheet_migrate::schema::FieldType;

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Observed `[id:string, legacy, name]` against schema `[id:integer, email, name, phone]`.
fn mixed_diff() -> Diff {
    let observed = vec![
        ObservedField::new("id", FieldType::String, 0),
        ObservedField::new("legacy", FieldType::String, 1),
        ObservedField::new("name", FieldType::String, 2),
    ];
    let schema = vec![
        FieldSpec::new("id", FieldType::Integer, 0),
        FieldSpec::new("email", FieldType::String, 1),
        FieldSpec::new("name", FieldType::String, 2),
        FieldSpec::new("phone", FieldType::String, 3),
    ];
    compare(&observed, &schema)
}

fn paths(plan: &sheet_migrate::plan::Plan) -> Vec<&str> {
    plan.changes.iter().map(|change| change.path.as_str()).collect()
}

#[test]
fn nothing_to_do_is_up_to_date() {
    let plan = build_plan(&Diff::default(), "X", Some(&names(&["id"])));
    assert!(!plan.has_changes);
    assert_eq!(plan.summary, "Resource 'X' is up to date");
}

#[test]
fn canonical_order_interleaves_change_kinds() {
    let order = names(&["id", "email", "name", "phone"]);
    let plan = build_plan(&mixed_diff(), "users", Some(&order));
    assert_eq!(
        paths(&plan),
        vec!["users.id", "users.email", "users.phone", "users.legacy"]
    );
    assert_eq!(plan.changes[0].change_type(), ChangeType::Modify);
    assert_eq!(plan.changes[3].change_type(), ChangeType::Remove);
}

#[test]
fn fallback_order_groups_by_kind() {
    let plan = build_plan(&mixed_diff(), "users", None);
    assert_eq!(
        paths(&plan),
        vec!["users.email", "users.phone", "users.legacy", "users.id"]
    );
}

#[test]
fn fallback_sorts_adds_by_position() {
    let diff = Diff {
        fields_to_add: vec![
            FieldSpec::new("c", FieldType::String, 2),
            FieldSpec::new("a", FieldType::String, 0),
            FieldSpec::new("b", FieldType::String, 1),
        ],
        ..Diff::default()
    };
    let plan = build_plan(&diff, "t", None);
    assert_eq!(paths(&plan), vec!["t.a", "t.b", "t.c"]);
}

#[test]
fn repeated_builds_are_identical() {
    let order = names(&["id", "email", "name", "phone"]);
    let first = build_plan(&mixed_diff(), "users", Some(&order));
    for _ in 0..20 {
        assert_eq!(build_plan(&mixed_diff(), "users", Some(&order)), first);
    }
}

#[test]
fn add_description_names_one_based_position() {
    let plan = build_plan(&mixed_diff(), "users", None);
    assert_eq!(
        plan.changes[0].description,
        "Add new field 'email' of type string at position 2"
    );
    match &plan.changes[0].kind {
        ChangeKind::Add { field } => assert_eq!(field.position, 1),
        other => panic!("expected add, got {other:?}"),
    }
}

#[test]
fn reorder_is_a_single_trailing_change() {
    let observed = vec![
        ObservedField::new("email", FieldType::String, 0),
        ObservedField::new("id", FieldType::Integer, 1),
        ObservedField::new("name", FieldType::String, 2),
        ObservedField::new("legacy", FieldType::String, 3),
    ];
    let schema = vec![
        FieldSpec::new("id", FieldType::Integer, 0),
        FieldSpec::new("name", FieldType::String, 1),
        FieldSpec::new("email", FieldType::String, 2),
    ];
    let order = names(&["id", "name", "email"]);
    let plan = build_plan(&compare(&observed, &schema), "users", Some(&order));

    assert_eq!(plan.count(ChangeType::Reorder), 1);
    let last = plan.changes.last().expect("changes");
    assert_eq!(last.path, "users");
    assert_eq!(
        last.description,
        "Reorder fields to match schema: id, name, email"
    );
    assert_eq!(
        plan.summary,
        "Resource 'users': 1 field(s) to remove, fields need reordering"
    );
    assert!(plan.render().contains("  ↔ users: Reorder fields to match schema"));
}

#[test]
fn plans_serialize_to_json() {
    let order = names(&["id", "email", "name", "phone"]);
    let plan = build_plan(&mixed_diff(), "users", Some(&order));
    let json = serde_json::to_value(&plan).expect("serialize");
    assert_eq!(json["resource"], "users");
    assert_eq!(json["has_changes"], true);
    assert_eq!(json["changes"][0]["type"], "MODIFY");
    assert_eq!(json["changes"][0]["modification"]["new_type"], "integer");
    assert_eq!(json["changes"][1]["field"]["position"], 1);
}
