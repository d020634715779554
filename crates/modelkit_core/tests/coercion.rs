use modelkit_core::types::date::parse_iso8601;
use modelkit_core::{
    add_member, attributes_from_json, AssociationKind, Attributes, CoercionError, Collection,
    CollectionType, FieldRule, ModelDeclaration, ModelError, ModelRegistry, Record, TypeRegistry,
    Value, TYPE_BOOLEAN, TYPE_DATE, TYPE_JSON, TYPE_NUMBER, TYPE_STRING,
};
use serde_json::json;
use std::rc::Rc;

fn fleet() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .declare_with_collection(ModelDeclaration::new("ship").has_many("ships"))
        .expect("declare ship");
    registry
}

fn attrs(payload: serde_json::Value) -> Attributes {
    attributes_from_json(payload).expect("object payload")
}

#[test]
fn has_many_builds_collection_from_array_of_objects() {
    let registry = fleet();
    let ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");

    let result = ship
        .coerce_attributes(&registry, attrs(json!({"ships": [{"key": "foo"}, {"key": "bar"}]})))
        .expect("coerce ships");
    let ships = result
        .get("ships")
        .and_then(Value::as_collection)
        .expect("ships collection");
    let ships = ships.borrow();

    assert_eq!(ships.type_name(), "ShipCollection");
    assert_eq!(ships.len(), 2);
    let keys = ships
        .models()
        .iter()
        .map(|member| {
            let member = member.borrow();
            assert_eq!(member.model_name(), "Ship");
            member.get("key").cloned()
        })
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![Some(Value::from("foo")), Some(Value::from("bar"))]);
}

#[test]
fn has_many_keeps_record_identity() {
    let registry = fleet();
    let ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");
    let first = registry
        .instantiate("ship", attrs(json!({"key": "foo"})))
        .expect("first")
        .into_ref();
    let second = registry
        .instantiate("ship", attrs(json!({"key": "bar"})))
        .expect("second")
        .into_ref();

    let mut input = Attributes::new();
    input.insert(
        "ships".to_string(),
        Value::Array(vec![
            Value::Record(Rc::clone(&first)),
            Value::Record(Rc::clone(&second)),
        ]),
    );
    let result = ship
        .coerce_attributes(&registry, input)
        .expect("coerce ships");
    let ships = result
        .get("ships")
        .and_then(Value::as_collection)
        .expect("ships collection");
    let ships = ships.borrow();

    assert_eq!(ships.type_name(), "ShipCollection");
    assert!(Rc::ptr_eq(&ships.models()[0], &first));
    assert!(Rc::ptr_eq(&ships.models()[1], &second));
}

#[test]
fn set_reuses_the_owned_collection() {
    let registry = fleet();
    let mut ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");
    let owned = ship
        .get("ships")
        .and_then(Value::as_collection)
        .map(Rc::clone)
        .expect("ships collection");

    ship.set(
        &registry,
        attrs(json!({"ships": [{"key": "foo"}]})),
        Default::default(),
    )
    .expect("set ships");

    let current = ship
        .get("ships")
        .and_then(Value::as_collection)
        .expect("ships collection");
    assert!(Rc::ptr_eq(current, &owned));
    assert_eq!(owned.borrow().len(), 1);
    let member = Rc::clone(&owned.borrow().models()[0]);
    let parent = member.borrow().collection().expect("back reference");
    assert!(Rc::ptr_eq(&parent, &owned));
}

#[test]
fn borrowed_incoming_collection_is_rejected() {
    let registry = fleet();
    let mut ship = registry
        .instantiate("ship", attrs(json!({"ships": [{"key": "foo"}]})))
        .expect("instantiate ship");
    let owned = ship
        .get("ships")
        .and_then(Value::as_collection)
        .map(Rc::clone)
        .expect("ships collection");

    let incoming = Collection::new(CollectionType::new("ShipCollection", "Ship")).into_ref();
    let member = registry
        .instantiate("ship", attrs(json!({"key": "bar"})))
        .expect("member")
        .into_ref();
    add_member(&incoming, member).expect("add member");

    let guard = incoming.borrow_mut();
    let err = ship
        .set_value(&registry, "ships", Value::Collection(Rc::clone(&incoming)))
        .expect_err("borrowed collection must fail");
    drop(guard);

    assert_eq!(
        err.to_string(),
        "borrowed collection can't be coerced into ShipCollection"
    );
    assert_eq!(owned.borrow().len(), 1);
}

#[test]
fn habtm_builds_collection_from_array_of_objects() {
    let mut registry = ModelRegistry::new();
    registry
        .declare_with_collection(ModelDeclaration::new("crew"))
        .expect("declare crew");
    let whaler = registry
        .declare(ModelDeclaration::new("whaler").has_and_belongs_to_many("crews"))
        .expect("declare whaler");
    assert_eq!(
        whaler
            .reflect_on_association("crews")
            .map(|association| association.kind()),
        Some(AssociationKind::HasAndBelongsToMany)
    );

    let record = registry
        .instantiate("whaler", attrs(json!({"crews": [{"n": 1}, {"n": 2}]})))
        .expect("instantiate whaler");
    let crews = record
        .get("crews")
        .and_then(Value::as_collection)
        .expect("crews collection");
    let crews = crews.borrow();

    assert_eq!(crews.type_name(), "CrewCollection");
    assert_eq!(crews.model_name(), "Crew");
    let numbers = crews
        .models()
        .iter()
        .map(|member| {
            let member = member.borrow();
            assert_eq!(member.model_name(), "Crew");
            member.get("n").cloned()
        })
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec![Some(Value::from(1.0)), Some(Value::from(2.0))]);
}

#[test]
fn wrong_association_shape_is_rejected() {
    let registry = fleet();
    let ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");

    let err = ship
        .coerce_attributes(&registry, attrs(json!({"ships": "many"})))
        .expect_err("string is not a collection");
    assert_eq!(err.to_string(), "string can't be coerced into ShipCollection");
}

#[test]
fn json_load_wraps_objects_in_anonymous_records() {
    let types = TypeRegistry::with_builtin_types();
    let json = FieldRule::new(TYPE_JSON);

    let loaded = types
        .load(&json, &Value::Object(Attributes::new()), "key")
        .expect("load empty object");
    let record = loaded.as_record().expect("record");
    assert_eq!(record.borrow().model_name(), "key");
    assert!(record.borrow().attributes().is_empty());

    let loaded = types
        .load(&json, &Value::from(json!({"key": "value"})), "settings")
        .expect("load object");
    let record = loaded.as_record().expect("record");
    assert_eq!(record.borrow().get("key"), Some(&Value::from("value")));
}

#[test]
fn json_load_rejects_scalars() {
    let types = TypeRegistry::with_builtin_types();
    let err = types
        .load(&FieldRule::new(TYPE_JSON), &Value::Bool(true), "key")
        .expect_err("boolean is not json");
    assert_eq!(err.to_string(), "boolean can't be coerced into JSON");
}

#[test]
fn json_dump_projects_records_and_passes_objects() {
    let types = TypeRegistry::with_builtin_types();
    let json = FieldRule::new(TYPE_JSON);

    let record = Record::anonymous("key", attrs(json!({"foo": "bar"}))).into_ref();
    let dumped = types
        .dump(&json, &Value::Record(record), "key")
        .expect("dump record");
    assert_eq!(dumped.to_json().expect("wire form"), json!({"foo": "bar"}));

    let dumped = types
        .dump(&json, &Value::from(json!({"foo": "bar"})), "key")
        .expect("dump object");
    assert_eq!(dumped.to_json().expect("wire form"), json!({"foo": "bar"}));
}

#[test]
fn date_round_trips_through_iso8601() {
    let types = TypeRegistry::with_builtin_types();
    let date = FieldRule::new(TYPE_DATE);

    let loaded = types
        .load(&date, &Value::from("2011-06-02T09:34:29+02:00"), "created_at")
        .expect("load date");
    let parsed = loaded.as_date().expect("date value");
    assert_eq!(parsed.timestamp_millis(), 1_307_000_069_000);

    let dumped = types.dump(&date, &loaded, "created_at").expect("dump date");
    assert_eq!(dumped, Value::from("2011-06-02T07:34:29.000Z"));

    let from_millis = types
        .load(&date, &Value::from(1_307_000_069_000_i64), "created_at")
        .expect("load epoch millis");
    assert_eq!(from_millis, loaded);
}

#[test]
fn date_parser_accepts_partial_forms() {
    let date_only = parse_iso8601("2011-06-02").expect("date only");
    assert_eq!(date_only.to_rfc3339(), "2011-06-02T00:00:00+00:00");

    let fractional = parse_iso8601("2011-06-02T09:34:29.5-01:30").expect("fractional offset");
    assert_eq!(fractional.timestamp_millis() % 1000, 500);

    assert!(matches!(
        parse_iso8601("June 2nd"),
        Err(CoercionError::InvalidDate(_))
    ));
}

#[test]
fn scalar_coercers_normalize_wire_values() {
    let types = TypeRegistry::with_builtin_types();

    let number = types
        .load(&FieldRule::new(TYPE_NUMBER), &Value::from("12.5"), "crew")
        .expect("load number");
    assert_eq!(number, Value::from(12.5));

    let text = types
        .load(&FieldRule::new(TYPE_STRING), &Value::from(12_i64), "name")
        .expect("load string");
    assert_eq!(text, Value::from("12"));

    let flag = types
        .load(&FieldRule::new(TYPE_BOOLEAN), &Value::from("true"), "active")
        .expect("load boolean");
    assert_eq!(flag, Value::Bool(true));
}

#[test]
fn array_rules_coerce_each_element() {
    let types = TypeRegistry::with_builtin_types();
    let rule = FieldRule::new(TYPE_NUMBER).array();

    let loaded = types
        .load(&rule, &Value::from(json!(["1", 2])), "scores")
        .expect("load numbers");
    assert_eq!(loaded, Value::Array(vec![Value::from(1.0), Value::from(2.0)]));

    let err = types
        .load(&rule, &Value::from("1"), "scores")
        .expect_err("scalar is not an array");
    assert!(matches!(err, CoercionError::NotAnArray { .. }));
}

#[test]
fn unknown_type_tags_are_unsupported() {
    let types = TypeRegistry::with_builtin_types();
    let err = types.get("money").err().expect("money is not registered");
    assert_eq!(err.to_string(), "Coercion of money unsupported");

    let mut registry = ModelRegistry::new();
    registry
        .declare(ModelDeclaration::new("invoice").field("total", FieldRule::new("money")))
        .expect("declare invoice");
    let err = registry
        .instantiate("invoice", attrs(json!({"total": 12})))
        .expect_err("money cannot be loaded");
    assert!(matches!(err, ModelError::Coercion(CoercionError::Unsupported(_))));
}
