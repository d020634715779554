use modelkit_core::{
    attributes_from_json, AssociationOptions, Attributes, FieldRule, JsonOptions,
    ModelDeclaration, ModelError, ModelRegistry, Persist, PersistError, PersistMethod,
    PersistRequest, PersistResponse, PersistResult, RecordEvent, RecordService, SaveOptions,
    SaveOutcome, Value, TYPE_DATE,
};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

#[derive(Default)]
struct RecordingPersist {
    requests: RefCell<Vec<PersistRequest>>,
    responses: RefCell<VecDeque<PersistResult<PersistResponse>>>,
}

impl RecordingPersist {
    fn replying(response: PersistResult<PersistResponse>) -> Self {
        let persist = Self::default();
        persist.responses.borrow_mut().push_back(response);
        persist
    }

    fn last_request(&self) -> PersistRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("a request was sent")
    }
}

impl Persist for RecordingPersist {
    fn persist(&self, request: &PersistRequest) -> PersistResult<PersistResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(PersistResponse::Saved(json!({}))))
    }
}

fn fleet() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .declare_with_collection(
            ModelDeclaration::new("ship")
                .has_many("ships")
                .field("launched_at", FieldRule::new(TYPE_DATE)),
        )
        .expect("declare ship");
    registry
        .declare(ModelDeclaration::new("account"))
        .expect("declare account");
    registry
        .declare(ModelDeclaration::new("agent").extends("account"))
        .expect("declare agent");
    registry
        .declare(ModelDeclaration::new("dock"))
        .expect("declare dock");
    registry
        .declare(
            ModelDeclaration::new("boat")
                .belongs_to("dock")
                .belongs_to_with("owner", AssociationOptions::new().polymorphic()),
        )
        .expect("declare boat");
    registry
}

fn attrs(payload: serde_json::Value) -> Attributes {
    attributes_from_json(payload).expect("object payload")
}

#[test]
fn create_posts_to_collection_url_and_applies_response() {
    let registry = fleet();
    let persist = RecordingPersist::replying(Ok(PersistResponse::Saved(json!({"id": 1}))));
    let service = RecordService::new(&registry, &persist);

    let (ship, outcome) = service
        .create("ship", attrs(json!({"name": "Argo"})))
        .expect("create ship");

    assert_eq!(outcome, SaveOutcome::Saved);
    let request = persist.last_request();
    assert_eq!(request.method, PersistMethod::Create);
    assert_eq!(request.url, "/ships");
    assert_eq!(request.body, json!({"ship": {"name": "Argo"}}));
    assert!(!ship.is_new());
    assert_eq!(ship.url(), "/ships/1");
}

#[test]
fn persisted_records_are_updated_in_full() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate_json(
            "ship",
            json!({"id": 5, "name": "Argo", "launched_at": "2013-04-10T21:24:28Z"}),
        )
        .expect("instantiate ship");

    service
        .save(&mut ship, &SaveOptions::default())
        .expect("save ship");

    let request = persist.last_request();
    assert_eq!(request.method, PersistMethod::Update);
    assert_eq!(request.url, "/ships/5");
    assert_eq!(
        request.body,
        json!({"ship": {
            "id": 5,
            "name": "Argo",
            "launched_at": "2013-04-10T21:24:28.000Z"
        }})
    );
}

#[test]
fn update_attributes_sends_only_the_patch() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate_json("ship", json!({"id": 5, "name": "Argo", "crew": 40}))
        .expect("instantiate ship");

    service
        .update_attributes(&mut ship, attrs(json!({"name": "Argo II"})))
        .expect("patch ship");

    let request = persist.last_request();
    assert_eq!(request.method, PersistMethod::Patch);
    assert_eq!(request.body, json!({"ship": {"name": "Argo II"}}));
    assert_eq!(ship.get("name"), Some(&Value::from("Argo II")));
}

#[test]
fn patching_an_association_sends_its_foreign_key() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut boat = registry
        .instantiate_json("boat", json!({"id": 1, "name": "Skiff"}))
        .expect("instantiate boat");
    let dock = registry
        .instantiate_json("dock", json!({"id": 9}))
        .expect("instantiate dock")
        .into_ref();

    let mut attributes = Attributes::new();
    attributes.insert("dock".to_string(), Value::Record(dock));
    service
        .update_attributes(&mut boat, attributes)
        .expect("patch dock");

    assert_eq!(boat.get("dock_id"), Some(&Value::from(9.0)));
    assert_eq!(persist.last_request().body, json!({"boat": {"dock_id": 9}}));

    service
        .update_attributes(&mut boat, attrs(json!({"dock": null})))
        .expect("detach dock");
    assert_eq!(persist.last_request().body, json!({"boat": {"dock_id": null}}));
}

#[test]
fn patching_a_polymorphic_association_sends_id_and_type() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut boat = registry
        .instantiate_json("boat", json!({"id": 1}))
        .expect("instantiate boat");
    let owner = registry
        .instantiate_json("ship", json!({"id": 3}))
        .expect("instantiate ship")
        .into_ref();

    let mut attributes = Attributes::new();
    attributes.insert("owner".to_string(), Value::Record(owner));
    service
        .update_attributes(&mut boat, attributes)
        .expect("patch owner");

    assert_eq!(
        persist.last_request().body,
        json!({"boat": {"owner_id": 3, "owner_type": "Ship"}})
    );
}

#[test]
fn patch_nests_included_associations() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate_json("ship", json!({"id": 5, "name": "Argo"}))
        .expect("instantiate ship");

    let options = SaveOptions {
        patch: true,
        include: JsonOptions::new().include("ships"),
        attributes: Some(attrs(json!({"ships": [{"name": "Tender"}]}))),
    };
    service.save(&mut ship, &options).expect("patch ship");

    assert_eq!(
        persist.last_request().body,
        json!({"ship": {"ships_attributes": [{"name": "Tender"}]}})
    );
}

#[test]
fn descendants_save_under_the_base_route() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);

    service
        .create("agent", attrs(json!({"name": "Smith"})))
        .expect("create agent");

    let request = persist.last_request();
    assert_eq!(request.url, "/accounts");
    assert_eq!(
        request.body,
        json!({"account": {"name": "Smith", "type": "Agent"}})
    );
}

#[test]
fn validation_rejection_is_stored_on_the_record() {
    let registry = fleet();
    let mut errors = BTreeMap::new();
    errors.insert("name".to_string(), vec!["can't be blank".to_string()]);
    let persist = RecordingPersist::replying(Ok(PersistResponse::Invalid(errors.clone())));
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");

    let outcome = service
        .save(&mut ship, &SaveOptions::default())
        .expect("rejection is not an error");

    assert_eq!(outcome, SaveOutcome::Invalid(errors.clone()));
    assert_eq!(
        ship.errors_on("name"),
        Some(&["can't be blank".to_string()][..])
    );
    assert_eq!(ship.drain_events(), vec![RecordEvent::Invalid { errors }]);
    assert!(ship.is_new());
}

#[test]
fn transport_failures_surface_as_errors() {
    let registry = fleet();
    let persist = RecordingPersist::replying(Err(PersistError::new(
        PersistMethod::Create,
        "unavailable",
        "gateway timeout",
    )));
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate("ship", Attributes::new())
        .expect("instantiate ship");

    let err = service
        .save(&mut ship, &SaveOptions::default())
        .expect_err("transport failure");

    match err {
        ModelError::Persist(err) => assert_eq!(err.code, "unavailable"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(ship.is_new());
    assert!(ship.validation_errors().is_none());
}

#[test]
fn touch_patches_timestamps() {
    let registry = fleet();
    let persist = RecordingPersist::default();
    let service = RecordService::new(&registry, &persist);
    let mut ship = registry
        .instantiate_json("ship", json!({"id": 5, "name": "Argo"}))
        .expect("instantiate ship");

    service
        .touch(&mut ship, &["launched_at"])
        .expect("touch ship");

    let request = persist.last_request();
    assert_eq!(request.method, PersistMethod::Patch);
    let body = request.body["ship"]
        .as_object()
        .expect("namespaced payload");
    let mut keys = body.keys().cloned().collect::<Vec<_>>();
    keys.sort();
    assert_eq!(keys, vec!["launched_at", "updated_at"]);
    assert_eq!(body["launched_at"], body["updated_at"]);
    assert!(ship.get("updated_at").and_then(Value::as_date).is_some());
}
