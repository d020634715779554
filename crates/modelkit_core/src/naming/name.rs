use crate::naming::inflector::{camelize, demodulize, pluralize, titleize, underscore};
use serde::Serialize;

/// Naming forms derived once from a declared model name.
///
/// For `Admin.ShipYard`: singular `admin_ship_yard`, plural
/// `admin_ship_yards`, human `Ship Yard`, element `ship_yard`,
/// collection type `Admin.ShipYardCollection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameDescriptor {
    pub name: String,
    pub collection_name: String,
    pub singular: String,
    pub plural: String,
    pub human: String,
    pub collection: String,
    pub param_key: String,
    pub route_key: String,
    pub element: String,
}

impl NameDescriptor {
    pub fn new(raw: &str) -> Self {
        let name = camelize(raw, true);
        let singular = underscore(&name).replace('/', "_");
        let plural = pluralize(&singular);
        let demodulized = demodulize(&name);

        Self {
            collection_name: format!("{name}Collection"),
            human: titleize(&underscore(&demodulized)),
            collection: plural.clone(),
            param_key: singular.clone(),
            route_key: plural.clone(),
            element: underscore(&demodulized),
            singular,
            plural,
            name,
        }
    }
}
