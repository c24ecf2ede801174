use crate::record::{FieldTable, Materialize};
use serde::Serialize;
use std::sync::OnceLock;

/// A tracker product with its components and versions.
///
/// Components and versions belong to the product and are dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub classification: String,
    pub default_milestone: String,
    pub has_unconfirmed: bool,
    pub components: Vec<ProductComponent>,
    pub versions: Vec<ProductVersion>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn all_versions(&self) -> Vec<&str> {
        self.versions.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn inactive_versions(&self) -> Vec<&str> {
        self.versions
            .iter()
            .filter(|v| !v.is_active)
            .map(|v| v.name.as_str())
            .collect()
    }
}

impl Materialize for Product {
    fn fields() -> &'static FieldTable<Self> {
        static FIELDS: OnceLock<FieldTable<Product>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldTable::<Product>::new()
                .scalar("id", |p, v: i64| p.id = v)
                .scalar("name", |p, v: String| p.name = v)
                .scalar("description", |p, v: String| p.description = v)
                .scalar("is_active", |p, v: bool| p.is_active = v)
                .scalar("classification", |p, v: String| p.classification = v)
                .scalar("default_milestone", |p, v: String| p.default_milestone = v)
                .scalar("has_unconfirmed", |p, v: bool| p.has_unconfirmed = v)
                .list("components", |p, v: Vec<ProductComponent>| p.components = v)
                .list("versions", |p, v: Vec<ProductVersion>| p.versions = v)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductComponent {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub default_assigned_to: String,
}

impl Materialize for ProductComponent {
    fn fields() -> &'static FieldTable<Self> {
        static FIELDS: OnceLock<FieldTable<ProductComponent>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldTable::<ProductComponent>::new()
                .scalar("id", |c, v: i64| c.id = v)
                .scalar("name", |c, v: String| c.name = v)
                .scalar("description", |c, v: String| c.description = v)
                .scalar("is_active", |c, v: bool| c.is_active = v)
                .scalar("default_assigned_to", |c, v: String| c.default_assigned_to = v)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductVersion {
    pub id: i64,
    pub name: String,
    pub sort_key: i64,
    pub is_active: bool,
}

impl Materialize for ProductVersion {
    fn fields() -> &'static FieldTable<Self> {
        static FIELDS: OnceLock<FieldTable<ProductVersion>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldTable::<ProductVersion>::new()
                .scalar("id", |v, id: i64| v.id = id)
                .scalar("name", |v, name: String| v.name = name)
                .scalar("sort_key", |v, key: i64| v.sort_key = key)
                .scalar("is_active", |v, active: bool| v.is_active = active)
        })
    }
}
