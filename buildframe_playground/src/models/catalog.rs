//! Catalog-shaped sample models, including a self-referencing type.

use buildframe_derive::Buildable;

#[derive(Buildable, Debug, Clone)]
pub struct OrderLine {
    pub sku: String,
    pub quantity: u32,
    #[buildable(default = "1.0")]
    pub unit_price: f64,
}

#[derive(Buildable, Debug, Clone)]
pub struct Order {
    pub reference: String,
    pub lines: Vec<OrderLine>,
    pub note: Option<String>,
}

/// A category tree node. The self-reference keeps the generated builder
/// finite: the parent must be supplied as an already built value.
#[derive(Buildable, Debug, Clone)]
pub struct Category {
    pub name: String,
    pub parent: Option<Box<Category>>,
}
