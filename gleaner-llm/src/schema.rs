//! Target shape for extracted service listings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One service offered on a page, as the model is asked to report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` when the page lists no price.
    #[serde(default)]
    pub price: Option<f64>,
}

impl Product {
    /// JSON Schema handed to the extractor to shape the model's output.
    pub fn json_schema() -> Value {
        json!({
            "title": "Product",
            "type": "object",
            "properties": {
                "name": {
                    "title": "Name",
                    "type": "string"
                },
                "description": {
                    "title": "Description",
                    "anyOf": [{ "type": "string" }, { "type": "null" }],
                    "default": null
                },
                "price": {
                    "title": "Price",
                    "anyOf": [{ "type": "number" }, { "type": "null" }],
                    "default": null
                }
            },
            "required": ["name"]
        })
    }
}
