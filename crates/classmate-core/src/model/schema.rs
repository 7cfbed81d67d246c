//! Output schemas for structured generation.

use schemars::JsonSchema;
use schemars::generate::SchemaSettings;

/// Build the JSON Schema describing `T` for the model's response.
///
/// Subschemas are inlined and the `$schema`/`title` keys dropped, since the
/// model API only reads the structural keywords. Doc comments on `T`'s
/// fields end up as `description`s, which the model sees as guidance.
pub fn output_schema<T: JsonSchema>() -> serde_json::Value {
    let mut schema = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    schema.remove("$schema");
    schema.remove("title");
    schema.to_value()
}
