use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::DicatConfig;

/// JSON schema for `dicat.toml`, for editor tooling and CI validation.
#[must_use]
pub fn json_schema() -> RootSchema {
    schema_for!(DicatConfig)
}
