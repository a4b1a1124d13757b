//! Required-field response schemas and their validation.
//!
//! Each schema is sent to the reasoning service (as a strict JSON Schema) and
//! then enforced locally, since a service may ignore the constraint.

use iralens_core::{ChangeLevel, Dimension, EvidenceType};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Boolean,
    String,
    StringArray,
    Number { min: f64, max: f64 },
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, description: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        description,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field '{field}' has value {value:?} outside {allowed:?}")]
    NotInEnum {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("field '{field}' = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("cannot decode response: {0}")]
    Decode(String),
}

pub const LEXICAL: ResponseSchema = ResponseSchema {
    name: "lexical_assessment",
    fields: &[
        field(
            "lexical_has_changed",
            FieldKind::Boolean,
            "Whether vocabulary or keywords changed materially.",
        ),
        field(
            "lexical_summary",
            FieldKind::String,
            "Key changes in vocabulary and keywords.",
        ),
    ],
};

pub const FRAMING: ResponseSchema = ResponseSchema {
    name: "framing_assessment",
    fields: &[
        field(
            "framing_has_changed",
            FieldKind::Boolean,
            "Whether the company's narrative identity or mission shifted.",
        ),
        field(
            "framing_from_narrative",
            FieldKind::String,
            "Core identity or mission in the pre-IRA text.",
        ),
        field(
            "framing_to_narrative",
            FieldKind::String,
            "Core identity or mission in the post-IRA text.",
        ),
        field(
            "framing_summary",
            FieldKind::String,
            "The change in narrative identity, or 'No significant change'.",
        ),
    ],
};

pub const AUDIENCE: ResponseSchema = ResponseSchema {
    name: "audience_assessment",
    fields: &[
        field(
            "audience_has_changed",
            FieldKind::Boolean,
            "Whether the addressed stakeholders shifted.",
        ),
        field(
            "audience_primary_audience",
            FieldKind::String,
            "Main audience addressed, e.g. consumers, B2B customers, investors, policymakers.",
        ),
        field(
            "audience_summary",
            FieldKind::String,
            "Any shift in target audience, or 'No significant change'.",
        ),
    ],
};

pub const IRA_ALIGNMENT: ResponseSchema = ResponseSchema {
    name: "ira_alignment_assessment",
    fields: &[
        field(
            "ira_alignment_detected",
            FieldKind::Boolean,
            "Whether the post-IRA text aligns with the Inflation Reduction Act.",
        ),
        field(
            "ira_evidence_type",
            FieldKind::Enum(EvidenceType::VALUES),
            "Strongest kind of evidence found.",
        ),
        field(
            "ira_specific_evidence",
            FieldKind::StringArray,
            "Specific terms found, e.g. 'Inflation Reduction Act', '45Q', 'ITC', 'domestic content'.",
        ),
        field(
            "ira_reasoning",
            FieldKind::String,
            "Reasoning for the alignment assessment.",
        ),
    ],
};

pub const SYNTHESIS: ResponseSchema = ResponseSchema {
    name: "overall_synthesis",
    fields: &[
        field(
            "overall_change_level",
            FieldKind::Enum(ChangeLevel::VALUES),
            "Overall magnitude of the messaging change.",
        ),
        field(
            "overall_confidence",
            FieldKind::Number { min: 0.0, max: 1.0 },
            "Confidence in the overall change level, between 0 and 1.",
        ),
        field(
            "overall_synthesis_reasoning",
            FieldKind::String,
            "Synthesis of the four analyses justifying the change level.",
        ),
    ],
};

impl ResponseSchema {
    pub fn for_dimension(dimension: Dimension) -> &'static ResponseSchema {
        match dimension {
            Dimension::Lexical => &LEXICAL,
            Dimension::Framing => &FRAMING,
            Dimension::Audience => &AUDIENCE,
            Dimension::IraAlignment => &IRA_ALIGNMENT,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Check presence, type, enum membership and range of every field.
    /// Extra fields are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let object = value.as_object().ok_or(SchemaViolation::NotAnObject)?;
        for field_spec in self.fields {
            let field_value = object
                .get(field_spec.name)
                .filter(|v| !v.is_null())
                .ok_or(SchemaViolation::MissingField(field_spec.name))?;
            check_field(field_spec, field_value)?;
        }
        Ok(())
    }

    /// Validate, then decode into `T`.
    pub fn parse<T: DeserializeOwned>(&self, value: &Value) -> Result<T, SchemaViolation> {
        self.validate(value)?;
        serde_json::from_value(value.clone()).map_err(|e| SchemaViolation::Decode(e.to_string()))
    }

    /// Strict JSON Schema for structured-output requests.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field_spec in self.fields {
            let mut property = match field_spec.kind {
                FieldKind::Boolean => json!({"type": "boolean"}),
                FieldKind::String => json!({"type": "string"}),
                FieldKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
                FieldKind::Number { min, max } => {
                    json!({"type": "number", "minimum": min, "maximum": max})
                }
                FieldKind::Enum(values) => json!({"type": "string", "enum": values}),
            };
            property["description"] = json!(field_spec.description);
            properties.insert(field_spec.name.to_string(), property);
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names().collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }
}

fn check_field(field_spec: &FieldSpec, value: &Value) -> Result<(), SchemaViolation> {
    let wrong = |expected| SchemaViolation::WrongType {
        field: field_spec.name,
        expected,
    };
    match field_spec.kind {
        FieldKind::Boolean => {
            value.as_bool().ok_or_else(|| wrong("a boolean"))?;
        }
        FieldKind::String => {
            value.as_str().ok_or_else(|| wrong("a string"))?;
        }
        FieldKind::StringArray => {
            let items = value.as_array().ok_or_else(|| wrong("an array of strings"))?;
            if !items.iter().all(Value::is_string) {
                return Err(wrong("an array of strings"));
            }
        }
        FieldKind::Number { min, max } => {
            let number = value.as_f64().ok_or_else(|| wrong("a number"))?;
            if !(min..=max).contains(&number) {
                return Err(SchemaViolation::OutOfRange {
                    field: field_spec.name,
                    value: number,
                    min,
                    max,
                });
            }
        }
        FieldKind::Enum(allowed) => {
            let text = value.as_str().ok_or_else(|| wrong("a string"))?;
            if !allowed.contains(&text) {
                return Err(SchemaViolation::NotInEnum {
                    field: field_spec.name,
                    value: text.to_string(),
                    allowed,
                });
            }
        }
    }
    Ok(())
}
