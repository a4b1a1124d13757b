/// Arrow schema definitions for run output.
pub mod results {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema for the flattened per-company result rows.
    ///
    /// Only identity and status are non-nullable; everything else depends on
    /// how far the company got through the pipeline.
    pub fn result_row_schema() -> Schema {
        Schema::new(vec![
            Field::new("company_name", DataType::Utf8, false),
            Field::new("domain", DataType::Utf8, false),
            Field::new("website", DataType::Utf8, true),
            Field::new("company_size", DataType::Float64, true),
            Field::new("status", DataType::Utf8, false),
            Field::new("pre_snapshot_url", DataType::Utf8, true),
            Field::new("post_snapshot_url", DataType::Utf8, true),
            Field::new("pre_snapshot_timestamp", DataType::Utf8, true),
            Field::new("post_snapshot_timestamp", DataType::Utf8, true),
            Field::new("pre_snapshot_path", DataType::Utf8, true),
            Field::new("post_snapshot_path", DataType::Utf8, true),
            Field::new("pre_snapshot_error", DataType::Utf8, true),
            Field::new("post_snapshot_error", DataType::Utf8, true),
            Field::new("pre_word_count", DataType::UInt64, true),
            Field::new("post_word_count", DataType::UInt64, true),
            Field::new("pre_content_error", DataType::Utf8, true),
            Field::new("post_content_error", DataType::Utf8, true),
            Field::new("lexical_has_changed", DataType::Boolean, true),
            Field::new("lexical_summary", DataType::Utf8, true),
            Field::new("framing_has_changed", DataType::Boolean, true),
            Field::new("framing_from_narrative", DataType::Utf8, true),
            Field::new("framing_to_narrative", DataType::Utf8, true),
            Field::new("framing_summary", DataType::Utf8, true),
            Field::new("audience_has_changed", DataType::Boolean, true),
            Field::new("audience_primary_audience", DataType::Utf8, true),
            Field::new("audience_summary", DataType::Utf8, true),
            Field::new("ira_alignment_detected", DataType::Boolean, true),
            Field::new("ira_evidence_type", DataType::Utf8, true),
            Field::new("ira_specific_evidence", DataType::Utf8, true),
            Field::new("ira_reasoning", DataType::Utf8, true),
            Field::new("overall_change_level", DataType::Utf8, true),
            Field::new("overall_confidence", DataType::Float64, true),
            Field::new("overall_synthesis_reasoning", DataType::Utf8, true),
            Field::new("error_message", DataType::Utf8, true),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::results;

    #[test]
    fn result_row_schema_has_expected_fields() {
        let schema = results::result_row_schema();
        assert_eq!(schema.fields().len(), 34);
        assert!(schema.field_with_name("lexical_has_changed").is_ok());
        assert!(schema.field_with_name("overall_synthesis_reasoning").is_ok());
        assert!(!schema.field_with_name("status").unwrap().is_nullable());
    }
}
