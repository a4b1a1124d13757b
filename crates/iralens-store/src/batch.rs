//! Conversion between result rows and Arrow record batches.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use iralens_core::{ResultRow, results};

use crate::StoreError;

fn utf8<F>(rows: &[ResultRow], f: F) -> ArrayRef
where
    F: Fn(&ResultRow) -> Option<&str>,
{
    Arc::new(rows.iter().map(f).collect::<StringArray>())
}

fn boolean<F>(rows: &[ResultRow], f: F) -> ArrayRef
where
    F: Fn(&ResultRow) -> Option<bool>,
{
    Arc::new(rows.iter().map(f).collect::<BooleanArray>())
}

fn uint64<F>(rows: &[ResultRow], f: F) -> ArrayRef
where
    F: Fn(&ResultRow) -> Option<u64>,
{
    Arc::new(rows.iter().map(f).collect::<UInt64Array>())
}

fn float64<F>(rows: &[ResultRow], f: F) -> ArrayRef
where
    F: Fn(&ResultRow) -> Option<f64>,
{
    Arc::new(rows.iter().map(f).collect::<Float64Array>())
}

/// Build one batch with the result-row schema. Column order follows the schema.
pub fn rows_to_batch(rows: &[ResultRow]) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(results::result_row_schema());
    let columns: Vec<ArrayRef> = vec![
        utf8(rows, |r| Some(r.company_name.as_str())),
        utf8(rows, |r| Some(r.domain.as_str())),
        utf8(rows, |r| r.website.as_deref()),
        float64(rows, |r| r.company_size),
        utf8(rows, |r| Some(r.status.as_str())),
        utf8(rows, |r| r.pre_snapshot_url.as_deref()),
        utf8(rows, |r| r.post_snapshot_url.as_deref()),
        utf8(rows, |r| r.pre_snapshot_timestamp.as_deref()),
        utf8(rows, |r| r.post_snapshot_timestamp.as_deref()),
        utf8(rows, |r| r.pre_snapshot_path.as_deref()),
        utf8(rows, |r| r.post_snapshot_path.as_deref()),
        utf8(rows, |r| r.pre_snapshot_error.as_deref()),
        utf8(rows, |r| r.post_snapshot_error.as_deref()),
        uint64(rows, |r| r.pre_word_count),
        uint64(rows, |r| r.post_word_count),
        utf8(rows, |r| r.pre_content_error.as_deref()),
        utf8(rows, |r| r.post_content_error.as_deref()),
        boolean(rows, |r| r.lexical_has_changed),
        utf8(rows, |r| r.lexical_summary.as_deref()),
        boolean(rows, |r| r.framing_has_changed),
        utf8(rows, |r| r.framing_from_narrative.as_deref()),
        utf8(rows, |r| r.framing_to_narrative.as_deref()),
        utf8(rows, |r| r.framing_summary.as_deref()),
        boolean(rows, |r| r.audience_has_changed),
        utf8(rows, |r| r.audience_primary_audience.as_deref()),
        utf8(rows, |r| r.audience_summary.as_deref()),
        boolean(rows, |r| r.ira_alignment_detected),
        utf8(rows, |r| r.ira_evidence_type.as_deref()),
        utf8(rows, |r| r.ira_specific_evidence.as_deref()),
        utf8(rows, |r| r.ira_reasoning.as_deref()),
        utf8(rows, |r| r.overall_change_level.as_deref()),
        float64(rows, |r| r.overall_confidence),
        utf8(rows, |r| r.overall_synthesis_reasoning.as_deref()),
        utf8(rows, |r| r.error_message.as_deref()),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &'static str,
) -> Result<&'a T, StoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::MissingColumn(name.to_string()))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected,
        })
}

/// Read access to the typed columns of one result batch.
struct Columns<'a> {
    batch: &'a RecordBatch,
}

impl<'a> Columns<'a> {
    fn utf8(&self, name: &str) -> Result<impl Fn(usize) -> Option<String> + 'a, StoreError> {
        let col = column::<StringArray>(self.batch, name, "Utf8")?;
        Ok(move |i| (!col.is_null(i)).then(|| col.value(i).to_string()))
    }

    fn required_utf8(&self, name: &str) -> Result<impl Fn(usize) -> Result<String, StoreError> + 'a, StoreError> {
        let get = self.utf8(name)?;
        let name = name.to_string();
        Ok(move |i| get(i).ok_or_else(|| StoreError::UnexpectedNull(name.clone())))
    }

    fn boolean(&self, name: &str) -> Result<impl Fn(usize) -> Option<bool> + 'a, StoreError> {
        let col = column::<BooleanArray>(self.batch, name, "Boolean")?;
        Ok(move |i| (!col.is_null(i)).then(|| col.value(i)))
    }

    fn uint64(&self, name: &str) -> Result<impl Fn(usize) -> Option<u64> + 'a, StoreError> {
        let col = column::<UInt64Array>(self.batch, name, "UInt64")?;
        Ok(move |i| (!col.is_null(i)).then(|| col.value(i)))
    }

    fn float64(&self, name: &str) -> Result<impl Fn(usize) -> Option<f64> + 'a, StoreError> {
        let col = column::<Float64Array>(self.batch, name, "Float64")?;
        Ok(move |i| (!col.is_null(i)).then(|| col.value(i)))
    }
}

/// Decode a batch written by [`rows_to_batch`] back into rows.
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<ResultRow>, StoreError> {
    let c = Columns { batch };
    let company_name = c.required_utf8("company_name")?;
    let domain = c.required_utf8("domain")?;
    let website = c.utf8("website")?;
    let company_size = c.float64("company_size")?;
    let status = c.required_utf8("status")?;
    let pre_snapshot_url = c.utf8("pre_snapshot_url")?;
    let post_snapshot_url = c.utf8("post_snapshot_url")?;
    let pre_snapshot_timestamp = c.utf8("pre_snapshot_timestamp")?;
    let post_snapshot_timestamp = c.utf8("post_snapshot_timestamp")?;
    let pre_snapshot_path = c.utf8("pre_snapshot_path")?;
    let post_snapshot_path = c.utf8("post_snapshot_path")?;
    let pre_snapshot_error = c.utf8("pre_snapshot_error")?;
    let post_snapshot_error = c.utf8("post_snapshot_error")?;
    let pre_word_count = c.uint64("pre_word_count")?;
    let post_word_count = c.uint64("post_word_count")?;
    let pre_content_error = c.utf8("pre_content_error")?;
    let post_content_error = c.utf8("post_content_error")?;
    let lexical_has_changed = c.boolean("lexical_has_changed")?;
    let lexical_summary = c.utf8("lexical_summary")?;
    let framing_has_changed = c.boolean("framing_has_changed")?;
    let framing_from_narrative = c.utf8("framing_from_narrative")?;
    let framing_to_narrative = c.utf8("framing_to_narrative")?;
    let framing_summary = c.utf8("framing_summary")?;
    let audience_has_changed = c.boolean("audience_has_changed")?;
    let audience_primary_audience = c.utf8("audience_primary_audience")?;
    let audience_summary = c.utf8("audience_summary")?;
    let ira_alignment_detected = c.boolean("ira_alignment_detected")?;
    let ira_evidence_type = c.utf8("ira_evidence_type")?;
    let ira_specific_evidence = c.utf8("ira_specific_evidence")?;
    let ira_reasoning = c.utf8("ira_reasoning")?;
    let overall_change_level = c.utf8("overall_change_level")?;
    let overall_confidence = c.float64("overall_confidence")?;
    let overall_synthesis_reasoning = c.utf8("overall_synthesis_reasoning")?;
    let error_message = c.utf8("error_message")?;

    (0..batch.num_rows())
        .map(|i| -> Result<ResultRow, StoreError> {
            Ok(ResultRow {
                company_name: company_name(i)?,
                domain: domain(i)?,
                website: website(i),
                company_size: company_size(i),
                status: status(i)?,
                pre_snapshot_url: pre_snapshot_url(i),
                post_snapshot_url: post_snapshot_url(i),
                pre_snapshot_timestamp: pre_snapshot_timestamp(i),
                post_snapshot_timestamp: post_snapshot_timestamp(i),
                pre_snapshot_path: pre_snapshot_path(i),
                post_snapshot_path: post_snapshot_path(i),
                pre_snapshot_error: pre_snapshot_error(i),
                post_snapshot_error: post_snapshot_error(i),
                pre_word_count: pre_word_count(i),
                post_word_count: post_word_count(i),
                pre_content_error: pre_content_error(i),
                post_content_error: post_content_error(i),
                lexical_has_changed: lexical_has_changed(i),
                lexical_summary: lexical_summary(i),
                framing_has_changed: framing_has_changed(i),
                framing_from_narrative: framing_from_narrative(i),
                framing_to_narrative: framing_to_narrative(i),
                framing_summary: framing_summary(i),
                audience_has_changed: audience_has_changed(i),
                audience_primary_audience: audience_primary_audience(i),
                audience_summary: audience_summary(i),
                ira_alignment_detected: ira_alignment_detected(i),
                ira_evidence_type: ira_evidence_type(i),
                ira_specific_evidence: ira_specific_evidence(i),
                ira_reasoning: ira_reasoning(i),
                overall_change_level: overall_change_level(i),
                overall_confidence: overall_confidence(i),
                overall_synthesis_reasoning: overall_synthesis_reasoning(i),
                error_message: error_message(i),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> ResultRow {
        ResultRow {
            company_name: "Acme".into(),
            domain: "acme.com".into(),
            website: Some("www.acme.com".into()),
            company_size: Some(250.0),
            status: "completed".into(),
            pre_snapshot_url: Some("https://web.archive.org/web/20220701000000/https://acme.com/".into()),
            pre_word_count: Some(812),
            post_word_count: Some(790),
            lexical_has_changed: Some(true),
            ira_specific_evidence: Some("45X; domestic content".into()),
            overall_confidence: Some(0.75),
            ..ResultRow::default()
        }
    }

    fn insufficient() -> ResultRow {
        ResultRow {
            company_name: "Nowhere Inc".into(),
            domain: "nowhere.example".into(),
            status: "insufficient_snapshots".into(),
            pre_snapshot_error: Some("no capture in 2022 for any candidate path".into()),
            ..ResultRow::default()
        }
    }

    #[test]
    fn batch_has_result_schema_and_nulls() {
        let batch = rows_to_batch(&[completed(), insufficient()]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 34);
        assert_eq!(batch.schema().as_ref(), &results::result_row_schema());

        let words = batch
            .column_by_name("pre_word_count")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(words.value(0), 812);
        assert!(words.is_null(1));
    }

    #[test]
    fn decodes_what_it_encodes() {
        let rows = vec![completed(), insufficient()];
        let batch = rows_to_batch(&rows).unwrap();
        assert_eq!(batch_to_rows(&batch).unwrap(), rows);
    }

    #[test]
    fn empty_input_gives_empty_batch() {
        let batch = rows_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(batch_to_rows(&batch).unwrap().is_empty());
    }

    #[test]
    fn missing_column_is_reported() {
        let schema = Arc::new(arrow::datatypes::Schema::new(vec![
            arrow::datatypes::Field::new("company_name", arrow::datatypes::DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["Acme"])) as ArrayRef],
        )
        .unwrap();
        assert!(matches!(
            batch_to_rows(&batch),
            Err(StoreError::MissingColumn(name)) if name == "domain"
        ));
    }
}
