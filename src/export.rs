//! Multi-format export of a converted document.

use crate::converter::DocumentModel;
use crate::error::ExportError;
use crate::job::{FormatOutput, FormatResult};
use serde_json::Value;
use tracing::warn;

/// Canonical format identifiers understood by the exporter. The identifier
/// set is open; anything else yields a per-format failure entry.
pub const SUPPORTED_FORMATS: &[&str] = &["markdown", "structured", "tagged", "html"];

/// Produces every requested representation of the model.
///
/// Each format succeeds or fails on its own: a failed export is recorded as
/// an explicit failure marker and never aborts the remaining formats or the
/// job. Unknown identifiers get failure markers too, so the returned map's
/// keys always match the requested set.
pub fn export(model: &DocumentModel, requested: &[String]) -> FormatOutput {
    let mut output = FormatOutput::new();
    for format in requested {
        let entry = match export_format(model, format) {
            Ok(value) => FormatResult::Content(value),
            Err(e) => {
                warn!(format = %format, error = %e, "Format export failed");
                FormatResult::failure(e.to_string())
            }
        };
        output.insert(format.clone(), entry);
    }
    output
}

fn export_format(model: &DocumentModel, format: &str) -> Result<Value, ExportError> {
    match format {
        "markdown" => Ok(Value::String(model.to_markdown())),
        "structured" => model.to_structured().map_err(|e| ExportError::Render {
            format: format.to_string(),
            message: e.to_string(),
        }),
        "tagged" => Ok(Value::String(model.to_tagged())),
        "html" => Ok(Value::String(model.to_html())),
        other => Err(ExportError::Unsupported(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Block, Page};
    use pretty_assertions::assert_eq;

    fn model() -> DocumentModel {
        DocumentModel {
            name: "doc.txt".to_string(),
            pages: vec![Page {
                blocks: vec![
                    Block::Heading {
                        level: 1,
                        text: "Title".to_string(),
                    },
                    Block::Paragraph {
                        text: "Body text.".to_string(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn output_keys_match_requested_set() {
        let requested: Vec<String> = SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect();
        let output = export(&model(), &requested);

        let keys: Vec<&str> = output.keys().map(String::as_str).collect();
        let mut expected: Vec<&str> = SUPPORTED_FORMATS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert!(output.values().all(|entry| !entry.is_failure()));
    }

    #[test]
    fn supported_formats_produce_non_empty_content() {
        let output = export(&model(), &["markdown".to_string(), "html".to_string()]);
        for entry in output.values() {
            match entry {
                FormatResult::Content(Value::String(s)) => assert!(!s.is_empty()),
                other => panic!("expected string content, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_format_gets_explicit_failure_entry() {
        let output = export(&model(), &["markdown".to_string(), "pptx".to_string()]);

        assert!(!output["markdown"].is_failure());
        match &output["pptx"] {
            FormatResult::Failure { error } => assert!(error.contains("unsupported")),
            other => panic!("expected failure marker, got {other:?}"),
        }
    }

    #[test]
    fn one_failed_format_does_not_abort_the_rest() {
        let requested = vec![
            "bogus-a".to_string(),
            "tagged".to_string(),
            "bogus-b".to_string(),
        ];
        let output = export(&model(), &requested);

        assert_eq!(output.len(), 3);
        assert!(output["bogus-a"].is_failure());
        assert!(output["bogus-b"].is_failure());
        assert!(!output["tagged"].is_failure());
    }
}
