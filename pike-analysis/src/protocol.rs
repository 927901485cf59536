//! JSON shapes exchanged with the editor layer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{analyze_source, AnalyzeOptions};
use crate::diagnostics::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub code: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Code that fails to tokenize answers with no diagnostics.
pub fn handle_request(request: &AnalyzeRequest, options: &AnalyzeOptions) -> AnalyzeResponse {
    let report = analyze_source(&request.code, &request.filename, options);
    debug!(
        file = %request.filename,
        diagnostics = report.diagnostics.len(),
        "handled analyze request"
    );
    AnalyzeResponse {
        diagnostics: report.diagnostics,
    }
}

pub fn handle_request_json(input: &str, options: &AnalyzeOptions) -> Result<String> {
    let request: AnalyzeRequest =
        serde_json::from_str(input).context("failed to parse analyze request")?;
    let response = handle_request(&request, options);
    serde_json::to_string(&response).context("failed to serialize analyze response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_wire_field_names() {
        let request = AnalyzeRequest {
            code: "string s; write(s);".to_string(),
            filename: "demo.pike".to_string(),
        };
        let response = handle_request(&request, &AnalyzeOptions::default());
        let value = serde_json::to_value(&response).expect("serialize");
        let diagnostic = &value["diagnostics"][0];
        assert_eq!(diagnostic["severity"], "warning");
        assert_eq!(diagnostic["source"], "uninitialized-variable");
        assert_eq!(diagnostic["variable"], "s");
        assert_eq!(diagnostic["position"]["file"], "demo.pike");
        assert_eq!(diagnostic["position"]["line"], 1);
        assert_eq!(diagnostic["position"]["character"], 16);
    }

    #[test]
    fn malformed_requests_are_errors() {
        let err = handle_request_json("{\"code\": 1}", &AnalyzeOptions::default())
            .expect_err("invalid request");
        assert!(err.to_string().contains("failed to parse analyze request"));
    }
}
