//! Response relevance validation.
//!
//! Declarative, per-family rules that flag specialized answers the router
//! should not trust. Handlers without a dedicated rule are accepted.

use ar_protocol::{HandlerDescriptor, HandlerFamily, HandlerOutput, ValidationResult};

/// Phrases that make a zero-count answer plausible.
const QUANTITY_MARKERS: &[&str] = &["how many", "number of"];

/// Checks specialized handler output for relevance signals.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator {
    enabled: bool,
}

impl ResponseValidator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn validate(
        &self,
        request: &str,
        output: &HandlerOutput,
        handler: &HandlerDescriptor,
    ) -> ValidationResult {
        if !self.enabled {
            return ValidationResult::relevant(1.0);
        }

        if output.has_error() {
            return ValidationResult::irrelevant(0.0, "Handler returned error");
        }

        match handler.family {
            HandlerFamily::ResourceQuery => validate_resource_query(request, output),
            HandlerFamily::Diagnostics => validate_diagnostics(output),
            HandlerFamily::General => ValidationResult::relevant(1.0),
        }
    }
}

fn validate_resource_query(request: &str, output: &HandlerOutput) -> ValidationResult {
    let lower = request.to_lowercase();

    // Owning zero resources is a legitimate answer to a quantity question.
    if output.count == Some(0) && QUANTITY_MARKERS.iter().any(|m| lower.contains(m)) {
        return ValidationResult::relevant(0.8);
    }

    if !output.has_service() && !output.has_resources() {
        return ValidationResult::irrelevant(0.2, "No service or resources in response");
    }

    ValidationResult::relevant(1.0)
}

fn validate_diagnostics(output: &HandlerOutput) -> ValidationResult {
    if !output.has_diagnostics() && !output.has_recommendations() {
        return ValidationResult::irrelevant(0.3, "No diagnostics or recommendations provided");
    }
    ValidationResult::relevant(1.0)
}
