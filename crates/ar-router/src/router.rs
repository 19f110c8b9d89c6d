//! Request router: classify → select → invoke → validate → escalate → log.
//!
//! Each call to [`Router::route`] is an independent pipeline. The feedback
//! store is the only state shared between concurrent cycles. A cycle makes
//! at most two handler invocations (the selected handler and one fallback
//! escalation) and appends exactly one routing decision.

use std::sync::Arc;

use ar_protocol::{
    CycleStatus, FallbackReason, FeedbackAck, HandlerOutput, IntentScore, RoutedResponse,
    RoutingAnalysis, RoutingDecision, SystemInfo, UserFeedbackEntry, ValidationResult,
};

use crate::classifier::{self, Classification};
use crate::config::RoutingConfig;
use crate::error::{RouterError, RouterResult};
use crate::fallback::FallbackAdapter;
use crate::handler::{self, FallbackContext};
use crate::registry::{CapabilityRegistry, RegisteredHandler};
use crate::store::FeedbackStore;
use crate::validator::ResponseValidator;

/// Outcome of the selection gate.
enum Selection<'a> {
    Specialized {
        entry: &'a RegisteredHandler,
        score: &'a IntentScore,
    },
    Fallback(FallbackReason),
    Unclear,
}

pub struct Router {
    registry: Arc<CapabilityRegistry>,
    store: Arc<FeedbackStore>,
    config: RoutingConfig,
    validator: ResponseValidator,
    fallback: FallbackAdapter,
}

impl Router {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        store: Arc<FeedbackStore>,
        config: RoutingConfig,
    ) -> Self {
        let validator = ResponseValidator::new(config.validate_responses);
        let fallback = FallbackAdapter::new(&registry, config.handler_timeout());
        Self {
            registry,
            store,
            config,
            validator,
            fallback,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<FeedbackStore> {
        &self.store
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Run one routing cycle for a free-text request.
    pub async fn route(&self, text: &str) -> RoutedResponse {
        let classification = classifier::classify(&self.registry, text);
        tracing::debug!(
            total_matches = classification.total_matches,
            best = ?classification.best().map(|s| &s.handler_id),
            "request classified"
        );

        match self.select(&classification) {
            Selection::Specialized { entry, score } => {
                self.run_specialized(text, entry, score, &classification)
                    .await
            }
            Selection::Fallback(reason) => self.run_fallback(text, reason, &classification).await,
            Selection::Unclear => self.unclear(text, &classification).await,
        }
    }

    /// Selection gate. The top-ranked handler (first declared on ties) is
    /// used only if it clears both the match-count and confidence minimums.
    fn select<'a>(&'a self, classification: &'a Classification) -> Selection<'a> {
        if let Some(best) = classification.best() {
            let qualifies = best.match_count > 0
                && best.match_count >= self.config.min_keyword_matches
                && best.normalized_confidence >= self.config.min_confidence_threshold;
            if qualifies {
                if let Some(entry) = self.registry.lookup(&best.handler_id) {
                    return Selection::Specialized { entry, score: best };
                }
            }
        }

        if !self.config.enable_fallback {
            return Selection::Unclear;
        }

        let reason = if classification.is_empty() {
            FallbackReason::NoKeywordsMatched
        } else {
            FallbackReason::LowConfidence
        };
        Selection::Fallback(reason)
    }

    async fn run_specialized(
        &self,
        text: &str,
        entry: &RegisteredHandler,
        score: &IntentScore,
        classification: &Classification,
    ) -> RoutedResponse {
        let handler_id = entry.id();
        let mut analysis = RoutingAnalysis {
            selected_handler: Some(handler_id.to_string()),
            confidence: score.normalized_confidence,
            is_fallback: false,
            fallback_reason: None,
            routing_reason: format!("Matched keywords: [{}]", score.matched_terms.join(", ")),
            response_validation: None,
            context_provided: false,
            intent_scores: classification.ranked.clone(),
        };

        tracing::info!(
            handler_id = %handler_id,
            confidence = score.normalized_confidence,
            matches = score.match_count,
            "routing to specialized handler"
        );

        let output = match handler::invoke(
            entry.handler.as_ref(),
            text,
            None,
            self.config.handler_timeout(),
        )
        .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(handler_id = %handler_id, error = %e, "specialized handler failed");
                if self.config.fallback_for_errors {
                    let ctx = FallbackContext::agent_error(handler_id, e.to_string(), None);
                    return self.escalate(text, score, ctx, analysis).await;
                }
                let confidence = score.normalized_confidence;
                return self
                    .handler_fault(text, handler_id, confidence, e.to_string(), analysis, None)
                    .await;
            }
        };

        if output.has_error() && self.config.fallback_for_errors {
            let message = output.error_message();
            tracing::warn!(
                handler_id = %handler_id,
                error = %message,
                "specialized handler returned an error"
            );
            let ctx = FallbackContext::agent_error(handler_id, message, Some(output));
            return self.escalate(text, score, ctx, analysis).await;
        }

        let validation = self.validator.validate(text, &output, &entry.descriptor);
        analysis.response_validation = Some(validation.clone());

        if !validation.is_relevant && self.config.enable_fallback {
            tracing::warn!(
                handler_id = %handler_id,
                reasons = ?validation.reasons,
                "specialized response rejected"
            );
            let ctx = FallbackContext::irrelevant(handler_id, validation, output);
            return self.escalate(text, score, ctx, analysis).await;
        }

        if output.has_error() {
            let message = output.error_message();
            let confidence = score.normalized_confidence;
            return self
                .handler_fault(text, handler_id, confidence, message, analysis, Some(output))
                .await;
        }

        self.log(RoutingDecision::new(
            text,
            handler_id,
            score.normalized_confidence,
            false,
            true,
            None,
        ))
        .await;

        RoutedResponse {
            status: CycleStatus::Succeeded,
            success: true,
            analysis,
            result: Some(output),
            error: None,
            fallback_attempted: false,
            usage_examples: Default::default(),
        }
    }

    /// Single escalation to the fallback handler after a specialized attempt.
    async fn escalate(
        &self,
        text: &str,
        score: &IntentScore,
        context: FallbackContext,
        mut analysis: RoutingAnalysis,
    ) -> RoutedResponse {
        let reason = context.reason;
        let attempted = context.failed_handler_id.clone();
        let original_error = match (&context.error, &context.validation_failure) {
            (Some(error), _) => RouterError::HandlerFault {
                handler_id: attempted.clone(),
                message: error.clone(),
            },
            (None, Some(validation)) => RouterError::ValidationRejected {
                handler_id: attempted.clone(),
                reasons: validation.reasons.clone(),
            },
            (None, None) => RouterError::HandlerFault {
                handler_id: attempted.clone(),
                message: reason.to_string(),
            },
        };

        analysis.selected_handler = Some(self.fallback.handler_id().to_string());
        analysis.is_fallback = true;
        analysis.fallback_reason = Some(reason);
        analysis.context_provided = true;
        analysis.routing_reason = format!(
            "Escalated from {attempted} to fallback handler: {reason}"
        );

        tracing::info!(
            attempted_handler_id = %attempted,
            handler_id = %self.fallback.handler_id(),
            reason = %reason,
            "escalating to fallback handler"
        );

        match self.fallback.invoke(text, Some(&context), reason).await {
            Ok(resp) => {
                self.log(
                    RoutingDecision::new(
                        text,
                        &resp.handler_id,
                        score.normalized_confidence,
                        true,
                        true,
                        Some(reason),
                    )
                    .with_attempted(&attempted),
                )
                .await;

                RoutedResponse {
                    status: CycleStatus::Succeeded,
                    success: true,
                    analysis,
                    result: Some(resp.output),
                    error: None,
                    fallback_attempted: true,
                    usage_examples: Default::default(),
                }
            }
            Err(e) => {
                let fault = RouterError::FallbackFault {
                    original: original_error.to_string(),
                    fallback: e.to_string(),
                };
                tracing::error!(error = %fault, "fallback escalation failed");

                self.log(
                    RoutingDecision::new(
                        text,
                        self.fallback.handler_id(),
                        score.normalized_confidence,
                        true,
                        false,
                        Some(reason),
                    )
                    .with_attempted(&attempted),
                )
                .await;

                RoutedResponse {
                    status: CycleStatus::Failed,
                    success: false,
                    analysis,
                    result: None,
                    error: Some(fault.to_string()),
                    fallback_attempted: true,
                    usage_examples: Default::default(),
                }
            }
        }
    }

    /// Fallback selected directly by the gate (no specialized attempt).
    async fn run_fallback(
        &self,
        text: &str,
        reason: FallbackReason,
        classification: &Classification,
    ) -> RoutedResponse {
        let handler_id = self.fallback.handler_id().to_string();
        let analysis = RoutingAnalysis {
            selected_handler: Some(handler_id.clone()),
            confidence: 1.0,
            is_fallback: true,
            fallback_reason: Some(reason),
            routing_reason: format!("Fallback to general handler: {reason}"),
            response_validation: None,
            context_provided: false,
            intent_scores: classification.ranked.clone(),
        };

        tracing::info!(handler_id = %handler_id, reason = %reason, "routing to fallback handler");

        match self.fallback.invoke(text, None, reason).await {
            Ok(resp) => {
                self.log(RoutingDecision::new(text, &handler_id, 1.0, true, true, Some(reason)))
                    .await;
                RoutedResponse {
                    status: CycleStatus::Succeeded,
                    success: true,
                    analysis,
                    result: Some(resp.output),
                    error: None,
                    fallback_attempted: false,
                    usage_examples: Default::default(),
                }
            }
            Err(e) => {
                let fault = RouterError::FallbackFault {
                    original: format!("no specialized handler selected: {reason}"),
                    fallback: e.to_string(),
                };
                tracing::error!(error = %fault, "fallback handler failed");
                self.log(RoutingDecision::new(text, &handler_id, 1.0, true, false, Some(reason)))
                    .await;
                RoutedResponse {
                    status: CycleStatus::Failed,
                    success: false,
                    analysis,
                    result: None,
                    error: Some(fault.to_string()),
                    fallback_attempted: false,
                    usage_examples: Default::default(),
                }
            }
        }
    }

    /// Specialized failure that cannot be escalated.
    async fn handler_fault(
        &self,
        text: &str,
        handler_id: &str,
        confidence: f64,
        message: String,
        analysis: RoutingAnalysis,
        output: Option<HandlerOutput>,
    ) -> RoutedResponse {
        let fault = RouterError::HandlerFault {
            handler_id: handler_id.to_string(),
            message,
        };
        tracing::error!(error = %fault, "request failed without escalation");

        self.log(RoutingDecision::new(text, handler_id, confidence, false, false, None))
            .await;

        RoutedResponse {
            status: CycleStatus::Failed,
            success: false,
            analysis,
            result: output,
            error: Some(fault.to_string()),
            fallback_attempted: false,
            usage_examples: Default::default(),
        }
    }

    /// Nothing qualified and fallback is disabled: no handler runs.
    async fn unclear(&self, text: &str, classification: &Classification) -> RoutedResponse {
        let best = classification.best();
        let logged_id = best
            .map(|s| s.handler_id.clone())
            .unwrap_or_else(|| self.fallback.handler_id().to_string());
        let confidence = best.map_or(0.0, |s| s.normalized_confidence);

        tracing::info!(total_matches = classification.total_matches, "request intent unclear");
        self.log(RoutingDecision::new(text, logged_id, confidence, false, false, None))
            .await;

        RoutedResponse {
            status: CycleStatus::Unclear,
            success: false,
            analysis: RoutingAnalysis {
                selected_handler: None,
                confidence,
                is_fallback: false,
                fallback_reason: None,
                routing_reason: "Could not determine the intent of the request".into(),
                response_validation: None,
                context_provided: false,
                intent_scores: classification.ranked.clone(),
            },
            result: None,
            error: Some(RouterError::SelectionAmbiguous.to_string()),
            fallback_attempted: false,
            usage_examples: self.registry.usage_examples(),
        }
    }

    async fn log(&self, decision: RoutingDecision) {
        tracing::info!(
            handler_id = %decision.selected_handler_id,
            confidence = decision.confidence,
            is_fallback = decision.is_fallback,
            succeeded = decision.succeeded,
            reason = ?decision.fallback_reason,
            "routing decision"
        );
        if self.config.learning_enabled {
            self.store.append(decision).await;
        }
    }

    /// Record explicit user feedback and write it through to storage.
    ///
    /// A storage failure is logged and reported as `persisted = false`;
    /// the entry stays in memory.
    pub async fn submit_feedback(
        &self,
        request_text: &str,
        handler_id: &str,
        was_helpful: bool,
        comment: Option<String>,
    ) -> RouterResult<FeedbackAck> {
        if !self.registry.contains(handler_id) {
            return Err(RouterError::UnknownHandler(handler_id.to_string()));
        }

        let entry = UserFeedbackEntry::new(request_text, handler_id, was_helpful, comment);
        let persisted = match self.store.append_and_flush(entry).await {
            Ok(()) => true,
            Err(e) => {
                let err = RouterError::from(e);
                tracing::warn!(error = %err, "feedback kept in memory only");
                false
            }
        };

        tracing::info!(handler_id = %handler_id, was_helpful, persisted, "user feedback recorded");

        let suggestions = if was_helpful {
            Vec::new()
        } else {
            self.registry
                .iter()
                .filter(|e| e.id() != handler_id)
                .map(|e| {
                    format!(
                        "Consider trying {} for similar requests ({})",
                        e.id(),
                        e.descriptor.description
                    )
                })
                .collect()
        };

        let message = if was_helpful {
            "Thanks! Feedback recorded.".to_string()
        } else {
            format!("Feedback recorded. Alternatives to {handler_id} are listed below.")
        };

        Ok(FeedbackAck {
            feedback_recorded: true,
            persisted,
            suggestions,
            message,
        })
    }

    /// Registry listing for the help/status command.
    pub async fn system_info(&self) -> SystemInfo {
        SystemInfo {
            name: "Agent Router".into(),
            handlers: self.registry.summaries(),
            usage_examples: self.registry.usage_examples(),
            retained_history: self.store.len().await,
        }
    }

    /// Validate a handler's output outside a routing cycle.
    pub fn validate(
        &self,
        text: &str,
        handler_id: &str,
        output: &HandlerOutput,
    ) -> RouterResult<ValidationResult> {
        let entry = self
            .registry
            .lookup(handler_id)
            .ok_or_else(|| RouterError::UnknownHandler(handler_id.to_string()))?;
        Ok(self.validator.validate(text, output, &entry.descriptor))
    }
}
