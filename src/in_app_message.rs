use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;

use crate::eval::{
    DecisionReason, EvaluationError, EvaluatorContext, EvaluatorRequest, ExperimentEvaluation,
    InAppMessageRequest, Result,
};
use crate::matcher::target;
use crate::target::Target;

/// The decision-relevant part of an in-app message: when it may show and to whom.
///
/// Rendering, frequency caps and hide-until state live in the platform layer; this engine
/// only answers eligibility.
#[derive(Clone, Debug, PartialEq)]
pub struct InAppMessage {
    pub id: i64,
    pub key: i64,
    pub status: InAppMessageStatus,
    pub period: Period,
    /// Identifier lists that bypass audience targeting entirely.
    pub user_overrides: Vec<UserOverride>,
    /// Audience gate; an empty list matches everyone.
    pub target_audiences: Vec<Target>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InAppMessageStatus {
    Draft,
    Pause,
    Active,
}

/// The display window of a message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Period {
    Always,
    Range {
        start_millis_inclusive: i64,
        end_millis_exclusive: i64,
    },
}

impl Period {
    pub fn within(&self, at: DateTime<Utc>) -> bool {
        match self {
            Period::Always => true,
            Period::Range { start_millis_inclusive, end_millis_exclusive } => {
                let millis = at.timestamp_millis();
                *start_millis_inclusive <= millis && millis < *end_millis_exclusive
            }
        }
    }
}

/// An explicit per-identifier allow list.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserOverride {
    pub identifier_type: String,
    pub identifiers: Vec<String>,
}

/// The outcome of an in-app message eligibility decision.
#[derive(Clone, Debug, PartialEq)]
pub struct InAppMessageEvaluation<'a> {
    pub reason: DecisionReason,
    pub target_evaluations: Vec<ExperimentEvaluation<'a>>,
    pub in_app_message: &'a InAppMessage,
    pub is_eligible: bool,
}

impl<'a> InAppMessageEvaluation<'a> {
    fn of(
        request: InAppMessageRequest<'a>,
        context: &EvaluatorContext<'a>,
        is_eligible: bool,
        reason: DecisionReason,
    ) -> InAppMessageEvaluation<'a> {
        InAppMessageEvaluation {
            reason,
            target_evaluations: context.evaluations().to_vec(),
            in_app_message: request.in_app_message,
            is_eligible,
        }
    }
}

/// Decide whether an in-app message is eligible to show for a user at the request instant.
pub fn evaluate_in_app_message<'a>(
    request: InAppMessageRequest<'a>,
) -> Result<InAppMessageEvaluation<'a>> {
    let mut context = EvaluatorContext::default();
    evaluate_in_app_message_in_context(request, &mut context)
}

pub(crate) fn evaluate_in_app_message_in_context<'a>(
    request: InAppMessageRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<InAppMessageEvaluation<'a>> {
    let key = request.key();
    if context.contains(key) {
        return Err(EvaluationError::CircularEvaluation { key });
    }
    context.push(key);
    let result = evaluate_internal(request, context);
    context.pop(key);
    result
}

fn evaluate_internal<'a>(
    request: InAppMessageRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<InAppMessageEvaluation<'a>> {
    let message = request.in_app_message;

    match message.status {
        InAppMessageStatus::Draft => Ok(InAppMessageEvaluation::of(
            request,
            context,
            false,
            DecisionReason::InAppMessageDraft,
        )),
        InAppMessageStatus::Pause => Ok(InAppMessageEvaluation::of(
            request,
            context,
            false,
            DecisionReason::InAppMessagePaused,
        )),
        InAppMessageStatus::Active => {
            if !message.period.within(request.requested_at) {
                return Ok(InAppMessageEvaluation::of(
                    request,
                    context,
                    false,
                    DecisionReason::NotInInAppMessagePeriod,
                ));
            }

            if is_user_overridden(request) {
                return Ok(InAppMessageEvaluation::of(
                    request,
                    context,
                    true,
                    DecisionReason::InAppMessageTarget,
                ));
            }

            if target::any_matches(
                &EvaluatorRequest::InAppMessage(request),
                context,
                &message.target_audiences,
            )? {
                Ok(InAppMessageEvaluation::of(
                    request,
                    context,
                    true,
                    DecisionReason::InAppMessageTarget,
                ))
            } else {
                Ok(InAppMessageEvaluation::of(
                    request,
                    context,
                    false,
                    DecisionReason::NotInInAppMessageTarget,
                ))
            }
        }
    }
}

fn is_user_overridden(request: InAppMessageRequest<'_>) -> bool {
    request.in_app_message.user_overrides.iter().any(|user_override| {
        request
            .user
            .identifier(&user_override.identifier_type)
            .is_some_and(|identifier| {
                user_override.identifiers.iter().any(|it| it == identifier)
            })
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InAppMessageDto {
    id: i64,
    key: i64,
    status: String,
    period: PeriodDto,
    #[serde(default)]
    target_context: TargetContextDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodDto {
    #[serde(rename = "type")]
    period_type: String,
    #[serde(default)]
    start_millis_inclusive: Option<i64>,
    #[serde(default)]
    end_millis_exclusive: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetContextDto {
    #[serde(default)]
    overrides: Vec<UserOverride>,
    #[serde(default)]
    targets: Vec<Target>,
}

impl InAppMessageDto {
    pub(crate) fn into_in_app_message(self) -> Option<InAppMessage> {
        let status = match self.status.as_str() {
            "DRAFT" => InAppMessageStatus::Draft,
            "PAUSE" => InAppMessageStatus::Pause,
            "ACTIVE" => InAppMessageStatus::Active,
            unknown => {
                warn!("in app message {} has unsupported status {}", self.id, unknown);
                return None;
            }
        };

        let period = match self.period.period_type.as_str() {
            "ALWAYS" => Period::Always,
            "CUSTOM" => Period::Range {
                start_millis_inclusive: self.period.start_millis_inclusive?,
                end_millis_exclusive: self.period.end_millis_exclusive?,
            },
            unknown => {
                warn!("in app message {} has unsupported period {}", self.id, unknown);
                return None;
            }
        };

        Some(InAppMessage {
            id: self.id,
            key: self.key,
            status,
            period,
            user_overrides: self.target_context.overrides,
            target_audiences: self.target_context.targets,
        })
    }
}
