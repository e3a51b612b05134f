//! Pure manifest-step validator.
//!
//! Walks the manifest's steps in declared order, resolves a payload for
//! each step from the trace set through a fixed resolver chain, and applies
//! the step's declared checks to the resolved payload. The function is
//! deterministic: the same manifest and traces always produce a
//! byte-identical serialized report.
//!
//! The resolver chain is explicit and ordered. First the per-step probe
//! trace (action `ts-parse-<step id>`), then the final-output trace
//! (action `final-output`) when the step declares an `output_key`. The
//! first resolver to yield a payload wins; a step no resolver satisfies is
//! reported `missing`. Malformed payloads fail their checks instead of
//! aborting the run.

use serde_json::Value;

use flowtrace_types::manifest::{
    ManifestStep, StepCheck, StepResult, StepStatus, StepValidation, ValidationReport,
    WorkflowManifest,
};
use flowtrace_types::trace::CommunicationTrace;

/// Action prefix of per-step probe traces.
pub const PROBE_ACTION_PREFIX: &str = "ts-parse-";

/// Action of the final-output trace carrying aggregated step results.
pub const FINAL_OUTPUT_ACTION: &str = "final-output";

/// Options controlling one validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Validate only the manifest prefix up to and including this step id.
    /// An id that matches no step leaves the full manifest in scope.
    pub up_to_step: Option<String>,
}

type Resolver = fn(&ManifestStep, &[CommunicationTrace]) -> Option<Value>;

/// Resolver chain, tried in order per step.
const RESOLVERS: [Resolver; 2] = [resolve_probe, resolve_final_output];

/// Validate `traces` against `manifest`, producing the full report.
pub fn validate(
    manifest_id: &str,
    manifest: &WorkflowManifest,
    traces: &[CommunicationTrace],
    options: &ValidateOptions,
) -> ValidationReport {
    let steps_in_scope = truncate_steps(&manifest.steps, options);

    let mut results = Vec::with_capacity(steps_in_scope.len());
    for step in steps_in_scope {
        results.push(validate_step(step, traces));
    }

    let passed = results.iter().filter(|r| r.status == StepStatus::Pass).count();
    let failed = results.iter().filter(|r| r.status == StepStatus::Fail).count();
    let missing = results
        .iter()
        .filter(|r| r.status == StepStatus::Missing)
        .count();

    ValidationReport {
        manifest_id: manifest_id.to_string(),
        manifest_version: manifest.version.clone(),
        steps_checked: results.len(),
        passed,
        failed,
        missing,
        steps: results,
    }
}

/// Apply the inclusive `up_to_step` truncation.
fn truncate_steps<'a>(steps: &'a [ManifestStep], options: &ValidateOptions) -> &'a [ManifestStep] {
    let Some(up_to) = &options.up_to_step else {
        return steps;
    };
    match steps.iter().position(|s| s.id == *up_to) {
        Some(index) => &steps[..=index],
        None => steps,
    }
}

fn validate_step(step: &ManifestStep, traces: &[CommunicationTrace]) -> StepResult {
    let payload = RESOLVERS.iter().find_map(|resolve| resolve(step, traces));

    let Some(payload) = payload else {
        return StepResult {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            status: StepStatus::Missing,
            checks: vec![StepCheck {
                name: "trace_exists".to_string(),
                passed: false,
                detail: Some(format!("no trace yielded a payload for step '{}'", step.id)),
            }],
        };
    };

    let checks = match &step.validation {
        Some(validation) => run_checks(&payload, validation),
        None => vec![StepCheck {
            name: "no_rules".to_string(),
            passed: true,
            detail: Some("step declares no validation rules".to_string()),
        }],
    };

    let status = if checks.iter().all(|c| c.passed) {
        StepStatus::Pass
    } else {
        StepStatus::Fail
    };

    StepResult {
        step_id: step.id.clone(),
        step_name: step.name.clone(),
        status,
        checks,
    }
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

/// Resolve from the step's probe trace: the latest trace whose action is
/// `ts-parse-<step id>`. Uses the response payload's `data` object when it
/// has one, otherwise the whole payload.
fn resolve_probe(step: &ManifestStep, traces: &[CommunicationTrace]) -> Option<Value> {
    let action = format!("{PROBE_ACTION_PREFIX}{}", step.id);
    let trace = traces
        .iter()
        .rev()
        .find(|t| t.action.as_deref() == Some(action.as_str()))?;
    let body = trace.response_payload.as_ref()?;
    match body.get("data") {
        Some(data) if data.is_object() => Some(data.clone()),
        _ => Some(body.clone()),
    }
}

/// Resolve from the final-output trace, for steps declaring an
/// `output_key`: the value at `data.<output_key>` in the latest
/// `final-output` response payload.
fn resolve_final_output(step: &ManifestStep, traces: &[CommunicationTrace]) -> Option<Value> {
    let output_key = step.output_key.as_deref()?;
    let trace = traces
        .iter()
        .rev()
        .find(|t| t.action.as_deref() == Some(FINAL_OUTPUT_ACTION))?;
    trace
        .response_payload
        .as_ref()?
        .get("data")?
        .get(output_key)
        .cloned()
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Run the declared checks against a resolved payload, `required` keys
/// first, then `min_count` keys in their deterministic map order.
fn run_checks(payload: &Value, validation: &StepValidation) -> Vec<StepCheck> {
    let mut checks = Vec::with_capacity(validation.required.len() + validation.min_count.len());

    for key in &validation.required {
        let value = payload.get(key);
        let passed = value.is_some_and(|v| !v.is_null());
        checks.push(StepCheck {
            name: format!("required:{key}"),
            passed,
            detail: (!passed).then(|| format!("key '{key}' is absent or null")),
        });
    }

    for (key, min) in &validation.min_count {
        let count = payload
            .get(key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let passed = count >= *min;
        checks.push(StepCheck {
            name: format!("min_count:{key}"),
            passed,
            detail: (!passed).then(|| format!("key '{key}' holds {count} item(s), expected at least {min}")),
        });
    }

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flowtrace_types::envelope::SourceService;
    use flowtrace_types::trace::TraceStatus;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn trace_with(action: &str, response_payload: Option<Value>) -> CommunicationTrace {
        CommunicationTrace {
            id: Uuid::now_v7(),
            trace_id: "t-audit".to_string(),
            attempt_number: 1,
            execution_id: Some(Uuid::now_v7()),
            source_service: SourceService::Bilko,
            destination_service: "local".to_string(),
            workflow_id: "rules-audit".to_string(),
            action: Some(action.to_string()),
            user_id: "user-1".to_string(),
            requested_at: Utc::now(),
            responded_at: Some(Utc::now()),
            duration_ms: Some(3),
            request_payload: json!({}),
            response_payload,
            overall_status: TraceStatus::Success,
            error_code: None,
            error_detail: None,
        }
    }

    fn step(id: &str, output_key: Option<&str>, validation: Option<StepValidation>) -> ManifestStep {
        ManifestStep {
            id: id.to_string(),
            name: id.to_uppercase(),
            output_key: output_key.map(String::from),
            validation,
        }
    }

    fn manifest(steps: Vec<ManifestStep>) -> WorkflowManifest {
        WorkflowManifest {
            version: "1.0".to_string(),
            steps,
        }
    }

    #[test]
    fn probe_trace_data_object_satisfies_required() {
        let manifest = manifest(vec![step(
            "parse-rules",
            None,
            Some(StepValidation {
                required: vec!["ruleset".to_string()],
                min_count: BTreeMap::new(),
            }),
        )]);
        let traces = vec![trace_with(
            "ts-parse-parse-rules",
            Some(json!({"data": {"ruleset": "default"}})),
        )];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.passed, 1);
        assert_eq!(report.steps[0].status, StepStatus::Pass);
        assert_eq!(report.steps[0].checks[0].name, "required:ruleset");
        assert!(report.steps[0].checks[0].passed);
    }

    #[test]
    fn probe_without_data_object_uses_whole_payload() {
        let manifest = manifest(vec![step(
            "parse-rules",
            None,
            Some(StepValidation {
                required: vec!["ruleset".to_string()],
                min_count: BTreeMap::new(),
            }),
        )]);
        let traces = vec![trace_with("ts-parse-parse-rules", Some(json!({"ruleset": "x"})))];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Pass);
    }

    #[test]
    fn final_output_resolver_covers_steps_with_output_key() {
        let manifest = manifest(vec![step(
            "run-checks",
            Some("checks"),
            Some(StepValidation {
                required: vec![],
                min_count: BTreeMap::from([("findings".to_string(), 2)]),
            }),
        )]);
        let traces = vec![trace_with(
            "final-output",
            Some(json!({"data": {"checks": {"findings": [1, 2, 3]}}})),
        )];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Pass);
        assert_eq!(report.steps[0].checks[0].name, "min_count:findings");
    }

    #[test]
    fn probe_wins_over_final_output() {
        let manifest = manifest(vec![step(
            "run-checks",
            Some("checks"),
            Some(StepValidation {
                required: vec!["from_probe".to_string()],
                min_count: BTreeMap::new(),
            }),
        )]);
        let traces = vec![
            trace_with(
                "final-output",
                Some(json!({"data": {"checks": {"from_final": true}}})),
            ),
            trace_with(
                "ts-parse-run-checks",
                Some(json!({"data": {"from_probe": true}})),
            ),
        ];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Pass);
    }

    #[test]
    fn later_probe_trace_shadows_earlier_one() {
        let manifest = manifest(vec![step(
            "parse-rules",
            None,
            Some(StepValidation {
                required: vec!["fixed".to_string()],
                min_count: BTreeMap::new(),
            }),
        )]);
        let traces = vec![
            trace_with("ts-parse-parse-rules", Some(json!({"broken": true}))),
            trace_with("ts-parse-parse-rules", Some(json!({"fixed": true}))),
        ];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Pass);
    }

    #[test]
    fn unresolved_step_is_missing_with_trace_exists_check() {
        let manifest = manifest(vec![step("never-ran", None, None)]);
        let traces = vec![trace_with("ts-parse-something-else", Some(json!({})))];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.missing, 1);
        let result = &report.steps[0];
        assert_eq!(result.status, StepStatus::Missing);
        assert_eq!(result.checks.len(), 1);
        assert_eq!(result.checks[0].name, "trace_exists");
        assert!(!result.checks[0].passed);
    }

    #[test]
    fn probe_without_response_payload_does_not_resolve() {
        let manifest = manifest(vec![step("parse-rules", None, None)]);
        let traces = vec![trace_with("ts-parse-parse-rules", None)];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Missing);
    }

    #[test]
    fn resolved_step_without_rules_passes_with_no_rules_check() {
        let manifest = manifest(vec![step("summarize", None, None)]);
        let traces = vec![trace_with("ts-parse-summarize", Some(json!({"any": 1})))];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        let result = &report.steps[0];
        assert_eq!(result.status, StepStatus::Pass);
        assert_eq!(result.checks[0].name, "no_rules");
        assert!(result.checks[0].passed);
    }

    #[test]
    fn required_null_value_fails() {
        let manifest = manifest(vec![step(
            "parse-rules",
            None,
            Some(StepValidation {
                required: vec!["ruleset".to_string()],
                min_count: BTreeMap::new(),
            }),
        )]);
        let traces = vec![trace_with("ts-parse-parse-rules", Some(json!({"ruleset": null})))];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        let result = &report.steps[0];
        assert_eq!(result.status, StepStatus::Fail);
        assert!(!result.checks[0].passed);
        assert!(result.checks[0].detail.as_deref().unwrap().contains("ruleset"));
    }

    #[test]
    fn min_count_treats_absent_and_non_array_as_zero() {
        let validation = StepValidation {
            required: vec![],
            min_count: BTreeMap::from([("items".to_string(), 1)]),
        };
        let manifest = manifest(vec![
            step("absent", None, Some(validation.clone())),
            step("scalar", None, Some(validation)),
        ]);
        let traces = vec![
            trace_with("ts-parse-absent", Some(json!({}))),
            trace_with("ts-parse-scalar", Some(json!({"items": "not an array"}))),
        ];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.failed, 2);
        for result in &report.steps {
            assert_eq!(result.status, StepStatus::Fail);
            assert!(result.checks[0].detail.as_deref().unwrap().contains("0 item(s)"));
        }
    }

    #[test]
    fn malformed_payload_fails_checks_without_aborting() {
        // A non-object payload resolves but satisfies nothing.
        let manifest = manifest(vec![
            step(
                "bad",
                None,
                Some(StepValidation {
                    required: vec!["x".to_string()],
                    min_count: BTreeMap::new(),
                }),
            ),
            step("good", None, None),
        ]);
        let traces = vec![
            trace_with("ts-parse-bad", Some(json!("just a string"))),
            trace_with("ts-parse-good", Some(json!({"ok": true}))),
        ];

        let report = validate("rules-audit", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.steps[0].status, StepStatus::Fail);
        assert_eq!(report.steps[1].status, StepStatus::Pass);
    }

    #[test]
    fn up_to_step_truncates_inclusively() {
        let manifest = manifest(vec![
            step("a", None, None),
            step("b", None, None),
            step("c", None, None),
        ]);
        let traces = vec![
            trace_with("ts-parse-a", Some(json!({}))),
            trace_with("ts-parse-b", Some(json!({}))),
        ];
        let options = ValidateOptions {
            up_to_step: Some("b".to_string()),
        };

        let report = validate("rules-audit", &manifest, &traces, &options);
        assert_eq!(report.steps_checked, 2);
        assert_eq!(report.steps[1].step_id, "b");
    }

    #[test]
    fn unmatched_up_to_step_checks_everything() {
        let manifest = manifest(vec![step("a", None, None), step("b", None, None)]);
        let options = ValidateOptions {
            up_to_step: Some("no-such-step".to_string()),
        };

        let report = validate("rules-audit", &manifest, &[], &options);
        assert_eq!(report.steps_checked, 2);
        assert_eq!(report.missing, 2);
    }

    #[test]
    fn report_is_idempotent_for_identical_inputs() {
        let manifest = manifest(vec![
            step(
                "run-checks",
                Some("checks"),
                Some(StepValidation {
                    required: vec!["summary".to_string()],
                    min_count: BTreeMap::from([
                        ("findings".to_string(), 1),
                        ("warnings".to_string(), 0),
                    ]),
                }),
            ),
            step("summarize", None, None),
        ]);
        let traces = vec![trace_with(
            "final-output",
            Some(json!({"data": {"checks": {"summary": "ok", "findings": [1], "warnings": []}}})),
        )];
        let options = ValidateOptions::default();

        let first = serde_json::to_string(&validate("m", &manifest, &traces, &options)).unwrap();
        let second = serde_json::to_string(&validate("m", &manifest, &traces, &options)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn counts_sum_to_steps_checked() {
        let manifest = manifest(vec![
            step("a", None, None),
            step(
                "b",
                None,
                Some(StepValidation {
                    required: vec!["x".to_string()],
                    min_count: BTreeMap::new(),
                }),
            ),
            step("c", None, None),
        ]);
        let traces = vec![
            trace_with("ts-parse-a", Some(json!({}))),
            trace_with("ts-parse-b", Some(json!({"y": 1}))),
        ];

        let report = validate("m", &manifest, &traces, &ValidateOptions::default());
        assert_eq!(report.passed + report.failed + report.missing, report.steps_checked);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.missing, 1);
    }
}
