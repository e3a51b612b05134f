//! Audit manifests and validation reports.
//!
//! A [`WorkflowManifest`] is an externally authored, ordered list of expected
//! steps with per-step validation rules, used to audit the traces collected
//! for one execution after the fact. Manifests are immutable once loaded.
//! [`ValidationReport`] and its step results are derived on demand and never
//! persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Declarative audit contract for one workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowManifest {
    /// Manifest schema/content version string.
    pub version: String,
    /// Expected steps in declared order.
    #[serde(default)]
    pub steps: Vec<ManifestStep>,
}

/// One expected step in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStep {
    /// Step id, matched against per-step probe traces.
    pub id: String,
    /// Human-readable step name.
    pub name: String,
    /// Key under the final output's `data` object holding this step's
    /// result (enables the final-output fallback resolver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    /// Validation rules. A step without rules passes unconditionally once
    /// its payload is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<StepValidation>,
}

/// Validation rules for one manifest step.
///
/// `min_count` uses a `BTreeMap` so check ordering -- and therefore the
/// serialized report -- is deterministic for identical inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepValidation {
    /// Keys that must be present and non-null in the resolved payload.
    #[serde(default)]
    pub required: Vec<String>,
    /// Keys that must hold arrays of at least the given length.
    #[serde(default)]
    pub min_count: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Validation report (derived, never persisted)
// ---------------------------------------------------------------------------

/// Outcome of validating one manifest step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// All checks passed.
    Pass,
    /// A payload was resolved but at least one check failed.
    Fail,
    /// No trace yielded a payload for this step; checks were not run.
    Missing,
}

/// One individual check applied to a step's resolved payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCheck {
    /// Check name, e.g. `required:findings`, `min_count:items`,
    /// `trace_exists`, `no_rules`.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable detail for failed or informational checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-step validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Manifest step id.
    pub step_id: String,
    /// Manifest step name.
    pub step_name: String,
    /// Aggregate step status.
    pub status: StepStatus,
    /// Individual checks, in deterministic order.
    pub checks: Vec<StepCheck>,
}

/// Full validation report for one manifest against one execution's traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The manifest that was validated against.
    pub manifest_id: String,
    /// The manifest's version string.
    pub manifest_version: String,
    /// Number of steps checked (after `up_to_step` truncation).
    pub steps_checked: usize,
    /// Count of steps with status `pass`.
    pub passed: usize,
    /// Count of steps with status `fail`.
    pub failed: usize,
    /// Count of steps with status `missing`.
    pub missing: usize,
    /// Per-step results in manifest order.
    pub steps: Vec<StepResult>,
}
