use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The workflow kinds this deployment knows how to run.
///
/// Adding a workflow means adding a variant plus a registry entry below,
/// not a database migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    SeoPlanner,
    ImageGen,
    Distribution,
    BlogAutopublish,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::SeoPlanner,
        JobType::ImageGen,
        JobType::Distribution,
        JobType::BlogAutopublish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::SeoPlanner => "seo_planner",
            JobType::ImageGen => "image_gen",
            JobType::Distribution => "distribution",
            JobType::BlogAutopublish => "blog_autopublish",
        }
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seo_planner" => Ok(JobType::SeoPlanner),
            "image_gen" => Ok(JobType::ImageGen),
            "distribution" => Ok(JobType::Distribution),
            "blog_autopublish" => Ok(JobType::BlogAutopublish),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------
// Payload schemas
// ----------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeoPlannerPayload {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_keywords: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageGenPayload {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DistributionPayload {
    pub post_id: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlogAutopublishPayload {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,
}

/// Deserialize into the typed schema, then re-serialize. The round trip
/// both validates the raw payload and normalizes it (known fields only,
/// absent options dropped), so hashing the output is field-order stable.
fn validate_as<T: DeserializeOwned + Serialize>(raw: &Value) -> Result<Value, String> {
    let typed: T = serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
    serde_json::to_value(typed).map_err(|e| e.to_string())
}

// ----------------------------
// Registry
// ----------------------------

type Validator = fn(&Value) -> Result<Value, String>;

#[derive(Clone, Copy)]
pub struct WorkflowSpec {
    pub steps: &'static [&'static str],
    pub validate: Validator,
}

/// Static map of job type to ordered step list and payload schema.
///
/// Built once at process start and shared read-only; the runner, queue,
/// and dispatcher all borrow the same instance.
#[derive(Clone)]
pub struct WorkflowRegistry {
    workflows: HashMap<JobType, WorkflowSpec>,
}

impl WorkflowRegistry {
    /// A registry with no workflows; every lookup fails loudly. Useful
    /// for exercising configuration-error paths.
    pub fn empty() -> Self {
        Self {
            workflows: HashMap::new(),
        }
    }

    /// The production workflow set.
    pub fn standard() -> Self {
        let mut workflows = HashMap::new();
        workflows.insert(
            JobType::SeoPlanner,
            WorkflowSpec {
                steps: &["collect", "analyze", "recommend"],
                validate: validate_as::<SeoPlannerPayload>,
            },
        );
        workflows.insert(
            JobType::ImageGen,
            WorkflowSpec {
                steps: &["extract", "prompt", "generate", "store"],
                validate: validate_as::<ImageGenPayload>,
            },
        );
        workflows.insert(
            JobType::Distribution,
            WorkflowSpec {
                steps: &["prepare", "publish", "confirm"],
                validate: validate_as::<DistributionPayload>,
            },
        );
        workflows.insert(
            JobType::BlogAutopublish,
            WorkflowSpec {
                steps: &["validate", "publish"],
                validate: validate_as::<BlogAutopublishPayload>,
            },
        );
        Self { workflows }
    }

    /// Ordered step list for a type. `None` (or an empty list) is a
    /// configuration error that enqueue turns into a loud rejection.
    pub fn steps_for(&self, job_type: JobType) -> Option<&'static [&'static str]> {
        self.workflows
            .get(&job_type)
            .map(|w| w.steps)
            .filter(|s| !s.is_empty())
    }

    pub fn first_step(&self, job_type: JobType) -> Option<&'static str> {
        self.steps_for(job_type).map(|steps| steps[0])
    }

    /// The step after `current` in the type's list; `None` when `current`
    /// is the last step (the job is done) or not a member at all.
    pub fn next_step(&self, job_type: JobType, current: &str) -> Option<&'static str> {
        let steps = self.steps_for(job_type)?;
        let idx = steps.iter().position(|s| *s == current)?;
        steps.get(idx + 1).copied()
    }

    pub fn contains_step(&self, job_type: JobType, step: &str) -> bool {
        self.steps_for(job_type)
            .map(|steps| steps.contains(&step))
            .unwrap_or(false)
    }

    /// Validate and normalize a raw payload against the type's schema.
    pub fn validate_payload(&self, job_type: JobType, raw: &Value) -> Result<Value, String> {
        let spec = self
            .workflows
            .get(&job_type)
            .ok_or_else(|| format!("no workflow registered for {job_type}"))?;
        (spec.validate)(raw)
    }
}
