use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;

use jobflow::jobs::{boxed, Job, StepRegistry, StepResult};
use jobflow::workflow::{
    BlogAutopublishPayload, DistributionPayload, ImageGenPayload, JobType, SeoPlannerPayload,
};

fn parse_payload<T: DeserializeOwned>(job: &Job) -> Result<T, StepResult> {
    serde_json::from_value(job.payload.clone())
        .map_err(|e| StepResult::fail(format!("bad payload: {e}")))
}

/// Demo handlers for every registered workflow step.
///
/// These are stand-ins for the real integrations (SEO analysis, the image
/// generation API, the social distribution clients, the publish call).
/// Replace them handler by handler; the engine only cares about the
/// StepResult contract, and handlers must stay idempotent because an
/// abandoned timeout can leave one running past a recorded failure.
pub fn build_step_registry() -> StepRegistry {
    let mut reg = StepRegistry::new();

    // seo_planner: collect -> analyze -> recommend
    reg.register(JobType::SeoPlanner, "collect", |job| {
        boxed(async move {
            let payload: SeoPlannerPayload = match parse_payload(job) {
                Ok(p) => p,
                Err(fail) => return fail,
            };
            StepResult::ok(json!({
                "postId": payload.post_id,
                "keywords": payload.focus_keywords.unwrap_or_default(),
            }))
        })
    });
    reg.register(JobType::SeoPlanner, "analyze", |job| {
        boxed(async move {
            let collected = &job.result["collect"];
            StepResult::ok(json!({
                "score": 72,
                "keywordCount": collected["keywords"].as_array().map(|a| a.len()).unwrap_or(0),
            }))
        })
    });
    reg.register(JobType::SeoPlanner, "recommend", |_job| {
        boxed(async move {
            StepResult::ok(json!({
                "recommendations": ["shorten title", "add internal links"],
            }))
        })
    });

    // image_gen: extract -> prompt -> generate -> store
    reg.register(JobType::ImageGen, "extract", |job| {
        boxed(async move {
            let payload: ImageGenPayload = match parse_payload(job) {
                Ok(p) => p,
                Err(fail) => return fail,
            };
            StepResult::ok(json!({"postId": payload.post_id, "style": payload.style}))
        })
    });
    reg.register(JobType::ImageGen, "prompt", |job| {
        boxed(async move {
            let extracted = &job.result["extract"];
            StepResult::ok(json!({
                "prompt": format!("cover image for post {}", extracted["postId"]),
            }))
        })
    });
    reg.register(JobType::ImageGen, "generate", |job| {
        boxed(async move {
            let id = job.id;
            StepResult::ok(json!({"imageUrl": format!("https://media.local/{id}.png")}))
        })
    });
    reg.register(JobType::ImageGen, "store", |job| {
        boxed(async move {
            let generated = &job.result["generate"];
            StepResult::ok(json!({"mediaId": job.id, "source": generated["imageUrl"]}))
        })
    });

    // distribution: prepare -> publish -> confirm
    reg.register(JobType::Distribution, "prepare", |job| {
        boxed(async move {
            let payload: DistributionPayload = match parse_payload(job) {
                Ok(p) => p,
                Err(fail) => return fail,
            };
            if payload.channels.is_empty() {
                // Nothing to deliver; skip straight to confirmation.
                return StepResult::ok_with_next(json!({"channels": []}), "confirm");
            }
            StepResult::ok(json!({"channels": payload.channels}))
        })
    });
    reg.register(JobType::Distribution, "publish", |job| {
        boxed(async move {
            let prepared = &job.result["prepare"];
            StepResult::ok(json!({"delivered": prepared["channels"]}))
        })
    });
    reg.register(JobType::Distribution, "confirm", |_job| {
        boxed(async move { StepResult::ok(json!({"confirmedAt": Utc::now()})) })
    });

    // blog_autopublish: validate -> publish
    reg.register(JobType::BlogAutopublish, "validate", |job| {
        boxed(async move {
            let payload: BlogAutopublishPayload = match parse_payload(job) {
                Ok(p) => p,
                Err(fail) => return fail,
            };
            if let Some(publish_at) = payload.publish_at {
                if publish_at > Utc::now() {
                    return StepResult::fail(format!("not due until {publish_at}"));
                }
            }
            StepResult::ok(json!({"postId": payload.post_id}))
        })
    });
    reg.register(JobType::BlogAutopublish, "publish", |_job| {
        boxed(async move { StepResult::ok(json!({"publishedAt": Utc::now()})) })
    });

    reg
}
