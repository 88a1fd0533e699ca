//! Recommendation pipeline: shortlist, pricing, report
//!
//! Three sequential completions over the model catalog. No original
//! ranking logic lives here: the external model does the choosing, this
//! module formats the catalog into prompts and parses the answers back
//! out. The final report overwrites the user's one-per-user final-model
//! record.

use crate::error::AppResult;
use crate::llm::CompletionService;
use crate::store::{CatalogEntry, CatalogRepository, FinalModelRecord, SessionRepository};
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

const RECOMMEND_TEMPERATURE: f64 = 0.3;
const RECOMMEND_MAX_TOKENS: u32 = 500;
const PRICING_TEMPERATURE: f64 = 0.2;
const PRICING_MAX_TOKENS: u32 = 400;
const REPORT_TEMPERATURE: f64 = 0.4;
const REPORT_MAX_TOKENS: u32 = 800;

/// Result of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Plain-text report shown to the user (empty when no candidates)
    pub report_text: String,
    /// Recommended model names, best first
    pub shortlist: Vec<String>,
    /// Model the report singled out as the final pick
    pub final_model: Option<String>,
}

impl PipelineReport {
    pub fn is_empty(&self) -> bool {
        self.shortlist.is_empty()
    }
}

/// Recommendation pipeline boundary, injectable for tests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecommendationPipeline: Send + Sync {
    /// Produce a shortlist and report for a requirement
    ///
    /// `is_new` false means the run narrows an exhausted shortlist: the
    /// user's stored final model is withheld from the offered dataset.
    async fn run(&self, requirement: &str, user_id: &str, is_new: bool)
    -> AppResult<PipelineReport>;
}

/// LLM-backed pipeline over the catalog repository
pub struct LlmPipeline {
    completion: Arc<dyn CompletionService>,
    catalog: Arc<dyn CatalogRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl LlmPipeline {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        catalog: Arc<dyn CatalogRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            completion,
            catalog,
            sessions,
        }
    }

    async fn recommend(&self, requirement: &str, dataset: &[CatalogEntry]) -> AppResult<Vec<String>> {
        let prompt = recommend_prompt(requirement, dataset);
        let response = self
            .completion
            .complete(
                "You are a helpful assistant for AI model recommendation.",
                &prompt,
                RECOMMEND_TEMPERATURE,
                RECOMMEND_MAX_TOKENS,
            )
            .await?;
        Ok(parse_shortlist(&response))
    }

    async fn price(&self, shortlist: &[String], dataset: &[CatalogEntry]) -> AppResult<String> {
        let rows: Vec<String> = dataset
            .iter()
            .filter(|e| shortlist.iter().any(|s| s == &e.name || s == &e.key))
            .map(|e| {
                format!(
                    "- {} | Pricing: {} | Cloud: {} | Region: {}",
                    e.name,
                    e.pricing.as_deref().unwrap_or("N/A"),
                    e.cloud.as_deref().unwrap_or("N/A"),
                    e.region.as_deref().unwrap_or("N/A"),
                )
            })
            .collect();
        let prompt = format!(
            "Summarize a pricing comparison for these shortlisted AI models. \
             Use one line per model, plain text, no markdown.\n\n{}",
            rows.join("\n")
        );
        self.completion
            .complete(
                "You are a pricing analyst for AI model selection.",
                &prompt,
                PRICING_TEMPERATURE,
                PRICING_MAX_TOKENS,
            )
            .await
    }

    async fn report(
        &self,
        requirement: &str,
        shortlist: &[String],
        pricing: &str,
    ) -> AppResult<String> {
        let prompt = report_prompt(requirement, shortlist, pricing);
        self.completion
            .complete(
                "You are a smart assistant helping select the best AI model \
                 with a professional, plain-text report. Ensure speed is filled, \
                 accuracy is shown as %, and output is beautifully aligned.",
                &prompt,
                REPORT_TEMPERATURE,
                REPORT_MAX_TOKENS,
            )
            .await
    }
}

#[async_trait]
impl RecommendationPipeline for LlmPipeline {
    async fn run(
        &self,
        requirement: &str,
        user_id: &str,
        is_new: bool,
    ) -> AppResult<PipelineReport> {
        let mut dataset = self.catalog.all_models().await?;

        // On a re-query the already-rejected final pick is withheld so the
        // model cannot be recommended straight back
        if !is_new {
            if let Some(record) = self.sessions.get_final_model(user_id).await? {
                let excluded = record.model_name.trim().to_lowercase();
                dataset.retain(|e| e.name.trim().to_lowercase() != excluded);
                tracing::info!(model = %record.model_name, "excluded prior final model from dataset");
            }
        }

        if dataset.is_empty() {
            tracing::warn!("no catalog entries available for recommendation");
            return Ok(PipelineReport::default());
        }

        let shortlist = self.recommend(requirement, &dataset).await?;
        if shortlist.is_empty() {
            return Ok(PipelineReport::default());
        }

        let pricing = self.price(&shortlist, &dataset).await?;
        let report_text = self.report(requirement, &shortlist, &pricing).await?;
        let final_model = extract_final_model(&report_text);

        if let Some(model) = &final_model {
            let record = FinalModelRecord {
                user_id: user_id.to_string(),
                requirement: requirement.to_string(),
                model_name: model.clone(),
            };
            // A failed upsert must not cost the user their report
            if let Err(e) = self.sessions.set_final_model(&record).await {
                tracing::error!(error = %e, "failed to persist final model record");
            }
        }

        Ok(PipelineReport {
            report_text,
            shortlist,
            final_model,
        })
    }
}

fn recommend_prompt(requirement: &str, dataset: &[CatalogEntry]) -> String {
    let mut formatted = String::new();
    for entry in dataset {
        formatted.push_str(&format!(
            "- {} | Accuracy: {} | Speed: {} | Cloud: {} | Type: {}\n",
            entry.name,
            entry.accuracy.as_deref().unwrap_or("N/A"),
            entry.speed.as_deref().unwrap_or("N/A"),
            entry.cloud.as_deref().unwrap_or("N/A"),
            entry.model_type.as_deref().unwrap_or("N/A"),
        ));
    }

    format!(
        "You are an AI expert. From the following AI model shortlist, choose the top 4-5 models suitable for the user's requirement below.

User's Requirement:
{requirement}

Available AI Models:
{formatted}

Instructions:
- Only use the above list for selection.
- If the requirement involves multiple tasks, prefer multi-capability models.
- For each selected model, reply with:
- Model Name
- A short reason (max 1 line)

Reply only with a bullet list in this format:
- <Model Name>: <short reason>"
    )
}

fn report_prompt(requirement: &str, shortlist: &[String], pricing: &str) -> String {
    format!(
        "You are an expert AI model selector.\n\n\
         1. Analyzed user requirement:\n{requirement}\n\n\
         2. Recommended models:\n{models}\n\n\
         3. Pricing details of shortlisted models:\n{pricing}\n\n\
         Your task is to select the best model using logic.\n\n\
         Output Format (strictly follow this format):\n\n\
         Final Best Model Recommended:\n\
         1. Model Name      : <model_name>\n\
         2. Price           : <price with unit>\n\
         3. Speed           : <speed - always write something, even if approximate or inferred>\n\
         4. Accuracy        : <convert to percentage if decimal (e.g., 0.987 -> 98.7 %)>\n\
         5. Cloud           : <cloud provider>\n\
         6. Region          : <region or deployment area>\n\
         7. Reason for Selection : <Short one-liner reason showing why this model fits best>\n\n\
         Rules:\n\
         - NEVER write \"Not specified\" for Speed or Accuracy.\n\
         - If Speed or Accuracy is missing, use best assumption based on other fields.\n\
         - Format should be consistent: no markdown, no bullets, no emojis.\n\
         - Maintain equal spacing after colons for clean readability.\n\
         - The reason must be short and clearly reflect accuracy/speed/user goal.",
        models = shortlist.join("\n"),
    )
}

/// Parse `- <Model Name>: <reason>` bullets into an ordered shortlist
fn parse_shortlist(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| {
            let item = line.trim().strip_prefix('-').or_else(|| line.trim().strip_prefix('•'))?;
            let name = item.split(':').next()?.trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Pull the final pick out of a `Model Name : <..>` report line
fn extract_final_model(report: &str) -> Option<String> {
    report.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        if label.to_lowercase().contains("model name") {
            let name = value.trim();
            (!name.is_empty()).then(|| name.to_string())
        } else {
            None
        }
    })
}
