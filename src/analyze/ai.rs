// src/analyze/ai.rs
//! Model client for relevance scoring: provider trait, the OpenAI
//! implementation, and strict validation of the structured response.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::scrape::truncate_chars;
use crate::scrape::types::RawItem;
use crate::topics::TopicCategory;

/// Content prefix sent to the model, to bound token cost per item.
pub const CONTENT_PROMPT_CAP: usize = 1000;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = r#"You are an expert Maternal-Fetal Medicine (MFM) research assistant analyzing medical news for a practicing MFM specialist who is also a healthcare technology developer.

Your task is to evaluate content relevance across three key areas:

1. **Revenue Cycle Management (RCM) & Billing Automation** - Focus on AUTOMATION and TECHNOLOGY:
   - AI-powered autonomous coding and claims processing
   - Denial management and predictive revenue analytics
   - Prior authorization automation
   - Payer policy changes affecting reimbursement
   - Healthcare IT solutions for revenue integrity
   - NOTE: Generic billing job postings or manual billing processes score LOW (0-3)
   - High scores (7+) require focus on automation, AI, or breakthrough technology

2. **Gestational Diabetes (GDM)** - CGM monitoring in pregnancy, glucose management, FDA approvals, reimbursement for CGM in pregnancy

3. **High-Risk Pregnancy Research**:
   - Preeclampsia: New biomarkers, prevention (aspirin/statins), long-term CV risks
   - Hyperemesis Gravidarum (HG): New treatments, genetic research
   - Gestational Hypertension: Chronic HTN management in pregnancy

For each piece of content:
- Rate relevance from 0-10 (0=irrelevant, 10=critical/groundbreaking)
- Categorize as: "billing", "gdm", "preeclampsia", or "other"
- Provide a 2-sentence summary focused on clinical or business impact for an MFM specialist

Scoring guidelines:
- 9-10: Breakthrough research, major policy changes, game-changing technology
- 7-8: Significant new findings, important updates, highly relevant to MFM practice OR tech development
- 4-6: Moderately relevant, worth knowing about
- 0-3: Tangentially related, not relevant, or generic content without innovation

Respond ONLY with valid JSON in this exact format:
{
  "score": number,
  "category": "billing" | "gdm" | "preeclampsia" | "other",
  "summary": "Two sentences maximum."
}"#;

/// A validated, clamped scoring result for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub score: i32,
    pub category: TopicCategory,
    pub summary: String,
}

#[async_trait]
pub trait AiAnalyzer: Send + Sync {
    /// Score one item. Errors are per-item: the caller logs and drops the
    /// item without retrying.
    async fn analyze(&self, item: &RawItem) -> Result<Analysis>;
    fn name(&self) -> &'static str;
}

/// Round to nearest integer, then clamp into the rubric range.
pub fn clamp_score(raw: f64) -> i32 {
    raw.round().clamp(0.0, 10.0) as i32
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    // Some model snapshots echo the field name used in our data model
    // instead of the prompt's.
    #[serde(alias = "relevanceScore")]
    score: Option<f64>,
    category: Option<String>,
    summary: Option<String>,
}

/// Validate a raw model response. Any missing field, non-numeric score,
/// unknown category, or blank summary rejects the whole response.
pub fn parse_analysis(json: &str) -> Result<Analysis> {
    let raw: RawAnalysis = serde_json::from_str(json).context("model response is not valid JSON")?;

    let Some(score) = raw.score else {
        bail!("model response score missing or not numeric");
    };
    let category = raw
        .category
        .as_deref()
        .and_then(TopicCategory::parse)
        .context("model response category missing or unknown")?;
    let summary = raw
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .context("model response summary missing or empty")?;

    Ok(Analysis {
        score: clamp_score(score),
        category,
        summary,
    })
}

/// OpenAI Chat Completions scorer. Requires `OPENAI_API_KEY`; without it every
/// call reports a configuration error (and the batch layer drops the items).
pub struct OpenAiAnalyzer {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiAnalyzer {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to gpt-4o-mini.
    pub fn new(api_key: Option<String>, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(crate::scrape::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    fn user_prompt(item: &RawItem) -> String {
        format!(
            "Title: {}\n\nContent: {}",
            item.title,
            truncate_chars(&item.content, CONTENT_PROMPT_CAP)
        )
    }
}

#[async_trait]
impl AiAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, item: &RawItem) -> Result<Analysis> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("OPENAI_API_KEY is not configured");
        };

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let user = Self::user_prompt(item);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            // Lower temperature for consistent scoring.
            temperature: 0.3,
            max_tokens: 200,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .http
            .post(OPENAI_URL)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .context("openai http post")?;
        if !resp.status().is_success() {
            bail!("OpenAI error: {}", resp.status());
        }

        let body: Resp = resp.json().await.context("openai body decode")?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .context("empty model response")?;

        parse_analysis(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
