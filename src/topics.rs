// src/topics.rs
//! Topic taxonomy: the categories we curate for and the keyword lists that
//! drive source queries and filtering.
//!
//! Built-in defaults cover the three tracked areas (RCM/billing tech, GDM,
//! preeclampsia). Operators can override the lists with a TOML file, resolved
//! env var first, then `config/topics.toml`, then the built-ins.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const ENV_PATH: &str = "TOPICS_CONFIG_PATH";

/// Editorial category assigned to every curated item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TopicCategory {
    Billing,
    Gdm,
    Preeclampsia,
    Other,
}

impl TopicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicCategory::Billing => "billing",
            TopicCategory::Gdm => "gdm",
            TopicCategory::Preeclampsia => "preeclampsia",
            TopicCategory::Other => "other",
        }
    }

    /// Strict parse of the wire/storage form. Unknown labels are rejected so
    /// that model output validation can drop malformed responses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "billing" => Some(TopicCategory::Billing),
            "gdm" => Some(TopicCategory::Gdm),
            "preeclampsia" => Some(TopicCategory::Preeclampsia),
            "other" => Some(TopicCategory::Other),
            _ => None,
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked topic: a category plus the keywords used to find it upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub category: TopicCategory,
    pub keywords: Vec<String>,
    pub description: String,
}

/// The full keyword configuration the scrapers share.
#[derive(Debug, Clone, Deserialize)]
pub struct Topics {
    pub topics: Vec<Topic>,
}

impl Topics {
    /// Compiled-in defaults, used when no override file is present.
    pub fn builtin() -> Self {
        fn topic(category: TopicCategory, description: &str, keywords: &[&str]) -> Topic {
            Topic {
                category,
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                description: description.to_string(),
            }
        }

        Topics {
            topics: vec![
                topic(
                    TopicCategory::Billing,
                    "Revenue Cycle Management (RCM) automation, AI coding, and billing technology",
                    &[
                        "medical billing automation",
                        "healthcare RCM",
                        "revenue cycle management",
                        "claims processing AI",
                        "medical coding automation",
                        "healthcare billing software",
                        "insurance claims automation",
                        "medical practice management",
                        "RCM automation",
                        "autonomous coding",
                        "AI coding",
                        "denial management",
                        "payer policy",
                        "predictive revenue analytics",
                        "prior authorization automation",
                        "claims denial",
                        "revenue integrity",
                        "charge capture automation",
                    ],
                ),
                topic(
                    TopicCategory::Gdm,
                    "Gestational Diabetes Mellitus and CGM monitoring",
                    &[
                        "gestational diabetes",
                        "GDM",
                        "CGM pregnancy",
                        "continuous glucose monitoring pregnancy",
                        "diabetes in pregnancy",
                        "glucose monitoring gestational",
                        "prenatal diabetes",
                    ],
                ),
                topic(
                    TopicCategory::Preeclampsia,
                    "Preeclampsia, gestational hypertension, and hyperemesis gravidarum research",
                    &[
                        "preeclampsia",
                        "pre-eclampsia",
                        "gestational hypertension",
                        "pregnancy induced hypertension",
                        "hyperemesis gravidarum",
                        "HG pregnancy",
                        "severe morning sickness",
                        "eclampsia",
                        "HELLP syndrome",
                    ],
                ),
            ],
        }
    }

    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading topics config from {}", path.display()))?;
        let parsed: Topics =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        if parsed.topics.is_empty() {
            return Err(anyhow!("topics config {} defines no topics", path.display()));
        }
        Ok(parsed)
    }

    /// Load using env var + fallbacks:
    /// 1) $TOPICS_CONFIG_PATH
    /// 2) config/topics.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("TOPICS_CONFIG_PATH points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/topics.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        Ok(Self::builtin())
    }

    /// The first `per_topic` keywords of every topic, in topic order. The lead
    /// keywords are the broadest ones, so they are what query-budgeted sources
    /// (NewsAPI, Apify, Reddit's post filter) work with.
    pub fn lead_keywords(&self, per_topic: usize) -> Vec<&str> {
        self.topics
            .iter()
            .flat_map(|t| t.keywords.iter().take(per_topic))
            .map(|s| s.as_str())
            .collect()
    }
}
