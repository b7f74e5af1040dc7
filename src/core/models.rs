//! Models the service can dispatch to.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Available to guests within the free-message quota.
    Standard,
    /// Requires a signed-in account.
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: ModelTier,
}

impl ModelInfo {
    pub fn is_premium(&self) -> bool {
        self.tier == ModelTier::Premium
    }
}

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt",
        name: "GPT-3.5",
        description: "Fast and efficient",
        tier: ModelTier::Standard,
    },
    ModelInfo {
        id: "gpt-4",
        name: "GPT-4",
        description: "Most capable",
        tier: ModelTier::Premium,
    },
    ModelInfo {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        description: "Compact power",
        tier: ModelTier::Standard,
    },
    ModelInfo {
        id: "gpt-4.1-mini",
        name: "GPT-4.1 Mini",
        description: "Latest mini",
        tier: ModelTier::Standard,
    },
    ModelInfo {
        id: "gpt-4.1-nano",
        name: "GPT-4.1 Nano",
        description: "Ultra-fast",
        tier: ModelTier::Standard,
    },
    ModelInfo {
        id: "gpt-4o",
        name: "GPT-4o",
        description: "Optimized",
        tier: ModelTier::Premium,
    },
    ModelInfo {
        id: "claude",
        name: "Claude",
        description: "Anthropic AI",
        tier: ModelTier::Premium,
    },
    ModelInfo {
        id: "deepseek",
        name: "DeepSeek",
        description: "Advanced reasoning",
        tier: ModelTier::Premium,
    },
];

/// Look a model up by id, ignoring ASCII case.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    let id = id.trim();
    MODELS.iter().find(|model| model.id.eq_ignore_ascii_case(id))
}

pub fn is_premium_model(id: &str) -> bool {
    find_model(id).is_some_and(ModelInfo::is_premium)
}
