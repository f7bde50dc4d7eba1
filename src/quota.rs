use crate::store::types::PlanTier;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_docs: usize,
    pub max_doc_bytes: u64,
}

pub fn limits_for(plan: PlanTier) -> PlanLimits {
    match plan {
        PlanTier::Free => PlanLimits {
            max_docs: 1,
            max_doc_bytes: 5 * 1024 * 1024,
        },
        PlanTier::Pro => PlanLimits {
            max_docs: 25,
            max_doc_bytes: 20 * 1024 * 1024,
        },
        PlanTier::Campus => PlanLimits {
            max_docs: 200,
            max_doc_bytes: 50 * 1024 * 1024,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuotaDenial {
    #[error(
        "Your plan stores up to {limit} document(s). Upgrade your plan to add more."
    )]
    CountExceeded { limit: usize },
    #[error(
        "That file is {size} bytes; your plan allows up to {limit}. Pick a smaller file or upgrade."
    )]
    SizeExceeded { size: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCheck {
    Allow,
    Deny(QuotaDenial),
}

/// Pure plan gate, consulted before any document write. Count is checked
/// before size, so exactly one denial reason is ever reported.
pub fn check_document_upload(plan: PlanTier, current_count: usize, file_size: u64) -> UploadCheck {
    let limits = limits_for(plan);
    if current_count >= limits.max_docs {
        return UploadCheck::Deny(QuotaDenial::CountExceeded {
            limit: limits.max_docs,
        });
    }
    if file_size > limits.max_doc_bytes {
        return UploadCheck::Deny(QuotaDenial::SizeExceeded {
            size: file_size,
            limit: limits.max_doc_bytes,
        });
    }
    UploadCheck::Allow
}
