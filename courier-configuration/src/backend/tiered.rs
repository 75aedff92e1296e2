use std::sync::Arc;

use courier_backend::{RawCache, Tiered};
use serde::{Deserialize, Serialize};

use super::Backend;
use crate::error::ConfigError;

/// Configuration for layering two backends.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TieredConfig {
    /// First layer, read first and refilled on an L2 hit (typically memory).
    pub l1: Box<Backend>,
    /// Second layer (typically durable).
    pub l2: Box<Backend>,
}

impl TieredConfig {
    pub async fn into_cache(self) -> Result<RawCache, ConfigError> {
        let l1 = Box::pin(self.l1.into_cache()).await?;
        let l2 = Box::pin(self.l2.into_cache()).await?;
        Ok(Arc::new(Tiered::new(l1, l2)))
    }
}
