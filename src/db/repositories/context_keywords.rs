use anyhow::Result;

use crate::classifier::catalog::KeywordTable;
use crate::db::{keys, Database};

impl Database {
    /// User-edited keyword weights, if any were ever saved.
    pub async fn get_context_keywords(&self) -> Result<Option<KeywordTable>> {
        self.get_value(keys::CONTEXT_KEYWORDS).await
    }

    pub async fn save_context_keywords(&self, keywords: &KeywordTable) -> Result<()> {
        self.set_value(keys::CONTEXT_KEYWORDS, keywords).await
    }
}
