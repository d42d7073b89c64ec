/*
 * stage/stages/fix_links.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resolve relative resource links in compiled HTML.
 */

use std::sync::Arc;

use async_trait::async_trait;

use crate::links::{ResourceResolver, fix_links};
use crate::stage::{PipelineData, PipelineDataKind, PipelineError, PipelineStage, StageContext};

pub struct FixLinksStage {
    resolver: Arc<dyn ResourceResolver>,
}

impl FixLinksStage {
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl PipelineStage for FixLinksStage {
    fn name(&self) -> &str {
        "fix-links"
    }

    fn input_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Compiled
    }

    fn output_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Linked
    }

    async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError> {
        let PipelineData::Compiled(html) = input else {
            return Err(PipelineError::unexpected_input(
                self.name(),
                self.input_kind(),
                input.kind(),
            ));
        };

        Ok(PipelineData::Linked(fix_links(
            &html,
            &ctx.source_path,
            self.resolver.as_ref(),
        )))
    }
}
