use std::{fmt::Debug, sync::Arc};

use chart_client::{locate, ChartClient, ExtractLimits, ExtractedTree};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    engine::{RenderEngine, RenderSettings},
    error::TemplateError,
    request::TemplateRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendered {
    pub templates: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub values: String,
    pub values_exist: bool,
}

/// Download, unpack, locate and render, one request at a time.
///
/// Holds no per-request state; every call owns its two scratch workspaces and
/// closes them before returning.
pub struct Pipeline {
    client: ChartClient,
    engine: Arc<dyn RenderEngine>,
    settings: RenderSettings,
    limits: ExtractLimits,
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("client", &self.client)
            .field("engine", &self.engine)
            .field("settings", &self.settings)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        client: ChartClient,
        engine: Arc<dyn RenderEngine>,
        settings: RenderSettings,
        limits: ExtractLimits,
    ) -> Self {
        Pipeline {
            client,
            engine,
            settings,
            limits,
        }
    }

    #[instrument(skip_all, fields(chart_url = %request.chart_url))]
    pub async fn run(&self, request: &TemplateRequest) -> Result<Rendered, TemplateError> {
        let archive = self
            .client
            .download(&request.chart_url)
            .await
            .map_err(TemplateError::Download)?;
        let extracted = chart_client::extract_async(
            archive.path().to_path_buf(),
            self.client.scratch_root().map(ToOwned::to_owned),
            self.limits,
        )
        .await;
        archive.close();

        let extracted = extracted.map_err(TemplateError::Extract)?;
        let rendered = self.render_tree(&extracted, request).await;
        extracted.close();
        rendered
    }

    async fn render_tree(
        &self,
        extracted: &ExtractedTree,
        request: &TemplateRequest,
    ) -> Result<Rendered, TemplateError> {
        let tree = locate(extracted.root()).map_err(TemplateError::Locate)?;

        let chart = self
            .engine
            .load_chart(&tree.root)
            .await
            .map_err(TemplateError::Load)?;
        let templates = self
            .engine
            .render(&chart, &self.settings, &request.values)
            .await
            .map_err(TemplateError::Render)?;
        info!(bytes = templates.len(), "Rendered chart");

        Ok(Rendered {
            templates,
            values: tree.values,
            values_exist: tree.values_exist,
        })
    }
}
