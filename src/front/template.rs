use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::{handlebars_helper, RenderError};
use serde::Serialize;

/// Handlebars registry holding every `*.hbs` file of the templates directory,
/// each registered under its file stem (`bills.hbs` is `bills`).
#[derive(Clone)]
pub struct Template {
    r: Arc<handlebars::Handlebars<'static>>,
}

impl Template {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut handlebars = handlebars::Handlebars::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("cannot read templates in {}", dir.display()))?;

        for entity in entries {
            let path = entity?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            handlebars
                .register_template_file(name, &path)
                .with_context(|| format!("invalid template {}", path.display()))?;
        }

        handlebars_helper!(nor_amt: |i: Json| i
            .as_f64()
            .map_or_else(|| "NaN".to_string(), |v| format!("{v:.02}")));

        handlebars.register_helper("nor_amt", Box::new(nor_amt));
        Ok(Self {
            r: Arc::new(handlebars),
        })
    }

    pub fn render<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize,
    {
        log::debug!("render '{name}'");
        self.r.render(name, data)
    }

    /// Renders a whole page, answering 500 when the template fails.
    pub fn page<T>(&self, status: StatusCode, name: &str, data: &T) -> Response
    where
        T: Serialize,
    {
        match self.render(name, data) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                log::error!("cannot render '{name}': {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template. Error: {err}"),
                )
                    .into_response()
            }
        }
    }
}
