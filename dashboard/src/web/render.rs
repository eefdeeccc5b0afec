use axum::http::HeaderMap;
use handlebars::Handlebars;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::fmt;

use super::{HX_TARGET, Operation, paths::Paths};
use crate::provider::{MigrationResult, MigrationStatus, Source, State};

#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

const NOT_APPLICABLE: &str = "n/a";

/// Element id the status page swaps on refresh.
pub const STATUS_TABLE_TARGET: &str = "status-table";

/// Templates every `Renderer` must have registered.
const REQUIRED: &[&str] = &[
    "layout",
    "status_page",
    "status_table",
    "result",
    "result_page",
    "error",
];

// ---------- layout ----------

/// Whether the client asked for a fragment (htmx swap) or a whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Page,
    Fragment,
}

impl Layout {
    /// Any non-empty `HX-Target` means htmx is swapping a region and only
    /// wants that region's markup back.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(HX_TARGET).and_then(|v| v.to_str().ok()) {
            Some(target) if !target.trim().is_empty() => Layout::Fragment,
            _ => Layout::Page,
        }
    }

    /// The status view only returns its table when htmx is swapping exactly
    /// that table; any other target still gets the whole page.
    pub fn for_status(headers: &HeaderMap) -> Self {
        match headers.get(HX_TARGET).and_then(|v| v.to_str().ok()) {
            Some(target) if target.trim() == STATUS_TABLE_TARGET => Layout::Fragment,
            _ => Layout::Page,
        }
    }
}

// ---------- errors ----------

#[derive(Debug)]
pub enum RenderError {
    MissingTemplate(String),
    Template(handlebars::TemplateError),
    Render(handlebars::RenderError),
    /// A status row needs a source to build its action button.
    MissingSource { row: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingTemplate(name) => write!(f, "Missing template: {name}"),
            RenderError::Template(e) => write!(f, "Template error: {e}"),
            RenderError::Render(e) => write!(f, "Render error: {e}"),
            RenderError::MissingSource { row } => {
                write!(f, "Render error: status row {row} has no migration source")
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl From<handlebars::TemplateError> for RenderError {
    fn from(e: handlebars::TemplateError) -> Self {
        RenderError::Template(e)
    }
}

impl From<handlebars::RenderError> for RenderError {
    fn from(e: handlebars::RenderError) -> Self {
        RenderError::Render(e)
    }
}

// ---------- view models ----------

#[derive(Serialize)]
struct LayoutView<'a> {
    title: &'a str,
    home: String,
    content: String,
}

#[derive(Serialize)]
struct StatusPageView {
    home: String,
    up: String,
    down: String,
    table: String,
}

#[derive(Serialize)]
struct StatusTableView {
    rows: Vec<StatusRow>,
}

#[derive(Serialize)]
struct StatusRow {
    version: String,
    kind: &'static str,
    path: String,
    state: &'static str,
    applied_at: String,
    action: ActionView,
}

#[derive(Serialize)]
struct ActionView {
    label: String,
    path: String,
}

#[derive(Serialize)]
struct ResultView {
    heading: String,
    direction: &'static str,
    results: Vec<ResultRow>,
}

#[derive(Serialize)]
struct ResultRow {
    version: String,
    path: String,
    duration: String,
    failed: bool,
    error: String,
}

#[derive(Serialize)]
struct ResultPageView {
    home: String,
    result: String,
}

#[derive(Serialize)]
struct ErrorView<'a> {
    heading: &'a str,
    message: &'a str,
}

fn version_text(source: Option<&Source>) -> String {
    source
        .map(|s| s.version.to_string())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

fn path_text(source: Option<&Source>) -> String {
    source
        .map(|s| s.path.clone())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

// ---------- renderer ----------

/// Parsed templates plus the URL scheme they link to. Built once at startup
/// and shared read-only between requests.
pub struct Renderer {
    registry: Handlebars<'static>,
    paths: Paths,
    title: String,
}

impl Renderer {
    pub fn new(paths: Paths, title: impl Into<String>) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(|s| html_escape::encode_quoted_attribute(s).into_owned());

        for file in TemplateAssets::iter() {
            let Some(name) = file.strip_suffix(".hbs") else {
                continue;
            };
            let asset = TemplateAssets::get(&file)
                .ok_or_else(|| RenderError::MissingTemplate(file.to_string()))?;
            let source = std::str::from_utf8(&asset.data)
                .map_err(|_| RenderError::MissingTemplate(file.to_string()))?;
            registry.register_template_string(name, source)?;
        }

        if let Some(missing) = REQUIRED.iter().find(|n| !registry.has_template(n)) {
            return Err(RenderError::MissingTemplate(missing.to_string()));
        }

        tracing::debug!(templates = registry.get_templates().len(), "templates loaded");

        Ok(Self {
            registry,
            paths,
            title: title.into(),
        })
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// The migration table, or the whole dashboard around it.
    pub fn status(
        &self,
        layout: Layout,
        statuses: &[MigrationStatus],
    ) -> Result<String, RenderError> {
        let rows = statuses
            .iter()
            .enumerate()
            .map(|(row, status)| self.status_row(row, status))
            .collect::<Result<Vec<_>, _>>()?;

        let table = self
            .registry
            .render("status_table", &StatusTableView { rows })?;

        match layout {
            Layout::Fragment => Ok(table),
            Layout::Page => {
                let page = self.registry.render(
                    "status_page",
                    &StatusPageView {
                        home: self.paths.status(),
                        up: self.paths.up(),
                        down: self.paths.down(),
                        table,
                    },
                )?;
                self.wrap(page)
            }
        }
    }

    /// Text columns tolerate a missing source; the action button does not.
    fn status_row(&self, row: usize, status: &MigrationStatus) -> Result<StatusRow, RenderError> {
        let source = status.source.as_ref();
        let version = version_text(source);
        let path = path_text(source);
        let kind = source.map(|s| s.kind.as_str()).unwrap_or(NOT_APPLICABLE);
        let applied_at = status
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        let source = source.ok_or(RenderError::MissingSource { row })?;
        let action = match status.state {
            State::Pending => ActionView {
                label: format!("Apply to version {}", source.version),
                path: self.paths.up_to(source.version),
            },
            State::Applied => ActionView {
                label: format!("Roll back to version {}", source.version),
                path: self.paths.down_to(source.version),
            },
        };

        Ok(StatusRow {
            version,
            kind,
            path,
            state: status.state.as_str(),
            applied_at,
            action,
        })
    }

    /// Outcome of a state-changing operation.
    pub fn results(
        &self,
        layout: Layout,
        operation: &Operation,
        results: &[MigrationResult],
    ) -> Result<String, RenderError> {
        let heading = if results.is_empty() {
            "Fully Migrated".to_string()
        } else {
            operation.heading()
        };
        let direction = operation
            .direction()
            .map(|d| d.as_str())
            .unwrap_or_default();

        let rows = results
            .iter()
            .map(|r| ResultRow {
                version: version_text(r.source.as_ref()),
                path: path_text(r.source.as_ref()),
                duration: format!("{:?}", r.duration),
                failed: r.error.is_some(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();

        let result = self.registry.render(
            "result",
            &ResultView {
                heading,
                direction,
                results: rows,
            },
        )?;

        match layout {
            Layout::Fragment => Ok(result),
            Layout::Page => {
                let page = self.registry.render(
                    "result_page",
                    &ResultPageView {
                        home: self.paths.status(),
                        result,
                    },
                )?;
                self.wrap(page)
            }
        }
    }

    pub fn error(&self, layout: Layout, heading: &str, message: &str) -> Result<String, RenderError> {
        let body = self
            .registry
            .render("error", &ErrorView { heading, message })?;
        match layout {
            Layout::Fragment => Ok(body),
            Layout::Page => self.wrap(body),
        }
    }

    fn wrap(&self, content: String) -> Result<String, RenderError> {
        Ok(self.registry.render(
            "layout",
            &LayoutView {
                title: &self.title,
                home: self.paths.status(),
                content,
            },
        )?)
    }
}

// ---------- tests ----------
