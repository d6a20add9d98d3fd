//! SQL template lookup and rendering.
//!
//! Templates are looked up per dialect first and fall back to the shared
//! `_default` set. Rendering uses Jinja syntax so templates can loop over the
//! primary-key and column lists.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};

pub const DEFAULT_TEMPLATE_DIR: &str = "_default";

const EMBEDDED: &[(&str, &str, &str)] = &[
    (
        DEFAULT_TEMPLATE_DIR,
        "get-columns.sql",
        include_str!("../../templates/_default/get-columns.sql"),
    ),
    (
        DEFAULT_TEMPLATE_DIR,
        "get-row-count.sql",
        include_str!("../../templates/_default/get-row-count.sql"),
    ),
    (
        DEFAULT_TEMPLATE_DIR,
        "create-temp-table.sql",
        include_str!("../../templates/_default/create-temp-table.sql"),
    ),
    (
        DEFAULT_TEMPLATE_DIR,
        "compare-summary.sql",
        include_str!("../../templates/_default/compare-summary.sql"),
    ),
    (
        DEFAULT_TEMPLATE_DIR,
        "compare-detail.sql",
        include_str!("../../templates/_default/compare-detail.sql"),
    ),
    (
        "sqlserver",
        "get-columns.sql",
        include_str!("../../templates/sqlserver/get-columns.sql"),
    ),
    (
        "sqlserver",
        "get-row-count.sql",
        include_str!("../../templates/sqlserver/get-row-count.sql"),
    ),
    (
        "sqlserver",
        "create-temp-table.sql",
        include_str!("../../templates/sqlserver/create-temp-table.sql"),
    ),
    (
        "sqlserver",
        "compare-summary.sql",
        include_str!("../../templates/sqlserver/compare-summary.sql"),
    ),
    (
        "sqlserver",
        "compare-detail.sql",
        include_str!("../../templates/sqlserver/compare-detail.sql"),
    ),
    (
        "bigquery",
        "get-columns.sql",
        include_str!("../../templates/bigquery/get-columns.sql"),
    ),
    (
        "bigquery",
        "get-row-count.sql",
        include_str!("../../templates/bigquery/get-row-count.sql"),
    ),
    (
        "bigquery",
        "create-temp-table.sql",
        include_str!("../../templates/bigquery/create-temp-table.sql"),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Embedded,
    File(PathBuf),
}

/// A template body together with where it was found.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub name: String,
    /// Directory the template was resolved from: the dialect or `_default`.
    pub dialect_dir: String,
    pub origin: TemplateOrigin,
    pub body: Cow<'static, str>,
}

impl TemplateSource {
    pub fn is_fallback(&self) -> bool {
        self.dialect_dir == DEFAULT_TEMPLATE_DIR
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            TemplateOrigin::Embedded => write!(f, "{}/{} (bundled)", self.dialect_dir, self.name),
            TemplateOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Where templates are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateStore {
    /// Template sets compiled into the binary.
    #[default]
    Embedded,
    /// `<root>/<dialect>/<name>` with `<root>/_default/<name>` as fallback.
    Directory(PathBuf),
}

impl TemplateStore {
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map(TemplateStore::Directory).unwrap_or_default()
    }

    pub fn resolve(&self, dialect: &str, name: &str) -> Result<TemplateSource> {
        for dir in [dialect, DEFAULT_TEMPLATE_DIR] {
            if let Some(source) = self.lookup(dir, name)? {
                tracing::debug!(template = %source, "resolved template");
                return Ok(source);
            }
        }

        Err(AppError::new(
            ErrorKind::Template,
            format!(
                "Template '{}' not found for dialect '{}' or in {}",
                name, dialect, DEFAULT_TEMPLATE_DIR
            ),
        )
        .into())
    }

    fn lookup(&self, dir: &str, name: &str) -> Result<Option<TemplateSource>> {
        match self {
            TemplateStore::Embedded => Ok(EMBEDDED
                .iter()
                .find(|(d, n, _)| *d == dir && *n == name)
                .map(|(_, _, body)| TemplateSource {
                    name: name.to_string(),
                    dialect_dir: dir.to_string(),
                    origin: TemplateOrigin::Embedded,
                    body: Cow::Borrowed(*body),
                })),
            TemplateStore::Directory(root) => {
                let path = root.join(dir).join(name);
                match fs::read_to_string(&path) {
                    Ok(body) => Ok(Some(TemplateSource {
                        name: name.to_string(),
                        dialect_dir: dir.to_string(),
                        origin: TemplateOrigin::File(path),
                        body: Cow::Owned(body),
                    })),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(AppError::new(
                        ErrorKind::Template,
                        format!("Failed to read template {}: {}", path.display(), err),
                    )
                    .into()),
                }
            }
        }
    }
}

/// Substitute `params` into the template body.
///
/// Variables missing from `params` fail the render instead of producing
/// empty text.
pub fn render_template<P: Serialize>(source: &TemplateSource, params: &P) -> Result<String> {
    environment().render_str(&source.body, params).map_err(|err| {
        AppError::new(
            ErrorKind::Template,
            format!("Failed to render template {}: {}", source, err),
        )
        .into()
    })
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("literal", literal);
    env
}

/// Single-quoted SQL string literal.
fn literal(value: String) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
