use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

use crate::download::ScratchDir;
use crate::error::{RunError, RunResult};
use crate::models::PayslipFileName;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid"))
}

/// Resolves every `{name%format}` placeholder in `template` against the dates
/// parsed from a payslip file name.
pub fn resolve_template(template: &str, fields: &PayslipFileName) -> RunResult<String> {
    let mut resolved = template.to_string();

    for captures in placeholder_pattern().captures_iter(template) {
        let placeholder = &captures[0];
        let body = &captures[1];
        let (name, format) = match body.split_once('%') {
            Some((name, spec)) => (name, format!("%{}", spec)),
            None => {
                return Err(RunError::InvalidDateFormat {
                    format: body.to_string(),
                })
            }
        };

        let value = fields.field(name).ok_or_else(|| RunError::UnknownPlaceholder {
            name: name.to_string(),
        })?;

        let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(RunError::InvalidDateFormat { format: format.clone() });
        }

        let mut rendered = String::new();
        write!(rendered, "{}", value.format_with_items(items.into_iter()))
            .map_err(|_| RunError::InvalidDateFormat { format: format.clone() })?;

        resolved = resolved.replace(placeholder, &rendered);
    }

    Ok(resolved)
}

/// Works out where a downloaded file goes.
///
/// With renaming off the template is used verbatim and the file name is not
/// inspected at all.
pub fn destination_for(template: &str, rename: bool, downloaded: &Path) -> RunResult<PathBuf> {
    if !rename {
        return Ok(PathBuf::from(template));
    }

    let file_name = downloaded
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RunError::MalformedFileName {
            name: downloaded.display().to_string(),
            reason: "not valid UTF-8".to_string(),
        })?;

    let fields = PayslipFileName::parse(file_name)?;
    Ok(PathBuf::from(resolve_template(template, &fields)?))
}

/// Copies `origin` to `destination`, creating parent folders as needed.
pub fn copy_payslip_document(origin: &Path, destination: &Path) -> RunResult<()> {
    info!("copy payslip from {} to {}", origin.display(), destination.display());

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RunError::io(parent, e))?;
    }
    std::fs::copy(origin, destination).map_err(|e| RunError::io(destination, e))?;
    Ok(())
}

/// Copies the newest download out of the scratch folder to its final place.
pub struct Materializer<'a> {
    pub template: &'a str,
    pub rename: bool,
}

impl Materializer<'_> {
    pub fn materialize_latest(&self, scratch: &ScratchDir) -> RunResult<PathBuf> {
        let origin = scratch.latest_file()?;
        let destination = destination_for(self.template, self.rename, &origin)?;
        copy_payslip_document(&origin, &destination)?;
        info!("created file: {}", destination.display());
        Ok(destination)
    }
}
