use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::Path;

use super::input::FileInput;

/// Which files of the input directory become tasks
#[derive(Debug, Clone, Default)]
pub struct InputFilter {
    /// File name globs to keep (empty = every file)
    pub include: Vec<String>,
    /// File name globs to drop, applied after `include`
    pub exclude: Vec<String>,
}

/// Create a GlobSet from a list of patterns for batch matching
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid glob pattern '{pattern}'"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories and hidden files are skipped, symlinks are not followed.
pub fn list_inputs(dir: &Path, filter: &InputFilter) -> Result<Vec<FileInput>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }

    let include = build_globset(&filter.include)?;
    let exclude = build_globset(&filter.exclude)?;

    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut inputs = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Walk error: {}", e);
                continue;
            }
        };

        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let name = entry.file_name();
        if !filter.include.is_empty() && !include.is_match(name) {
            continue;
        }
        if exclude.is_match(name) {
            tracing::debug!(file = %entry.path().display(), "Excluded by pattern");
            continue;
        }

        inputs.push(FileInput::new(entry.path()));
    }

    Ok(inputs)
}
