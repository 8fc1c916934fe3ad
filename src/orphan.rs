//! Reconcile content files against sidecars.

use std::collections::BTreeSet;

use crate::engine::tools::regular_file_names;
use crate::error::Result;
use crate::project::ProjectLayout;
use crate::utils::config::ProjectFiles;

/// Content without a sidecar, and sidecars without content. Names are content filenames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Orphans {
    pub files_only: Vec<String>,
    pub metadata_only: Vec<String>,
}

impl Orphans {
    pub fn is_empty(&self) -> bool {
        self.files_only.is_empty() && self.metadata_only.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files_only.len() + self.metadata_only.len()
    }
}

pub fn find_orphans(layout: &ProjectLayout) -> Result<Orphans> {
    let files: BTreeSet<String> = regular_file_names(&layout.files_dir())?
        .into_iter()
        .collect();
    let metas: BTreeSet<String> = regular_file_names(&layout.metadata_dir())?
        .into_iter()
        .map(|name| match name.strip_suffix(ProjectFiles::SIDECAR_EXT) {
            Some(trimmed) => trimmed.to_string(),
            None => name,
        })
        .collect();

    Ok(Orphans {
        files_only: files.difference(&metas).cloned().collect(),
        metadata_only: metas.difference(&files).cloned().collect(),
    })
}
