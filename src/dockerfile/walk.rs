use crate::dockerfile::InstructionTree;
use crate::error::Result;
use crate::utils::path_filter::PathFilter;
use std::path::Path;
use walkdir::WalkDir;

/// Parses every `Dockerfile*` below `root` and hands it to `visit`.
///
/// Ignored paths are pruned before descending. Parse and visit errors are
/// qualified with the file path and stop the walk.
pub fn walk_dockerfiles<F>(root: &Path, filter: &PathFilter, mut visit: F) -> Result<()>
where
    F: FnMut(&Path, &InstructionTree) -> Result<()>,
{
    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            relative.as_os_str().is_empty() || !filter.is_ignored(relative)
        });

    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_dockerfile(entry.path()) {
            continue;
        }

        let path = entry.path();
        let tree = InstructionTree::read(path)?;
        tracing::debug!(path = %path.display(), instructions = tree.instructions.len(), "parsed dockerfile");
        visit(path, &tree).map_err(|err| err.in_file(path))?;
    }
    Ok(())
}

fn is_dockerfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("Dockerfile"))
}
