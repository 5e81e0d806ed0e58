use crate::agents::dependency_extractor::DependencyExtractor;
use crate::config::Mode;
use crate::dockerfile::interpolation::has_variable;
use crate::dockerfile::{Instruction, InstructionKind, InstructionTree, Interpolation};
use crate::repository::Update;
use crate::version;
use dockerfile_parser::Span;

/// Edits against the text a tree was parsed from, applied in a single pass.
///
/// Every span refers to the original file. An edit that overlaps an earlier
/// one is dropped.
#[derive(Debug, Clone)]
pub struct Replacements<'t> {
    tree: &'t InstructionTree,
    edits: Vec<(Span, String)>,
}

impl<'t> Replacements<'t> {
    pub fn new(tree: &'t InstructionTree) -> Self {
        Self {
            tree,
            edits: Vec::new(),
        }
    }

    pub fn push(&mut self, span: Span, replacement: impl Into<String>) {
        let replacement = replacement.into();
        if self.tree.slice(&span) == replacement {
            return;
        }
        if self.edits.iter().any(|(other, _)| overlaps(other, &span)) {
            tracing::debug!(start = span.start, end = span.end, "dropping overlapping edit");
            return;
        }
        self.edits.push((span, replacement));
    }

    /// Replaces `old` with `new` inside the source text under `span`.
    pub fn replace_within(&mut self, span: Span, old: &str, new: &str) {
        let text = self.tree.slice(&span).replace(old, new);
        self.push(span, text);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(&self) -> String {
        let mut edits: Vec<&(Span, String)> = self.edits.iter().collect();
        // back to front, so no splice shifts a span still to come
        edits.sort_by(|a, b| b.0.cmp(&a.0));

        let mut splicer = self.tree.splicer();
        for (span, replacement) in edits {
            splicer.splice(span, replacement);
        }
        splicer.content
    }
}

fn overlaps(a: &Span, b: &Span) -> bool {
    a.start < b.end && b.start < a.end
}

/// Computes the edits one update needs in one Dockerfile.
pub struct PatchApplier<'a> {
    update: &'a Update,
    extractor: DependencyExtractor,
    mode: Mode,
    /// Digest of `update.next` when image references are pinned.
    pinned: Option<&'a str>,
}

impl<'a> PatchApplier<'a> {
    pub fn new(update: &'a Update, mode: Mode, pinned: Option<&'a str>) -> Self {
        Self {
            update,
            extractor: DependencyExtractor::new(mode),
            mode,
            pinned,
        }
    }

    pub fn replacements<'t>(&self, tree: &'t InstructionTree) -> Replacements<'t> {
        let mut replacements = Replacements::new(tree);
        match self.mode {
            Mode::Images => self.image_replacements(tree, &mut replacements),
            Mode::ReleaseUrls => self.release_replacements(tree, &mut replacements),
        }
        replacements
    }

    fn image_replacements(&self, tree: &InstructionTree, replacements: &mut Replacements<'_>) {
        let mut vars = Interpolation::new();
        let mut seen_from = false;

        for instruction in tree.iter() {
            match instruction.kind {
                InstructionKind::From => {
                    seen_from = true;
                    self.rewrite_from(&vars, instruction, replacements);
                }
                // only build-arg defaults; later stages redefine their own
                InstructionKind::Arg if !seen_from => self.rewrite_arg(instruction, replacements),
                _ => {}
            }
            vars.observe(instruction);
        }
    }

    fn rewrite_from(&self, vars: &Interpolation, instruction: &Instruction, replacements: &mut Replacements<'_>) {
        let update = self.update;
        let Some(image) = &instruction.image else {
            return;
        };
        let Some(dep) = self.extractor.parse_image(vars, &image.content) else {
            return;
        };
        if dep.path != update.path
            || dep.version != update.previous
            || has_variable(&instruction.original)
        {
            return;
        }

        let reference = match self.pinned {
            Some(digest) => format!("{}@{}", update.path, digest),
            None => format!("{}:{}", update.path, update.next),
        };
        replacements.push(image.span, reference);

        let old_tag = format!("{}:{}", update.path, update.previous);
        let new_tag = format!("{}:{}", update.path, update.next);
        let mut comment_found = false;
        for comment in &instruction.comments {
            if comment.content.contains(&old_tag) {
                replacements.push(comment.span, replace_reference(&comment.content, &update.path, &new_tag));
                comment_found = true;
            }
        }
        if self.pinned.is_some() && !comment_found {
            let start = instruction.span.start;
            replacements.push(Span::new(start, start), format!("# {new_tag}\n"));
        }
    }

    fn rewrite_arg(&self, instruction: &Instruction, replacements: &mut Replacements<'_>) {
        let update = self.update;
        let previous_suffix = prerelease_of(&update.previous);

        for value in instruction.assignments.iter().filter_map(|a| a.value.as_ref()) {
            if value.content == update.previous {
                replacements.replace_within(value.span, &update.previous, &update.next);
                return;
            }

            if previous_suffix.is_empty() {
                continue;
            }
            let base = strip_suffix(&update.previous, &previous_suffix);
            if same_version(&value.content, base) {
                let next_base = strip_suffix(&update.next, &prerelease_of(&update.next));
                replacements.replace_within(value.span, &value.content, next_base);
                return;
            }
        }
    }

    fn release_replacements(&self, tree: &InstructionTree, replacements: &mut Replacements<'_>) {
        let update = self.update;
        let old_segment = format!("{}/releases/download/{}/", update.path, update.previous);
        let new_segment = format!("{}/releases/download/{}/", update.path, update.next);
        let bare_previous = update.previous.strip_prefix('v');
        let bare_next = update.next.strip_prefix('v').unwrap_or(&update.next);

        for instruction in tree.iter() {
            match instruction.kind {
                InstructionKind::Run if instruction.original.contains(&old_segment) => {
                    replacements.replace_within(instruction.span, &old_segment, &new_segment);
                }
                InstructionKind::Arg | InstructionKind::Env => {
                    for value in instruction.assignments.iter().filter_map(|a| a.value.as_ref()) {
                        if value.content == update.previous {
                            replacements.replace_within(value.span, &update.previous, &update.next);
                        } else if bare_previous == Some(value.content.as_str()) {
                            // `download/v${VERSION}/` style variables hold the bare number
                            replacements.replace_within(value.span, &value.content, bare_next);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Replaces every `path:<tag>` or `path@<digest>` reference in `text` with
/// `replacement`, leaving aliases and trailing comments alone.
fn replace_reference(text: &str, path: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(index) = rest.find(path) {
        let before = rest[..index].chars().next_back();
        let after = &rest[index + path.len()..];
        let bounded = !before.is_some_and(|ch| ch.is_ascii_alphanumeric() || "._/-".contains(ch));

        if bounded && after.starts_with([':', '@']) {
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            out.push_str(&rest[..index]);
            out.push_str(replacement);
            rest = &after[end..];
        } else {
            out.push_str(&rest[..index + path.len()]);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn prerelease_of(literal: &str) -> String {
    version::normalize(literal)
        .map(|normalized| version::prerelease(&normalized).to_string())
        .unwrap_or_default()
}

fn strip_suffix<'s>(literal: &'s str, suffix: &str) -> &'s str {
    if suffix.is_empty() {
        return literal;
    }
    literal.rfind(suffix).map_or(literal, |index| &literal[..index])
}

fn same_version(a: &str, b: &str) -> bool {
    match (version::normalize(a), version::normalize(b)) {
        (Some(a), Some(b)) => version::compare(&a, &b).is_eq(),
        _ => false,
    }
}
