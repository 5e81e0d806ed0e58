use crate::dockerfile::{Instruction, InstructionKind};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable pattern is valid")
});

/// Best-effort build variable substitution for a single Dockerfile.
///
/// Values are recorded from ARG and ENV instructions as the file is scanned,
/// so a lookup only sees assignments made above the instruction being read.
#[derive(Debug, Clone, Default)]
pub struct Interpolation {
    vars: HashMap<String, String>,
}

impl Interpolation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the assignments of an ARG or ENV instruction.
    pub fn observe(&mut self, instruction: &Instruction) {
        if !matches!(instruction.kind, InstructionKind::Arg | InstructionKind::Env) {
            return;
        }
        for assignment in &instruction.assignments {
            if let Some(value) = &assignment.value {
                let resolved = self.interpolate(&value.content);
                self.vars.insert(assignment.name.clone(), resolved);
            }
        }
    }

    #[cfg(test)]
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitutes `${VAR}`, `${VAR:-default}` and `$VAR`. Unknown variables
    /// without a default are left in place.
    pub fn interpolate(&self, text: &str) -> String {
        VARIABLE
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());
                let default = caps.get(2).map(|m| m.as_str());

                match (self.vars.get(name), default) {
                    (Some(value), Some(default)) if value.is_empty() => default.to_string(),
                    (Some(value), _) => value.clone(),
                    (None, Some(default)) => default.to_string(),
                    (None, None) => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// True when the text still carries a variable marker.
pub fn has_variable(text: &str) -> bool {
    text.contains('$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dockerfile::InstructionTree;
    use std::path::Path;

    #[test]
    fn substitutes_known_variables() {
        let mut vars = Interpolation::new();
        vars.set("VERSION", "1.2.3");
        assert_eq!(vars.interpolate("alpine:${VERSION}"), "alpine:1.2.3");
        assert_eq!(vars.interpolate("v$VERSION-linux"), "v1.2.3-linux");
    }

    #[test]
    fn leaves_unknown_variables_in_place() {
        let vars = Interpolation::new();
        assert_eq!(vars.interpolate("alpine:${MISSING}"), "alpine:${MISSING}");
        assert_eq!(vars.interpolate("$MISSING"), "$MISSING");
        assert!(has_variable(&vars.interpolate("${MISSING}")));
    }

    #[test]
    fn applies_defaults() {
        let mut vars = Interpolation::new();
        assert_eq!(vars.interpolate("${TAG:-3.18}"), "3.18");
        vars.set("TAG", "");
        assert_eq!(vars.interpolate("${TAG:-3.18}"), "3.18");
        vars.set("TAG", "3.19");
        assert_eq!(vars.interpolate("${TAG:-3.18}"), "3.19");
    }

    #[test]
    fn observes_arg_and_env_in_order() {
        let tree = InstructionTree::parse(
            Path::new("Dockerfile"),
            "ARG BASE=1.2\nARG FULL=${BASE}.3\nFROM alpine\nENV TOOL_VERSION=$FULL\n",
        )
        .unwrap();

        let mut vars = Interpolation::new();
        for instruction in tree.iter() {
            vars.observe(instruction);
        }
        assert_eq!(vars.get("FULL"), Some("1.2.3"));
        assert_eq!(vars.get("TOOL_VERSION"), Some("1.2.3"));
    }
}
