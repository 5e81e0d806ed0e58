pub mod interpolation;
pub mod walk;

pub use interpolation::Interpolation;
pub use walk::walk_dockerfiles;

use crate::error::{DockupError, Result};
use dockerfile_parser::{
    Dockerfile, Instruction as ParsedInstruction, ShellOrExecExpr, Span, SpannedString, Splicer,
};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    From,
    Arg,
    Env,
    Run,
    Other(String),
}

/// A variable set by an ARG or ENV instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    /// Unquoted value, spanning the value as written (quotes included).
    /// ARGs without a default have none.
    pub value: Option<SpannedString>,
}

/// One Dockerfile instruction together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub span: Span,
    /// Exact source text of the instruction, continuations included.
    pub original: String,
    /// Image token of a FROM instruction, without flags or stage alias.
    pub image: Option<SpannedString>,
    /// Shell command of a RUN instruction with continuations removed.
    pub command: Option<String>,
    pub assignments: Vec<Assignment>,
    /// Comment lines directly above the instruction.
    pub comments: Vec<SpannedString>,
}

/// Ordered instructions of a single Dockerfile.
#[derive(Debug, Clone)]
pub struct InstructionTree {
    dockerfile: Dockerfile,
    pub instructions: Vec<Instruction>,
}

impl InstructionTree {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DockupError::DockerfileParse {
            path: path.to_path_buf(),
            message: format!("opening dockerfile: {e}"),
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let parse_error = |message: String| DockupError::DockerfileParse {
            path: path.to_path_buf(),
            message,
        };

        let dockerfile = Dockerfile::parse(content).map_err(|err| parse_error(err.to_string()))?;
        let content = dockerfile.content.as_str();

        let mut instructions = Vec::with_capacity(dockerfile.instructions.len());
        for parsed in &dockerfile.instructions {
            let span = parsed.span();
            let original = content.get(span.start..span.end).ok_or_else(|| {
                parse_error(format!("invalid instruction span {}..{}", span.start, span.end))
            })?;

            let mut instruction = Instruction {
                kind: InstructionKind::Other(String::new()),
                span,
                original: original.to_string(),
                image: None,
                command: None,
                assignments: Vec::new(),
                comments: preceding_comments(content, span.start),
            };
            match parsed {
                ParsedInstruction::From(from) => {
                    instruction.kind = InstructionKind::From;
                    instruction.image = Some(from.image.clone());
                }
                ParsedInstruction::Arg(arg) => {
                    instruction.kind = InstructionKind::Arg;
                    instruction.assignments.push(Assignment {
                        name: arg.name.content.clone(),
                        value: arg.value.clone(),
                    });
                }
                ParsedInstruction::Env(env) => {
                    instruction.kind = InstructionKind::Env;
                    instruction.assignments = env
                        .vars
                        .iter()
                        .map(|var| Assignment {
                            name: var.key.content.clone(),
                            value: Some(SpannedString {
                                span: var.value.span,
                                content: var.value.to_string().trim().to_string(),
                            }),
                        })
                        .collect();
                }
                ParsedInstruction::Run(run) => {
                    instruction.kind = InstructionKind::Run;
                    instruction.command = Some(match &run.expr {
                        ShellOrExecExpr::Shell(shell) => shell.to_string().trim().to_string(),
                        ShellOrExecExpr::Exec(exec) => exec.as_str_vec().join(" "),
                    });
                }
                ParsedInstruction::Misc(misc) => {
                    instruction.kind = InstructionKind::Other(misc.instruction.content.to_ascii_uppercase());
                }
                ParsedInstruction::Label(_) => instruction.kind = InstructionKind::Other("LABEL".to_string()),
                ParsedInstruction::Entrypoint(_) => {
                    instruction.kind = InstructionKind::Other("ENTRYPOINT".to_string())
                }
                ParsedInstruction::Cmd(_) => instruction.kind = InstructionKind::Other("CMD".to_string()),
                ParsedInstruction::Copy(_) => instruction.kind = InstructionKind::Other("COPY".to_string()),
            }
            instructions.push(instruction);
        }

        Ok(Self {
            dockerfile,
            instructions,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// The text the tree was parsed from.
    pub fn content(&self) -> &str {
        &self.dockerfile.content
    }

    /// Source text under `span`, empty when it falls outside the file.
    pub fn slice(&self, span: &Span) -> &str {
        self.content().get(span.start..span.end).unwrap_or_default()
    }

    /// A splice buffer over the original content; spans stay relative to it.
    pub fn splicer(&self) -> Splicer {
        self.dockerfile.splicer()
    }
}

fn preceding_comments(content: &str, start: usize) -> Vec<SpannedString> {
    let mut comments = Vec::new();
    let mut line_start = content[..start].rfind('\n').map_or(0, |index| index + 1);

    while line_start > 0 {
        let end = line_start - 1;
        let begin = content[..end].rfind('\n').map_or(0, |index| index + 1);
        let line = &content[begin..end];
        if !line.trim_start().starts_with('#') {
            break;
        }
        comments.push(SpannedString {
            span: Span::new(begin, end),
            content: line.to_string(),
        });
        line_start = begin;
    }
    comments.reverse();
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> InstructionTree {
        InstructionTree::parse(Path::new("Dockerfile"), content).unwrap()
    }

    fn values(instruction: &Instruction) -> Vec<(&str, Option<&str>)> {
        instruction
            .assignments
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_ref().map(|v| v.content.as_str())))
            .collect()
    }

    #[test]
    fn parses_instruction_kinds_and_images() {
        let tree = parse("ARG VERSION=1.2.3\nFROM --platform=linux/amd64 alpine:${VERSION} AS base\nRUN echo hi\nUSER root\n");
        let kinds: Vec<_> = tree.iter().map(|i| i.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                InstructionKind::Arg,
                InstructionKind::From,
                InstructionKind::Run,
                InstructionKind::Other("USER".to_string()),
            ]
        );
        let image = tree.instructions[1].image.as_ref().unwrap();
        assert_eq!(image.content, "alpine:${VERSION}");
        assert_eq!(tree.slice(&image.span), "alpine:${VERSION}");
        assert!(tree.instructions[1].original.starts_with("FROM --platform"));
    }

    #[test]
    fn run_commands_drop_continuations() {
        let tree = parse("FROM alpine\nRUN apk add \\\n    curl \\\n    git\n");
        let command = tree.instructions[1].command.as_deref().unwrap();
        assert!(command.starts_with("apk add"));
        assert!(command.contains("curl") && command.ends_with("git"));
        assert!(!command.contains('\\'));
        assert!(tree.instructions[1].original.contains("\\\n"));
    }

    #[test]
    fn collects_comments_directly_above() {
        let content = "# unrelated\n\n# pinned alpine:3.12\n# second\nFROM alpine:3.12\n";
        let tree = parse(content);
        let comments = &tree.instructions[0].comments;
        let lines: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(lines, vec!["# pinned alpine:3.12", "# second"]);
        assert_eq!(tree.slice(&comments[0].span), "# pinned alpine:3.12");
    }

    #[test]
    fn reads_arg_and_env_assignments() {
        let tree = parse(
            "ARG VERSION=\"1.2.3\"\nARG EMPTY\nFROM alpine\nENV A=1 B='two words'\nENV LEGACY some value\n",
        );
        assert_eq!(values(&tree.instructions[0]), vec![("VERSION", Some("1.2.3"))]);
        assert_eq!(values(&tree.instructions[1]), vec![("EMPTY", None)]);
        assert_eq!(
            values(&tree.instructions[3]),
            vec![("A", Some("1")), ("B", Some("two words"))]
        );
        assert_eq!(values(&tree.instructions[4]), vec![("LEGACY", Some("some value"))]);

        let quoted = tree.instructions[0].assignments[0].value.as_ref().unwrap();
        assert_eq!(tree.slice(&quoted.span), "\"1.2.3\"");
    }

    #[test]
    fn escaped_quotes_do_not_hide_later_env_pairs() {
        let tree = parse("FROM alpine\nENV MSG=\"a \\\" b\" V=1.2.3\n");
        assert_eq!(
            values(&tree.instructions[1]),
            vec![("MSG", Some("a \" b")), ("V", Some("1.2.3"))]
        );
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let err = InstructionTree::parse(Path::new("Dockerfile.bad"), "FROM\n").unwrap_err();
        assert!(matches!(err, DockupError::DockerfileParse { .. }));
    }
}
