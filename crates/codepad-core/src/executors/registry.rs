//! Language runtime registry
//
// Maps a language name from the client onto a closed set of runtimes, each
// with a static recipe describing how to compile and run a source file.

use crate::errors::ExecutionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

/// File name (without extension) used for sources whose name is not derived from the code.
pub const DEFAULT_SOURCE_STEM: &str = "main";
/// Entry-point class used when none can be extracted from Java source.
pub const DEFAULT_JAVA_CLASS: &str = "Main";

#[cfg(windows)]
const BINARY_NAME: &str = "output.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    C,
    Python,
    JavaScript,
    Java,
    Go,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Cpp,
        Language::C,
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Go,
        Language::TypeScript,
    ];

    /// Resolve a client-supplied language name. Matching is case-insensitive
    /// and accepts display names ("C++"), ids ("cpp") and short aliases ("py").
    pub fn resolve(name: &str) -> Result<Language, ExecutionError> {
        let language = match name.trim().to_lowercase().as_str() {
            "c++" | "cpp" | "cxx" => Language::Cpp,
            "c" => Language::C,
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "node" | "nodejs" => Language::JavaScript,
            "java" => Language::Java,
            "go" | "golang" => Language::Go,
            "typescript" | "ts" => Language::TypeScript,
            _ => return Err(ExecutionError::UnsupportedLanguage(name.to_string())),
        };
        Ok(language)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Go => "go",
            Language::TypeScript => "typescript",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Cpp => "C++",
            Language::C => "C",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Java => "Java",
            Language::Go => "Go",
            Language::TypeScript => "TypeScript",
        }
    }

    pub fn recipe(&self) -> &'static Recipe {
        match self {
            Language::Cpp => &CPP,
            Language::C => &C,
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::Java => &JAVA,
            Language::Go => &GO,
            Language::TypeScript => &TYPESCRIPT,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One argument slot in a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Lit(&'static str),
    /// Path of the source file.
    Source,
    /// Path the compiler writes a native binary to.
    Output,
    /// Directory holding compiled classes.
    ClassPath,
    /// Entry-point name derived from the source.
    EntryName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Named(&'static str),
    /// The compiled binary itself.
    Artifact,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate {
    pub program: Program,
    pub args: &'static [Arg],
}

/// How the source file name is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Always `main.<ext>`.
    Fixed,
    /// Named after the public class declared in the source.
    PublicClass,
}

/// Compile and run instructions for one language.
#[derive(Debug)]
pub struct Recipe {
    pub extension: &'static str,
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
    pub entry_point: EntryPoint,
}

/// A program and argument list ready to be turned into a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// What the run step launches, resolved against a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub dir: PathBuf,
    pub source: PathBuf,
    pub binary: Option<PathBuf>,
    pub entry_name: String,
}

static CPP: Recipe = Recipe {
    extension: "cpp",
    compile: Some(CommandTemplate {
        program: Program::Named("g++"),
        args: &[Arg::Source, Arg::Lit("-o"), Arg::Output, Arg::Lit("-std=c++17")],
    }),
    run: CommandTemplate {
        program: Program::Artifact,
        args: &[],
    },
    entry_point: EntryPoint::Fixed,
};

static C: Recipe = Recipe {
    extension: "c",
    compile: Some(CommandTemplate {
        program: Program::Named("gcc"),
        args: &[Arg::Source, Arg::Lit("-o"), Arg::Output],
    }),
    run: CommandTemplate {
        program: Program::Artifact,
        args: &[],
    },
    entry_point: EntryPoint::Fixed,
};

// -u keeps stdout unbuffered on a pipe so prompts reach the client before input() blocks.
static PYTHON: Recipe = Recipe {
    extension: "py",
    compile: None,
    run: CommandTemplate {
        program: Program::Named("python3"),
        args: &[Arg::Lit("-u"), Arg::Source],
    },
    entry_point: EntryPoint::Fixed,
};

static JAVASCRIPT: Recipe = Recipe {
    extension: "js",
    compile: None,
    run: CommandTemplate {
        program: Program::Named("node"),
        args: &[Arg::Source],
    },
    entry_point: EntryPoint::Fixed,
};

static JAVA: Recipe = Recipe {
    extension: "java",
    compile: Some(CommandTemplate {
        program: Program::Named("javac"),
        args: &[Arg::Source],
    }),
    run: CommandTemplate {
        program: Program::Named("java"),
        args: &[Arg::Lit("-cp"), Arg::ClassPath, Arg::EntryName],
    },
    entry_point: EntryPoint::PublicClass,
};

static GO: Recipe = Recipe {
    extension: "go",
    compile: Some(CommandTemplate {
        program: Program::Named("go"),
        args: &[Arg::Lit("build"), Arg::Lit("-o"), Arg::Output, Arg::Source],
    }),
    run: CommandTemplate {
        program: Program::Artifact,
        args: &[],
    },
    entry_point: EntryPoint::Fixed,
};

static TYPESCRIPT: Recipe = Recipe {
    extension: "ts",
    compile: None,
    run: CommandTemplate {
        program: Program::Named("npx"),
        args: &[Arg::Lit("--yes"), Arg::Lit("tsx"), Arg::Source],
    },
    entry_point: EntryPoint::Fixed,
};

fn public_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"public\s+class\s+(\w+)").expect("valid class regex"))
}

/// Extract the name of the first public class declared in Java source.
pub fn extract_public_class(code: &str) -> Option<String> {
    public_class_regex()
        .captures(code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl Recipe {
    pub fn needs_compile(&self) -> bool {
        self.compile.is_some()
    }

    /// Stem of the source file; for `PublicClass` languages it doubles as the run target.
    pub fn entry_name(&self, code: &str) -> String {
        match self.entry_point {
            EntryPoint::Fixed => DEFAULT_SOURCE_STEM.to_string(),
            EntryPoint::PublicClass => {
                extract_public_class(code).unwrap_or_else(|| DEFAULT_JAVA_CLASS.to_string())
            }
        }
    }

    pub fn source_file_name(&self, code: &str) -> String {
        format!("{}.{}", self.entry_name(code), self.extension)
    }

    fn produces_binary(&self) -> bool {
        self.compile
            .map(|c| c.args.contains(&Arg::Output))
            .unwrap_or(false)
    }

    /// Resolve the paths the compile and run steps work with inside `dir`.
    pub fn artifact(&self, dir: &Path, source: &Path, code: &str) -> Artifact {
        Artifact {
            dir: dir.to_path_buf(),
            source: source.to_path_buf(),
            binary: self.produces_binary().then(|| dir.join(BINARY_NAME)),
            entry_name: self.entry_name(code),
        }
    }

    /// Compiler invocation, `None` for interpreted languages.
    pub fn compile_command(&self, artifact: &Artifact) -> Option<CommandSpec> {
        self.compile.map(|template| template.expand(artifact))
    }

    pub fn run_command(&self, artifact: &Artifact) -> CommandSpec {
        self.run.expand(artifact)
    }
}

impl CommandTemplate {
    fn expand(&self, artifact: &Artifact) -> CommandSpec {
        let binary = || {
            artifact
                .binary
                .clone()
                .unwrap_or_else(|| artifact.dir.join(BINARY_NAME))
        };
        let program = match self.program {
            Program::Named(name) => name.to_string(),
            Program::Artifact => path_arg(&binary()),
        };
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(lit) => lit.to_string(),
                Arg::Source => path_arg(&artifact.source),
                Arg::Output => path_arg(&binary()),
                Arg::ClassPath => path_arg(&artifact.dir),
                Arg::EntryName => artifact.entry_name.clone(),
            })
            .collect();
        CommandSpec { program, args }
    }
}

impl CommandSpec {
    /// Build a tokio command with all three standard streams piped.
    pub fn to_command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Fail early with a readable message when the program cannot be found.
    pub fn ensure_available(&self) -> Result<(), ExecutionError> {
        if Path::new(&self.program).is_absolute() {
            return Ok(());
        }
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| ExecutionError::spawn(&self.program, "executable not found on PATH"))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
