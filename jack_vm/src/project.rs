//! `.vm` file and directory translation
//!
//! A single file becomes `<stem>.asm` beside it. A directory becomes
//! `<dir>/<dirname>.asm` holding the bootstrap followed by every `.vm`
//! file in it, in name order.

use crate::command::Command;
use crate::logging::{codes, log_vm_error, log_vm_info};
use crate::parser::{parse_program, VmParseError};
use crate::translator::{bootstrap, TranslateError, Translator};
use jack_compiler::logging::{with_file_context, Code};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const VM_EXTENSION: &str = "vm";
pub const ASM_EXTENSION: &str = "asm";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: VmParseError,
    },

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("no .vm files in {}", .0.display())]
    NoVmFiles(PathBuf),

    #[error("not a .vm file or directory: {}", .0.display())]
    InvalidInput(PathBuf),
}

impl ProjectError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Io { .. } => jack_compiler::logging::codes::file_processing::IO_ERROR,
            Self::Parse { source, .. } => source.error_code(),
            Self::Translate(err) => err.error_code(),
            Self::NoVmFiles(_) | Self::InvalidInput(_) => codes::ILLEGAL_OPERATION,
        }
    }
}

/// One parsed `.vm` file
#[derive(Debug, Clone)]
pub struct VmFile {
    pub path: PathBuf,
    /// File stem; names statics and comparison labels
    pub name: String,
    pub commands: Vec<Command>,
}

impl VmFile {
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let commands = parse_program(&text).map_err(|source| ProjectError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            name: file_stem(path),
            commands,
        })
    }

    pub fn translate(&self) -> Result<String, ProjectError> {
        Ok(Translator::new(&self.name).translate_program(&self.commands)?)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn is_vm_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(VM_EXTENSION))
}

/// `.vm` files directly inside `dir`, sorted by name
pub fn discover_vm_files(dir: &Path) -> Result<Vec<PathBuf>, ProjectError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| ProjectError::Io {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        if is_vm_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ProjectError::NoVmFiles(dir.to_path_buf()));
    }
    Ok(files)
}

/// Load every `.vm` file `path` names: itself, or a directory's contents
pub fn load_vm_files(path: &Path) -> Result<Vec<VmFile>, ProjectError> {
    let paths = if path.is_dir() {
        discover_vm_files(path)?
    } else if is_vm_file(path) {
        vec![path.to_path_buf()]
    } else {
        return Err(ProjectError::InvalidInput(path.to_path_buf()));
    };

    paths
        .iter()
        .enumerate()
        .map(|(id, file)| with_file_context(file.clone(), id, || VmFile::load(file)))
        .collect()
}

/// Where translation of `path` writes its assembly
pub fn output_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(format!("{}.{}", file_stem(path), ASM_EXTENSION))
    } else {
        path.with_extension(ASM_EXTENSION)
    }
}

/// Assembly for `path`; directories get the bootstrap unless disabled
pub fn translate_path(path: &Path, with_bootstrap: bool) -> Result<String, ProjectError> {
    let files = load_vm_files(path)?;
    let mut asm = String::new();
    if path.is_dir() && with_bootstrap {
        asm.push_str(&bootstrap());
    }
    for (id, file) in files.iter().enumerate() {
        asm.push_str(&with_file_context(file.path.clone(), id, || file.translate())?);
    }
    Ok(asm)
}

/// Translate and write; returns the `.asm` path
pub fn translate_and_write(path: &Path, with_bootstrap: bool) -> Result<PathBuf, ProjectError> {
    let result = translate_path(path, with_bootstrap).and_then(|asm| {
        let out = output_path(path);
        fs::write(&out, asm)
            .map(|_| out.clone())
            .map_err(|source| ProjectError::Io { path: out, source })
    });

    match &result {
        Ok(out) => log_vm_info("Assembly written", &[
            ("input", &path.display().to_string()),
            ("output", &out.display().to_string()),
        ]),
        Err(err) => log_vm_error(err.error_code(), &err.to_string(), &[]),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    const MAIN: &str = "function Main.main 0\npush constant 1\nreturn\n";
    const SYS: &str = "function Sys.init 0\ncall Main.main 0\nlabel HALT\ngoto HALT\n";

    #[test]
    fn test_single_file_translation() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Main.vm");
        fs::write(&file, MAIN).unwrap();

        let out = translate_and_write(&file, true).unwrap();
        assert_eq!(out, dir.path().join("Main.asm"));
        let asm = fs::read_to_string(out).unwrap();
        assert!(asm.starts_with("// File: Main.vm\n"));
        assert!(!asm.contains("Bootstrap"));
    }

    #[test]
    fn test_directory_translation_is_ordered_with_bootstrap() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("Prog");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("Sys.vm"), SYS).unwrap();
        fs::write(project.join("Main.vm"), MAIN).unwrap();
        fs::write(project.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(project.join("nested")).unwrap();
        fs::write(project.join("nested").join("Deep.vm"), MAIN).unwrap();

        let out = translate_and_write(&project, true).unwrap();
        assert_eq!(out, project.join("Prog.asm"));
        let asm = fs::read_to_string(out).unwrap();
        let main_at = asm.find("// File: Main.vm").unwrap();
        let sys_at = asm.find("// File: Sys.vm").unwrap();
        assert!(asm.starts_with("// Bootstrap"));
        assert!(main_at < sys_at);
        assert!(!asm.contains("Deep"));
        assert!(asm.contains("(Sys.init$HALT)"));

        let bare = translate_path(&project, false).unwrap();
        assert!(!bare.contains("Bootstrap"));
    }

    #[test]
    fn test_errors() {
        let dir = tempdir().unwrap();
        assert_matches!(discover_vm_files(dir.path()), Err(ProjectError::NoVmFiles(_)));

        let bad = dir.path().join("Bad.vm");
        fs::write(&bad, "push constant 1\njump\n").unwrap();
        let err = translate_and_write(&bad, false).unwrap_err();
        assert_matches!(err, ProjectError::Parse { source: VmParseError::UnknownCommand { line: 2, .. }, .. });
        assert!(!dir.path().join("Bad.asm").exists());

        let text = dir.path().join("notes.txt");
        fs::write(&text, "x").unwrap();
        assert_matches!(load_vm_files(&text), Err(ProjectError::InvalidInput(_)));
    }
}
