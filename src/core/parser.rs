use std::path::{Path, PathBuf};
use tree_sitter::{Parser, Tree};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{AnalyzerError, Result};
use super::syntax::{named_children, node_text, string_literal_value};
use super::{AnalysisOptions, CancellationToken};

const WORKFLOW_IMPORT: &str = "go.temporal.io/sdk/workflow";
const ACTIVITY_IMPORT: &str = "go.temporal.io/sdk/activity";
const TEMPORAL_IMPORT: &str = "go.temporal.io/sdk/temporal";
const WORKER_IMPORT: &str = "go.temporal.io/sdk/worker";

/// Local names a file binds to the Temporal SDK packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkImports {
    pub workflow: String,
    pub activity: String,
    pub temporal: String,
    pub worker: String,
    /// `import . "go.temporal.io/sdk/workflow"`
    pub workflow_dot_import: bool,
}

impl Default for SdkImports {
    fn default() -> Self {
        Self {
            workflow: "workflow".to_string(),
            activity: "activity".to_string(),
            temporal: "temporal".to_string(),
            worker: "worker".to_string(),
            workflow_dot_import: false,
        }
    }
}

impl SdkImports {
    /// Whether a call qualified by `qualifier` targets the workflow package
    pub fn is_workflow_qualifier(&self, qualifier: Option<&str>) -> bool {
        match qualifier {
            Some(q) => q == self.workflow,
            None => self.workflow_dot_import,
        }
    }

    /// Receivers that belong to the SDK itself rather than user code
    pub fn is_sdk_receiver(&self, receiver: &str) -> bool {
        receiver == self.workflow
            || receiver == self.activity
            || receiver == self.temporal
            || receiver == self.worker
    }
}

/// A Go source file that parsed cleanly
pub struct ParsedFile {
    /// File path as discovered under the root
    pub path: PathBuf,

    /// Name from the `package` clause
    pub package: String,

    /// Raw source content
    pub source: String,

    /// Syntax tree over `source`
    pub tree: Tree,

    /// SDK import aliases in effect for this file
    pub imports: SdkImports,
}

/// Discovers and parses the Go files of a source tree
pub struct GoSourceParser {
    parser: Parser,
}

impl GoSourceParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let go_language = tree_sitter_go::language();
        parser.set_language(&go_language)
            .map_err(|e| AnalyzerError::Parser(format!("Failed to set Go language: {}", e)))?;

        Ok(Self { parser })
    }

    /// List the Go files under `options.root_dir`, pruning excluded
    /// directories. Fails only when the root itself cannot be walked.
    pub fn discover(&self, options: &AnalysisOptions, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        let root = &options.root_dir;
        let metadata = std::fs::metadata(root).map_err(|e| {
            AnalyzerError::FileSystem(format!("Cannot walk {}: {}", root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(AnalyzerError::FileSystem(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !is_excluded_dir(entry.path(), &options.exclude_dirs)
            });

        for entry in walker {
            cancel.check()?;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(AnalyzerError::FileSystem(e.to_string()));
                    }
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file() && self.should_parse_file(path, options.include_tests) {
                files.push(path.to_path_buf());
            }
        }

        debug!("Discovered {} Go files under {}", files.len(), root.display());
        Ok(files)
    }

    /// Parse a single Go file. Files with syntax errors are rejected whole.
    pub fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<ParsedFile> {
        let path = file_path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.parse_source(path, source)
    }

    pub fn parse_source(&mut self, path: &Path, source: String) -> Result<ParsedFile> {
        let tree = self.parser.parse(&source, None)
            .ok_or_else(|| AnalyzerError::Parser(format!("Failed to parse {}", path.display())))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(AnalyzerError::Parser(format!(
                "Syntax errors in {}",
                path.display()
            )));
        }

        let package = named_children(root)
            .into_iter()
            .find(|child| child.kind() == "package_clause")
            .and_then(|clause| named_children(clause).into_iter().next())
            .map(|name| node_text(name, &source).to_string())
            .unwrap_or_default();

        let imports = extract_sdk_imports(&tree, &source);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            package,
            source,
            tree,
            imports,
        })
    }

    /// Discover and parse every eligible file, skipping the ones that fail
    pub fn parse_directory(&mut self, options: &AnalysisOptions, cancel: &CancellationToken) -> Result<Vec<ParsedFile>> {
        let mut parsed_files = Vec::new();

        for path in self.discover(options, cancel)? {
            cancel.check()?;
            match self.parse_file(&path) {
                Ok(parsed) => parsed_files.push(parsed),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(parsed_files)
    }

    fn should_parse_file(&self, path: &Path, include_tests: bool) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        if !name.ends_with(".go") {
            return false;
        }
        include_tests || !name.ends_with("_test.go")
    }
}

fn is_excluded_dir(path: &Path, exclude_dirs: &[String]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| exclude_dirs.iter().any(|excluded| excluded == name))
        .unwrap_or(false)
}

fn extract_sdk_imports(tree: &Tree, source: &str) -> SdkImports {
    let mut imports = SdkImports::default();

    for declaration in named_children(tree.root_node()) {
        if declaration.kind() != "import_declaration" {
            continue;
        }
        let mut specs = Vec::new();
        for child in named_children(declaration) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => specs.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|spec| spec.kind() == "import_spec"),
                ),
                _ => {}
            }
        }

        for spec in specs {
            let Some(import_path) = spec
                .child_by_field_name("path")
                .and_then(|path| string_literal_value(path, source))
            else {
                continue;
            };
            let alias = spec.child_by_field_name("name").map(|name| node_text(name, source));

            let slot = match import_path.as_str() {
                WORKFLOW_IMPORT => &mut imports.workflow,
                ACTIVITY_IMPORT => &mut imports.activity,
                TEMPORAL_IMPORT => &mut imports.temporal,
                WORKER_IMPORT => &mut imports.worker,
                _ => continue,
            };
            match alias {
                Some(".") if import_path == WORKFLOW_IMPORT => imports.workflow_dot_import = true,
                Some("_") | Some(".") => {}
                Some(alias) => *slot = alias.to_string(),
                None => {}
            }
        }
    }

    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<ParsedFile> {
        let mut parser = GoSourceParser::new().unwrap();
        parser.parse_source(Path::new("test.go"), source.to_string())
    }

    #[test]
    fn test_package_and_default_imports() {
        let parsed = parse(
            "package orders\n\nimport (\n\t\"go.temporal.io/sdk/workflow\"\n)\n",
        )
        .unwrap();
        assert_eq!(parsed.package, "orders");
        assert_eq!(parsed.imports, SdkImports::default());
    }

    #[test]
    fn test_aliased_and_dot_imports() {
        let parsed = parse(
            "package orders\n\nimport (\n\twf \"go.temporal.io/sdk/workflow\"\n\tsdkworker \"go.temporal.io/sdk/worker\"\n)\n",
        )
        .unwrap();
        assert_eq!(parsed.imports.workflow, "wf");
        assert_eq!(parsed.imports.worker, "sdkworker");
        assert!(parsed.imports.is_workflow_qualifier(Some("wf")));
        assert!(!parsed.imports.is_workflow_qualifier(Some("workflow")));

        let dotted = parse("package p\n\nimport . \"go.temporal.io/sdk/workflow\"\n").unwrap();
        assert!(dotted.imports.workflow_dot_import);
        assert!(dotted.imports.is_workflow_qualifier(None));
    }

    #[test]
    fn test_syntax_errors_reject_file() {
        let result = parse("package p\nfunc broken( {\n");
        assert!(matches!(result, Err(AnalyzerError::Parser(_))));
    }

    #[test]
    fn test_discover_prunes_excluded_dirs_and_tests() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("vendor/lib")).unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("app/main.go"), "package app\n").unwrap();
        std::fs::write(root.join("app/main_test.go"), "package app\n").unwrap();
        std::fs::write(root.join("vendor/lib/lib.go"), "package lib\n").unwrap();
        std::fs::write(root.join("README.md"), "# hi\n").unwrap();

        let parser = GoSourceParser::new().unwrap();
        let mut options = AnalysisOptions::new(root);
        options.exclude_dirs = vec!["vendor".to_string()];
        let files = parser.discover(&options, &CancellationToken::new()).unwrap();
        assert_eq!(files, vec![root.join("app/main.go")]);

        options.include_tests = true;
        let files = parser.discover(&options, &CancellationToken::new()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let parser = GoSourceParser::new().unwrap();
        let options = AnalysisOptions::new("/definitely/not/here");
        let result = parser.discover(&options, &CancellationToken::new());
        assert!(matches!(result, Err(AnalyzerError::FileSystem(_))));
    }
}
