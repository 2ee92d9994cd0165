//! Deterministic path classification.
//!
//! Every tag is derived from the path, the change kind and the backend's
//! binary probe. The lookup tables below are the shipped defaults; callers
//! can replace them wholesale through [`ClassifierTables`].

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use diffscope_api::{ChangeKind, Classification};

/// Revision of the default tables. Bump when any table changes.
pub const TABLES_VERSION: u32 = 1;

/// Extension to language name.
pub const LANGUAGES: &[(&str, &str)] = &[
    (".go", "Go"),
    (".py", "Python"),
    (".js", "JavaScript"),
    (".ts", "TypeScript"),
    (".jsx", "JavaScript"),
    (".tsx", "TypeScript"),
    (".java", "Java"),
    (".c", "C"),
    (".cpp", "C++"),
    (".cc", "C++"),
    (".h", "C"),
    (".hpp", "C++"),
    (".rs", "Rust"),
    (".rb", "Ruby"),
    (".php", "PHP"),
    (".swift", "Swift"),
    (".kt", "Kotlin"),
    (".scala", "Scala"),
    (".sh", "Shell"),
    (".bash", "Shell"),
    (".zsh", "Shell"),
    (".sql", "SQL"),
    (".md", "Markdown"),
    (".json", "JSON"),
    (".yaml", "YAML"),
    (".yml", "YAML"),
    (".xml", "XML"),
    (".html", "HTML"),
    (".css", "CSS"),
    (".scss", "SCSS"),
    (".sass", "Sass"),
    (".proto", "Protocol Buffers"),
];

/// Extensions treated as binary regardless of content (compared lowercase).
pub const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".svg", ".zip", ".tar", ".gz", ".bz2", ".xz",
    ".7z", ".rar", ".exe", ".dll", ".so", ".dylib", ".a", ".o", ".wasm", ".class", ".pyc", ".pyo",
    ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".wav", ".ogg", ".m4a", ".ttf", ".otf",
    ".woff", ".woff2", ".eot", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".db",
    ".sqlite", ".sqlite3", ".bin", ".dat", ".data",
];

/// Substrings marking generated or vendored artifacts.
pub const GENERATED_MARKERS: &[&str] = &[
    ".pb.go",
    ".pb.gw.go",
    "_generated.go",
    ".gen.go",
    "vendor/",
    "node_modules/",
    "dist/",
    "build/",
    ".min.js",
    ".min.css",
];

/// Substrings marking test sources.
pub const TEST_MARKERS: &[&str] = &[
    "_test.go",
    "_test.py",
    ".test.js",
    ".test.ts",
    ".spec.js",
    ".spec.ts",
    "test/",
    "tests/",
    "__tests__/",
];

/// Basenames of well-known build and tooling files.
pub const CONFIG_FILES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    ".gitignore",
    ".dockerignore",
    "go.mod",
    "go.sum",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "Cargo.toml",
    "Cargo.lock",
    "pom.xml",
    "build.gradle",
    "CMakeLists.txt",
    ".golangci.yml",
    ".golangci.yaml",
];

/// Tooling directories at the repository root.
pub const CONFIG_PREFIXES: &[&str] = &[".github/", ".vscode/", ".idea/"];

/// Directory segments holding configuration anywhere in the tree.
pub const CONFIG_SEGMENTS: &[&str] = &["/config/"];

/// Configuration file extensions.
pub const CONFIG_EXTENSIONS: &[&str] = &[".yaml", ".yml", ".toml", ".ini", ".conf", ".config"];

/// Lookup tables driving [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierTables {
    /// Extension (with leading dot) to language name.
    pub languages: HashMap<String, String>,
    /// Lowercase binary extensions.
    pub binary_extensions: HashSet<String>,
    /// Generated-artifact substrings.
    pub generated_markers: Vec<String>,
    /// Test substrings.
    pub test_markers: Vec<String>,
    /// Config basenames.
    pub config_files: HashSet<String>,
    /// Config path prefixes.
    pub config_prefixes: Vec<String>,
    /// Config directory segments.
    pub config_segments: Vec<String>,
    /// Config extensions.
    pub config_extensions: HashSet<String>,
}

impl Default for ClassifierTables {
    fn default() -> Self {
        Self {
            languages: LANGUAGES
                .iter()
                .map(|(ext, lang)| ((*ext).to_owned(), (*lang).to_owned()))
                .collect(),
            binary_extensions: owned_set(BINARY_EXTENSIONS),
            generated_markers: owned_vec(GENERATED_MARKERS),
            test_markers: owned_vec(TEST_MARKERS),
            config_files: owned_set(CONFIG_FILES),
            config_prefixes: owned_vec(CONFIG_PREFIXES),
            config_segments: owned_vec(CONFIG_SEGMENTS),
            config_extensions: owned_set(CONFIG_EXTENSIONS),
        }
    }
}

/// Pure path classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    tables: ClassifierTables,
}

impl Classifier {
    /// Classifier over custom tables.
    #[must_use]
    pub const fn new(tables: ClassifierTables) -> Self {
        Self { tables }
    }

    /// The tables in use.
    #[must_use]
    pub const fn tables(&self) -> &ClassifierTables {
        &self.tables
    }

    /// Classify one changed path.
    ///
    /// `binary_probe` is the backend's content probe; the extension check is
    /// OR'd with it.
    #[must_use]
    pub fn classify(&self, path: &str, kind: ChangeKind, binary_probe: bool) -> Classification {
        let ext = extension(path);
        Classification {
            language: self.language(ext),
            is_new: kind == ChangeKind::Added,
            is_rename: kind == ChangeKind::Renamed,
            is_binary: self.is_binary_extension(ext) || binary_probe,
            is_generated: contains_any(path, &self.tables.generated_markers),
            is_test: contains_any(path, &self.tables.test_markers),
            is_config: self.is_config(path, ext),
        }
    }

    /// Whether the extension alone marks `path` as binary.
    #[must_use]
    pub fn is_binary_path(&self, path: &str) -> bool {
        self.is_binary_extension(extension(path))
    }

    fn language(&self, ext: &str) -> String {
        if ext.is_empty() {
            return String::new();
        }
        self.tables.languages.get(ext).cloned().unwrap_or_default()
    }

    fn is_binary_extension(&self, ext: &str) -> bool {
        !ext.is_empty()
            && self
                .tables
                .binary_extensions
                .contains(&ext.to_ascii_lowercase())
    }

    fn is_config(&self, path: &str, ext: &str) -> bool {
        let tables = &self.tables;
        tables.config_files.contains(basename(path))
            || tables
                .config_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
            || contains_any(path, &tables.config_segments)
            || (!ext.is_empty() && tables.config_extensions.contains(ext))
    }
}

/// Classify with the default tables.
#[must_use]
pub fn classify(path: &str, kind: ChangeKind, binary_probe: bool) -> Classification {
    static DEFAULT: OnceLock<Classifier> = OnceLock::new();
    DEFAULT
        .get_or_init(Classifier::default)
        .classify(path, kind, binary_probe)
}

/// Extension of the last path element, including the dot; empty when absent.
fn extension(path: &str) -> &str {
    let name = basename(path);
    name.rfind('.').map_or("", |idx| &name[idx..])
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn contains_any(path: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| path.contains(marker.as_str()))
}

fn owned_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

fn owned_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
