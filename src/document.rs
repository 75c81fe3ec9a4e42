//! Output documents: one record per file the build will write.
//!
//! A [`Document`] carries either in-memory target bytes (generated content,
//! or markdown awaiting rendering) or a source path to copy verbatim. Target
//! paths are validated on assignment — every document must land strictly
//! inside the output root — and the whole batch is checked for duplicate
//! targets before anything is written, so a fatal error never leaves a
//! half-written site behind.
//!
//! Saving also maintains a gzip companion (`<target>.gz`) for any output at
//! or above the configured size threshold, written with a zeroed mtime so
//! rebuilds of unchanged content are byte-identical.

use crate::layout::Layout;
use flate2::Compression;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Outputs at least this many bytes get a gzip companion, unless configured
/// otherwise.
pub const DEFAULT_GZIP_MIN_BYTES: u64 = 500;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("target path {0} is outside the output root")]
    TargetOutsideRoot(PathBuf),
    #[error("duplicate output target: {0}")]
    DuplicateTarget(PathBuf),
    #[error("source file has no usable name: {0}")]
    EmptyName(PathBuf),
    #[error("document {0} has neither target data nor a source path")]
    NothingToWrite(String),
}

/// A single file on the website.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    /// Where to copy from, for verbatim documents.
    pub source_path: Option<PathBuf>,
    /// Absolute or build-relative path inside the output root. Set through
    /// [`Document::set_target_path`].
    pub target_path: PathBuf,
    /// In-memory source text (markdown for rendered documents).
    pub source_data: Option<String>,
    /// In-memory target bytes; filled by rendering, or directly for raw
    /// generated files.
    pub target_data: Option<Vec<u8>>,
    pub is_markdown: bool,
    /// Template handed to the renderer.
    pub template: PathBuf,
    /// Ordered `-V key[=value]` variables. Order is preserved for
    /// reproducible renderer invocations; duplicates are allowed.
    pub variables: Vec<(String, Option<String>)>,
    pub modtime: SystemTime,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Document {
            name: name.to_string(),
            source_path: None,
            target_path: PathBuf::new(),
            source_data: None,
            target_data: None,
            is_markdown: false,
            template: PathBuf::new(),
            variables: Vec::new(),
            modtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// Build a document from a plain input file.
    ///
    /// Extension handling:
    /// - `.md` — markdown, keeps its place in the tree (extension dropped)
    /// - `.nomove` — verbatim, keeps its place in the tree (suffix dropped)
    /// - anything else — verbatim copy into the shared resource directory
    pub fn from_source_path(
        path: &Path,
        root: &Path,
        layout: &Layout,
    ) -> Result<Document, DocumentError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DocumentError::EmptyName(path.to_path_buf()))?;

        let mut d = Document::new(&file_name);
        d.source_path = Some(path.to_path_buf());
        d.modtime = fs::metadata(path)?.modified()?;
        d.template = layout.template_html();

        let mut keep_in_place = false;
        if let Some(stem) = file_name.strip_suffix(".md") {
            d.is_markdown = true;
            keep_in_place = true;
            d.name = stem.to_string();
        } else if let Some(stem) = file_name.strip_suffix(".nomove") {
            keep_in_place = true;
            d.name = stem.to_string();
        }
        if d.name.is_empty() {
            return Err(DocumentError::EmptyName(path.to_path_buf()));
        }

        let target = if keep_in_place {
            let parent = path.parent().unwrap_or(Path::new(""));
            let rel = parent.strip_prefix(root).unwrap_or(parent);
            layout.output_dir().join(rel).join(&d.name)
        } else {
            layout.output_resources_dir().join(&d.name)
        };
        d.set_target_path(&target, layout)?;

        if d.is_markdown {
            d.source_data = Some(fs::read_to_string(path)?);
        }

        Ok(d)
    }

    /// Assign the target path, enforcing that it is a strict descendant of
    /// the output root, and record the `relroot` variable (relative path
    /// from the target's directory back up to the output root).
    ///
    /// The check is lexical — `..` and `.` components are resolved without
    /// touching the filesystem, so it works before the output tree exists.
    pub fn set_target_path(
        &mut self,
        target_path: &Path,
        layout: &Layout,
    ) -> Result<(), DocumentError> {
        let root = normalize(layout.output_dir());
        let target = normalize(target_path);
        let target_dir = target.parent().unwrap_or(Path::new(""));

        let depth = match target_dir.strip_prefix(&root) {
            Ok(rel) if target != root => rel.components().count(),
            _ => return Err(DocumentError::TargetOutsideRoot(target_path.to_path_buf())),
        };
        self.target_path = target;

        let relroot = if depth == 0 {
            ".".to_string()
        } else {
            vec![".."; depth].join("/")
        };
        self.add_variable("relroot", &relroot);
        Ok(())
    }

    pub fn add_variable(&mut self, key: &str, value: &str) {
        self.variables.push((key.to_string(), Some(value.to_string())));
    }

    /// A variable with no value — rendered as a bare flag.
    pub fn add_flag(&mut self, key: &str) {
        self.variables.push((key.to_string(), None));
    }

    /// Write the target file and maintain its gzip companion.
    pub fn save(&self, gzip_min_bytes: u64) -> Result<(), DocumentError> {
        if let Some(dir) = self.target_path.parent() {
            fs::create_dir_all(dir)?;
        }

        if let Some(data) = &self.target_data {
            fs::write(&self.target_path, data)?;
        } else if let Some(source) = &self.source_path {
            fs::copy(source, &self.target_path)?;
        } else {
            return Err(DocumentError::NothingToWrite(self.name.clone()));
        }

        let size = fs::metadata(&self.target_path)?.len();
        let gz_path = gzip_companion_path(&self.target_path);

        if size >= gzip_min_bytes {
            // mtime 0 keeps the companion byte-stable across rebuilds.
            let bytes = fs::read(&self.target_path)?;
            let file = fs::File::create(&gz_path)?;
            let mut encoder = flate2::GzBuilder::new()
                .mtime(0)
                .write(file, Compression::default());
            encoder.write_all(&bytes)?;
            encoder.finish()?;
        } else if let Err(err) = fs::remove_file(&gz_path)
            && err.kind() != io::ErrorKind::NotFound
        {
            return Err(err.into());
        }

        Ok(())
    }
}

fn gzip_companion_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_os_string();
    os.push(".gz");
    PathBuf::from(os)
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Whole-batch duplicate-target pre-check. Every conflict is reported before
/// the first one aborts the build; nothing has been written at this point.
pub fn check_target_conflicts(documents: &[Document]) -> Result<(), DocumentError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut first_duplicate = None;

    for d in documents {
        let target = normalize(&d.target_path);
        if !seen.insert(target.clone()) {
            eprintln!("**Duplicate target: {}", target.display());
            first_duplicate.get_or_insert(target);
        }
    }

    match first_duplicate {
        Some(target) => Err(DocumentError::DuplicateTarget(target)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn layout_in(tmp: &TempDir) -> Layout {
        Layout::new(&tmp.path().join("input"), &tmp.path().join("www"))
    }

    #[test]
    fn target_inside_root_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let mut d = Document::new("page");
        d.set_target_path(&layout.output_dir().join("posts/page"), &layout)
            .unwrap();
        assert!(d.target_path.ends_with("www/posts/page"));
    }

    #[test]
    fn target_outside_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let mut d = Document::new("evil");
        let err = d
            .set_target_path(&layout.output_dir().join("../elsewhere/evil"), &layout)
            .unwrap_err();
        assert!(matches!(err, DocumentError::TargetOutsideRoot(_)));
    }

    #[test]
    fn dotdot_escape_is_caught_lexically() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let mut d = Document::new("evil");
        let err = d
            .set_target_path(&layout.output_dir().join("posts/../../etc/passwd"), &layout)
            .unwrap_err();
        assert!(matches!(err, DocumentError::TargetOutsideRoot(_)));
    }

    #[test]
    fn relroot_counts_directory_depth() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let mut top = Document::new("top");
        top.set_target_path(&layout.output_dir().join("index.html"), &layout)
            .unwrap();
        assert_eq!(top.variables[0], ("relroot".to_string(), Some(".".to_string())));

        let mut nested = Document::new("nested");
        nested
            .set_target_path(&layout.output_dir().join("posts/2020/page"), &layout)
            .unwrap();
        assert_eq!(
            nested.variables[0],
            ("relroot".to_string(), Some("../..".to_string()))
        );
    }

    #[test]
    fn duplicate_targets_detected_before_writing() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let mut a = Document::new("a");
        a.set_target_path(&layout.output_resources_dir().join("foo.png"), &layout)
            .unwrap();
        let mut b = Document::new("b");
        b.set_target_path(&layout.output_resources_dir().join("foo.png"), &layout)
            .unwrap();
        let mut c = Document::new("c");
        c.set_target_path(&layout.output_resources_dir().join("bar.png"), &layout)
            .unwrap();

        let err = check_target_conflicts(&[a, b, c]).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateTarget(p) if p.ends_with("foo.png")));
    }

    #[test]
    fn distinct_targets_pass_the_conflict_check() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let mut a = Document::new("a");
        a.set_target_path(&layout.output_resources_dir().join("a"), &layout)
            .unwrap();
        let mut b = Document::new("b");
        b.set_target_path(&layout.output_resources_dir().join("b"), &layout)
            .unwrap();
        assert!(check_target_conflicts(&[a, b]).is_ok());
    }

    #[test]
    fn save_writes_target_data_and_gzip_companion() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let mut d = Document::new("big");
        d.target_data = Some(vec![b'x'; 2000]);
        d.set_target_path(&layout.output_dir().join("big.html"), &layout)
            .unwrap();
        d.save(DEFAULT_GZIP_MIN_BYTES).unwrap();

        assert_eq!(fs::read(&d.target_path).unwrap().len(), 2000);
        let gz = fs::File::open(gzip_companion_path(&d.target_path)).unwrap();
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(gz)
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, vec![b'x'; 2000]);
    }

    #[test]
    fn small_output_gets_no_companion_and_stale_one_is_removed() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let mut d = Document::new("small");
        d.target_data = Some(b"tiny".to_vec());
        d.set_target_path(&layout.output_dir().join("small.html"), &layout)
            .unwrap();

        // Plant a stale companion from a previous, larger build.
        fs::create_dir_all(layout.output_dir()).unwrap();
        let gz_path = gzip_companion_path(&d.target_path);
        fs::write(&gz_path, b"stale").unwrap();

        d.save(DEFAULT_GZIP_MIN_BYTES).unwrap();
        assert!(!gz_path.exists());
    }

    #[test]
    fn gzip_companion_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let mut d = Document::new("page");
        d.target_data = Some(vec![b'y'; 1000]);
        d.set_target_path(&layout.output_dir().join("page.html"), &layout)
            .unwrap();

        d.save(DEFAULT_GZIP_MIN_BYTES).unwrap();
        let first = fs::read(gzip_companion_path(&d.target_path)).unwrap();
        d.save(DEFAULT_GZIP_MIN_BYTES).unwrap();
        let second = fs::read(gzip_companion_path(&d.target_path)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn save_copies_source_file_when_no_target_data() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        let src = tmp.path().join("photo.png");
        fs::write(&src, b"pretend image").unwrap();

        let mut d = Document::new("photo.png");
        d.source_path = Some(src);
        d.set_target_path(&layout.output_resources_dir().join("photo.png"), &layout)
            .unwrap();
        d.save(DEFAULT_GZIP_MIN_BYTES).unwrap();

        assert_eq!(fs::read(&d.target_path).unwrap(), b"pretend image");
    }

    #[test]
    fn from_source_path_markdown_keeps_place_and_drops_extension() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let root = layout.main_dir();
        fs::create_dir_all(root.join("essays")).unwrap();
        let path = root.join("essays/cats.md");
        fs::write(&path, "# Cats\n").unwrap();

        let d = Document::from_source_path(&path, &root, &layout).unwrap();
        assert_eq!(d.name, "cats");
        assert!(d.is_markdown);
        assert_eq!(d.source_data.as_deref(), Some("# Cats\n"));
        assert_eq!(d.target_path, layout.output_dir().join("essays/cats"));
    }

    #[test]
    fn from_source_path_nomove_keeps_place_verbatim() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let root = layout.main_dir();
        fs::create_dir_all(&root).unwrap();
        let path = root.join("robots.txt.nomove");
        fs::write(&path, "User-agent: *\n").unwrap();

        let d = Document::from_source_path(&path, &root, &layout).unwrap();
        assert_eq!(d.name, "robots.txt");
        assert!(!d.is_markdown);
        assert_eq!(d.target_path, layout.output_dir().join("robots.txt"));
    }

    #[test]
    fn from_source_path_other_files_go_to_resources() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let root = layout.main_dir();
        fs::create_dir_all(root.join("pics")).unwrap();
        let path = root.join("pics/cat.png");
        fs::write(&path, b"png bytes").unwrap();

        let d = Document::from_source_path(&path, &root, &layout).unwrap();
        assert_eq!(d.target_path, layout.output_resources_dir().join("cat.png"));
    }

    #[test]
    fn nothing_to_write_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        let mut d = Document::new("ghost");
        d.set_target_path(&layout.output_dir().join("ghost"), &layout)
            .unwrap();
        assert!(matches!(
            d.save(DEFAULT_GZIP_MIN_BYTES),
            Err(DocumentError::NothingToWrite(_))
        ));
    }
}
