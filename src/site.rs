//! The build pipeline: walk inputs, assemble documents, typeset, write.
//!
//! Batch-oriented and single-threaded: read everything, build every
//! document, pre-check the whole batch for target conflicts, then write.
//! Nothing touches the output directory until the conflict check passes, so
//! a fatal error never commits partial output.

use crate::adventure::{AdventureError, GameData};
use crate::blog::{Blog, BlogError};
use crate::config::SiteConfig;
use crate::document::{self, Document, DocumentError};
use crate::layout::Layout;
use crate::render::{Render, RenderError};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Blog(#[from] BlogError),
    #[error(transparent)]
    Adventure(#[from] AdventureError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Which document families to build.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub blog: bool,
    pub cyoa: bool,
    pub pages: bool,
}

impl Selection {
    pub fn all() -> Self {
        Selection {
            blog: true,
            cyoa: true,
            pages: true,
        }
    }
}

/// Editor droppings and explicitly hidden files never enter the build.
fn valid_input_file(name: &str) -> bool {
    !name.ends_with(".swp") && !name.ends_with(".hide")
}

/// Assemble every selected document: plain pages and resources from
/// `main/`, blog documents from `*.blog` sources, and adventure documents
/// from `cyoa/`.
pub fn create_documents(
    layout: &Layout,
    config: &SiteConfig,
    selection: Selection,
) -> Result<Vec<Document>, SiteError> {
    let mut docs = Vec::new();
    let mut blog = Blog::new();

    let main_dir = layout.main_dir();
    if (selection.pages || selection.blog) && main_dir.is_dir() {
        for entry in WalkDir::new(&main_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !valid_input_file(&file_name) {
                continue;
            }

            if file_name.ends_with(".blog") {
                if selection.blog {
                    read_blog_file(&mut blog, entry.path())?;
                }
            } else if selection.pages {
                docs.push(Document::from_source_path(entry.path(), &main_dir, layout)?);
            }
        }
    }

    if selection.blog {
        docs.extend(blog.create_documents(layout)?);
    }
    if selection.cyoa {
        docs.extend(create_cyoa_documents(layout, config)?);
    }

    Ok(docs)
}

fn read_blog_file(blog: &mut Blog, path: &Path) -> Result<(), SiteError> {
    let content = fs::read_to_string(path)?;
    let modtime = fs::metadata(path)?.modified()?;
    let name = path.to_string_lossy();
    blog.read_source(&name, &content, modtime).inspect_err(|_| {
        eprintln!("Failed to read blog file {}", path.display());
    })?;
    Ok(())
}

/// Read every adventure script under `cyoa/`, build the game graph, and
/// stamp each document with the newest script modtime.
fn create_cyoa_documents(
    layout: &Layout,
    config: &SiteConfig,
) -> Result<Vec<Document>, SiteError> {
    let cyoa_dir = layout.cyoa_dir();
    let mut files = Vec::new();
    let mut modtime = SystemTime::UNIX_EPOCH;

    if cyoa_dir.is_dir() {
        for entry in WalkDir::new(&cyoa_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !valid_input_file(&file_name) {
                continue;
            }
            // Scripts are addressed by their path relative to cyoa/, so
            // scripts in subdirectories get namespaced names.
            let rel_name = entry
                .path()
                .strip_prefix(&cyoa_dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            files.push((rel_name, fs::read_to_string(entry.path())?));
            modtime = modtime.max(fs::metadata(entry.path())?.modified()?);
        }
    }

    if files.is_empty() {
        return Ok(Vec::new());
    }

    let game = GameData::from_files(&files, &config.start_location, config.outline_marker)?;
    let mut docs = game.make_documents(layout)?;
    for d in &mut docs {
        d.modtime = modtime;
    }
    Ok(docs)
}

/// Ensure the fixed output subtrees exist.
pub fn create_directories(layout: &Layout) -> std::io::Result<()> {
    fs::create_dir_all(layout.output_dir())?;
    fs::create_dir_all(layout.output_generated_dir())?;
    fs::create_dir_all(layout.output_resources_dir())?;
    Ok(())
}

/// Conflict-check the whole batch, then render and write each document.
///
/// With `only_recent`, documents whose modtime falls outside the recent
/// window are skipped — the conflict check still covers the full batch, so
/// a partial run can never paper over a duplicate target.
pub fn process_all(
    docs: &mut [Document],
    renderer: &dyn Render,
    layout: &Layout,
    config: &SiteConfig,
    only_recent: bool,
) -> Result<(), SiteError> {
    document::check_target_conflicts(docs)?;

    let cutoff = SystemTime::now() - Duration::from_secs(config.recent_days * 24 * 60 * 60);

    for d in docs.iter_mut() {
        if only_recent && d.modtime <= cutoff {
            continue;
        }

        let shown_target = d
            .target_path
            .strip_prefix(layout.output_dir())
            .unwrap_or(&d.target_path);
        println!("Processing {} -> {}", d.name, shown_target.display());

        if d.is_markdown {
            let source = d.source_data.as_deref().unwrap_or_default();
            d.target_data = Some(renderer.render(source, true, &d.template, &d.variables)?);
        }
        d.save(config.gzip_min_bytes)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use tempfile::TempDir;

    /// Stands in for pandoc: wraps the source so tests can see that the
    /// template and variables arrived.
    struct FakeRenderer;

    impl Render for FakeRenderer {
        fn render(
            &self,
            source: &str,
            _is_markdown: bool,
            template: &Path,
            variables: &[(String, Option<String>)],
        ) -> Result<Vec<u8>, RenderError> {
            let vars: Vec<String> = variables
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => format!("{k}={v}"),
                    None => k.clone(),
                })
                .collect();
            Ok(format!(
                "<!-- {} | {} -->\n{source}",
                template.display(),
                vars.join(";")
            )
            .into_bytes())
        }
    }

    fn fixture_site() -> (TempDir, Layout) {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(&tmp.path().join("input"), &tmp.path().join("www"));

        let main = layout.main_dir();
        fs::create_dir_all(main.join("essays")).unwrap();
        fs::write(main.join("essays/cats.md"), "# Cats\n\nAll about cats.\n").unwrap();
        fs::write(main.join("style.css"), "body { margin: 0 }\n").unwrap();
        fs::write(main.join("notes.blog"), "@2020 01 05\nHello\n@2020 01 05\nAgain\n").unwrap();
        fs::write(main.join("scratch.swp"), "ignored\n").unwrap();

        let cyoa = layout.cyoa_dir();
        fs::create_dir_all(&cyoa).unwrap();
        fs::write(
            cyoa.join("menu"),
            ";start\nWelcome\n;;end\nFinish\n;end\nDone\n",
        )
        .unwrap();

        (tmp, layout)
    }

    #[test]
    fn create_documents_covers_all_families() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        let docs = create_documents(&layout, &config, Selection::all()).unwrap();

        // Pages: cats + style.css. Blog: 2 posts + compact index + one year
        // index. Cyoa: 2 locations + redirect index.
        assert_eq!(docs.len(), 9);
        assert!(docs.iter().any(|d| d.name == "cats"));
        assert!(docs.iter().any(|d| d.name == "style.css"));
        assert!(docs.iter().any(|d| d.name == "20200105a"));
        assert!(docs.iter().any(|d| d.name == "20200105b"));
        assert!(docs.iter().any(|d| d.name == "index.html"));
        assert!(!docs.iter().any(|d| d.name.contains("swp")));
    }

    #[test]
    fn selection_limits_document_families() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        let selection = Selection {
            blog: true,
            cyoa: false,
            pages: false,
        };
        let docs = create_documents(&layout, &config, selection).unwrap();
        assert_eq!(docs.len(), 4);
        assert!(docs.iter().all(|d| d.target_path.starts_with(layout.output_blog_dir())));
    }

    #[test]
    fn hide_files_are_skipped() {
        let (_tmp, layout) = fixture_site();
        fs::write(layout.main_dir().join("secret.hide"), "nope").unwrap();
        let config = SiteConfig::default();
        let docs = create_documents(&layout, &config, Selection::all()).unwrap();
        assert!(!docs.iter().any(|d| d.name.contains("secret")));
    }

    #[test]
    fn process_all_renders_markdown_and_copies_resources() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        let mut docs = create_documents(&layout, &config, Selection::all()).unwrap();
        create_directories(&layout).unwrap();
        process_all(&mut docs, &FakeRenderer, &layout, &config, false).unwrap();

        let cats = fs::read_to_string(layout.output_dir().join("essays/cats")).unwrap();
        assert!(cats.contains("template.html"));
        assert!(cats.contains("relroot=.."));
        assert!(cats.contains("All about cats."));

        let css = fs::read_to_string(layout.output_resources_dir().join("style.css")).unwrap();
        assert_eq!(css, "body { margin: 0 }\n");

        assert!(layout.blog_target_path("20200105a").exists());
        assert!(layout.output_cyoa_index().exists());
    }

    #[test]
    fn duplicate_targets_abort_before_any_write() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        // Two resources with the same basename collide in /r.
        fs::create_dir_all(layout.main_dir().join("other")).unwrap();
        fs::write(layout.main_dir().join("other/style.css"), "dup").unwrap();

        let mut docs = create_documents(&layout, &config, Selection::all()).unwrap();
        create_directories(&layout).unwrap();
        let err = process_all(&mut docs, &FakeRenderer, &layout, &config, false).unwrap_err();
        assert!(matches!(
            err,
            SiteError::Document(DocumentError::DuplicateTarget(_))
        ));
        // The conflict check runs before any render or save.
        assert!(!layout.blog_target_path("20200105a").exists());
    }

    #[test]
    fn recent_skips_old_documents() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        let mut docs = create_documents(&layout, &config, Selection::all()).unwrap();
        // Pretend everything was built long ago.
        for d in docs.iter_mut() {
            d.modtime = SystemTime::UNIX_EPOCH;
        }
        create_directories(&layout).unwrap();
        process_all(&mut docs, &FakeRenderer, &layout, &config, true).unwrap();
        assert!(!layout.blog_target_path("20200105a").exists());
    }

    #[test]
    fn cyoa_documents_share_the_newest_script_modtime() {
        let (_tmp, layout) = fixture_site();
        let config = SiteConfig::default();
        let docs = create_documents(
            &layout,
            &config,
            Selection {
                blog: false,
                cyoa: true,
                pages: false,
            },
        )
        .unwrap();
        assert_eq!(docs.len(), 3);
        let expected = fs::metadata(layout.cyoa_dir().join("menu"))
            .unwrap()
            .modified()
            .unwrap();
        assert!(docs.iter().all(|d| d.modtime == expected));
    }

    #[test]
    fn missing_input_directories_yield_empty_batch() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(&tmp.path().join("input"), &tmp.path().join("www"));
        let config = SiteConfig::default();
        let docs = create_documents(&layout, &config, Selection::all()).unwrap();
        // No main/, no cyoa/ — the blog still emits its empty compact index.
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "index.html.md");
    }
}
