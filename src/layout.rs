//! Input and output tree layout.
//!
//! Everything the build reads lives under the input directory, everything it
//! writes under the output directory:
//!
//! ```text
//! input/                           # --source
//! ├── config.toml                  # Site configuration (optional)
//! ├── template.html                # Pandoc template for plain pages
//! ├── template_cyoa.html
//! ├── template_blog.html
//! ├── template_blog_index_compact.html
//! ├── template_blog_index_expanded.html
//! ├── main/                        # Pages, resources, *.blog files
//! └── cyoa/                        # Adventure game scripts
//!
//! www/                             # --output
//! ├── a/                           # Generated resources
//! ├── r/                           # Copied resources
//! ├── posts/                       # Blog posts and indexes
//! └── cyoa/                        # Game locations, addressed by unique id
//! ```

use std::path::{Path, PathBuf};

/// Resolved input/output directory layout for one build.
#[derive(Debug, Clone)]
pub struct Layout {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl Layout {
    pub fn new(input_dir: &Path, output_dir: &Path) -> Self {
        Layout {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pages, resources, and blog sources.
    pub fn main_dir(&self) -> PathBuf {
        self.input_dir.join("main")
    }

    /// Adventure game scripts.
    pub fn cyoa_dir(&self) -> PathBuf {
        self.input_dir.join("cyoa")
    }

    pub fn template_html(&self) -> PathBuf {
        self.input_dir.join("template.html")
    }

    pub fn template_cyoa(&self) -> PathBuf {
        self.input_dir.join("template_cyoa.html")
    }

    pub fn template_blog(&self) -> PathBuf {
        self.input_dir.join("template_blog.html")
    }

    pub fn template_blog_index_compact(&self) -> PathBuf {
        self.input_dir.join("template_blog_index_compact.html")
    }

    pub fn template_blog_index_expanded(&self) -> PathBuf {
        self.input_dir.join("template_blog_index_expanded.html")
    }

    /// Generated resources (equation images and the like): `/a`.
    pub fn output_generated_dir(&self) -> PathBuf {
        self.output_dir.join("a")
    }

    /// Verbatim-copied resources: `/r`.
    pub fn output_resources_dir(&self) -> PathBuf {
        self.output_dir.join("r")
    }

    pub fn output_cyoa_dir(&self) -> PathBuf {
        self.output_dir.join("cyoa")
    }

    pub fn output_cyoa_index(&self) -> PathBuf {
        self.output_cyoa_dir().join("index.html")
    }

    pub fn output_blog_dir(&self) -> PathBuf {
        self.output_dir.join("posts")
    }

    pub fn output_blog_index(&self) -> PathBuf {
        self.output_blog_dir().join("index.html")
    }

    pub fn blog_target_path(&self, name: &str) -> PathBuf {
        self.output_blog_dir().join(name)
    }

    pub fn cyoa_target_path(&self, name: &str) -> PathBuf {
        self.output_cyoa_dir().join(name)
    }

    pub fn blog_index_expanded_path(&self, year: i32) -> PathBuf {
        self.output_blog_dir().join(format!("index_{year}"))
    }
}
