//! Blog post parsing, chronological ordering, and index generation.
//!
//! Blog source files (`*.blog`) hold any number of posts. A post starts at a
//! header block — consecutive lines beginning with `@` — and runs until the
//! next header block:
//!
//! ```text
//! @2020 01 05
//! @tag facebook
//! First line of the post body.
//! ```
//!
//! Header grammar is `<keyword> <rest>`, with one shorthand: a keyword
//! starting with `20` makes the whole line a date header, so dated posts need
//! no `date` keyword. Recognized keywords are `date` (three integer tokens:
//! year month day), `tag`, and `title`; anything else is logged and ignored.
//!
//! Ordering is where the edge cases live. Published posts are sorted
//! ascending by date with a stable sort, so posts sharing a date keep the
//! order they appeared in their source file. Neighbors are then linked for
//! prev/next navigation, and same-date runs get single-letter slug suffixes
//! (`20210601a`, `20210601b`, ...) so every post has a distinct URL.
//!
//! Files exported from social platforms (name contains `facebook` or
//! `gtalk`) get that tag on every post and their body lines pass through
//! [`auto_link`], which rewrites bare URLs into image embeds or labeled
//! links.

use crate::document::{Document, DocumentError};
use crate::layout::Layout;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("malformed date header {header:?} in {file}: expected 'year month day'")]
    MalformedDateHeader { file: String, header: String },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Posts with this tag are excluded from the published sequence entirely.
const HIDDEN_TAG: &str = "hidden";

/// Header sigil marking header lines in blog source files.
const HEADER_SIGIL: char = '@';

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Tags with a human-readable rendering, in tagline display order.
const TAG_DISPLAY: [(&str, &str); 3] = [
    ("facebook", "originally posted on facebook"),
    ("gtalk", "originally shared via google talk"),
    (
        "notgtalk",
        "not actually shared via google talk but tagged like it for weird technical reasons",
    ),
];

/// Domain substring → display name for [`auto_link`]. First match wins, in
/// table order, so more specific entries belong earlier.
const LINK_NAMES: [(&str, &str); 17] = [
    ("wikipedia.org", "Wikipedia"),
    ("theguardian.com", "The Guardian"),
    ("bbc.com", "BBC"),
    ("bbc.co.uk", "BBC"),
    ("telegraph.co.uk", "The Telegraph"),
    ("nytimes.com", "NYT"),
    ("slate.com", "Slate"),
    ("washingtonpost.com", "Washington Post"),
    ("newyorker.com", "The New Yorker"),
    ("theatlantic.com", "The Atlantic"),
    ("pnas.org", "PNAS"),
    ("youtube.com", "YouTube"),
    ("vox.com", "Vox"),
    ("lawfareblog.com", "Lawfare"),
    ("openargs.com", "Opening Arguments"),
    ("fivethirtyeight.com", "538"),
    ("cnn.com", "CNN"),
];

const COLLISION_SUFFIXES: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Characters escaped by [`escape_markdown`].
const MARKDOWN_ESCAPES: &str = "\\`*_{}[]()<>#+-.!$%^&=|:;\"',/~";

/// A calendar date triple. Ordering is derived field order: year, month, day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Date { year, month, day }
    }

    /// `YYYYMMDD`, the basis for post slugs.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    fn month_name(&self) -> &'static str {
        MONTHS[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// `2020 January 05`
    pub fn human(&self) -> String {
        format!("{:04} {} {:02}", self.year, self.month_name(), self.day)
    }

    /// `January 05` — used where the year is clear from context.
    pub fn human_short(&self) -> String {
        format!("{} {:02}", self.month_name(), self.day)
    }
}

/// A published blog post. Mutated once by [`Blog::sort_and_name`], which
/// fills in `older`, `newer`, and `slug`; immutable afterward.
#[derive(Debug, Clone)]
pub struct Post {
    pub date: Date,
    pub title: Option<String>,
    /// Insertion order preserved; no dedup.
    pub tags: Vec<String>,
    pub body: String,
    pub modtime: SystemTime,
    /// Index of the chronologically previous post in [`Blog::posts`].
    pub older: Option<usize>,
    /// Index of the chronologically next post in [`Blog::posts`].
    pub newer: Option<usize>,
    /// `compact date + collision suffix`; empty until posts are named.
    pub slug: String,
}

impl Post {
    /// Known tags rendered in display order, comma-joined.
    pub fn tagline(&self) -> String {
        TAG_DISPLAY
            .iter()
            .filter(|(tag, _)| self.tags.iter().any(|t| t == tag))
            .map(|(_, display)| *display)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One parsed header line.
enum Header<'a> {
    Date(&'a str),
    Tag(&'a str),
    Title(&'a str),
    Unrecognized { keyword: &'a str, rest: &'a str },
}

fn classify_header(line: &str) -> Header<'_> {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };
    // Year shorthand: `@2020 01 05` is a date header with no keyword.
    if keyword.starts_with("20") {
        return Header::Date(line);
    }
    match keyword {
        "date" => Header::Date(rest),
        "tag" => Header::Tag(rest),
        "title" => Header::Title(rest),
        _ => Header::Unrecognized { keyword, rest },
    }
}

fn parse_date(data: &str, file: &str, header: &str) -> Result<Date, BlogError> {
    let malformed = || BlogError::MalformedDateHeader {
        file: file.to_string(),
        header: header.to_string(),
    };
    let tokens: Vec<&str> = data.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(malformed());
    }
    Ok(Date::new(
        tokens[0].parse().map_err(|_| malformed())?,
        tokens[1].parse().map_err(|_| malformed())?,
        tokens[2].parse().map_err(|_| malformed())?,
    ))
}

/// Rewrite a body line that is a bare URL into markdown.
///
/// Image URLs (`.png`/`.jpg`/`.jpeg`, but never Wikipedia) become embedded
/// images; known domains become labeled links via [`LINK_NAMES`]; anything
/// else becomes a `<url>` autolink. Lines not starting with `http` pass
/// through unchanged.
pub fn auto_link(line: &str) -> String {
    if !line.starts_with("http") {
        return line.to_string();
    }

    let (url, rest) = match line.split_once(char::is_whitespace) {
        Some((url, rest)) => (url, format!(" {}", rest.trim_start())),
        None => (line, String::new()),
    };

    let lower = url.to_lowercase();
    let is_image = (lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg"))
        && !lower.contains("wikipedia");

    if is_image {
        if rest.is_empty() {
            return format!("![]({url}){{.image_center}}");
        }
        return format!("![]({url}){{.image}}{rest}");
    }

    for (domain, display) in LINK_NAMES {
        if url.contains(domain) {
            return format!("[{display}]({url}){rest}");
        }
    }
    format!("<{url}>{rest}")
}

/// Backslash-escape markdown punctuation so raw body text can appear inside
/// index tables without triggering formatting.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_ESCAPES.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The whole blog: posts in publication order once sorted, plus the year
/// index.
#[derive(Debug, Default)]
pub struct Blog {
    pub posts: Vec<Post>,
    /// Distinct years of surviving posts, descending. Filled by
    /// [`Blog::sort_and_name`].
    pub years: Vec<i32>,
    pub modtime: Option<SystemTime>,
}

impl Blog {
    pub fn new() -> Self {
        Blog::default()
    }

    /// Parse one blog source file into posts.
    ///
    /// `name` is the source file name — it drives social auto-tagging.
    /// Posts without a date header are logged and dropped; a malformed date
    /// header aborts the whole file with its context logged.
    pub fn read_source(
        &mut self,
        name: &str,
        content: &str,
        modtime: SystemTime,
    ) -> Result<(), BlogError> {
        self.modtime = Some(self.modtime.map_or(modtime, |m| m.max(modtime)));

        let is_facebook = name.contains("facebook");
        let is_gtalk = name.contains("gtalk");
        let is_social = is_facebook || is_gtalk;

        let lines: Vec<&str> = content.split('\n').collect();

        // A block starts at every transition into header mode: a sigil line
        // whose predecessor is not a sigil line.
        let mut blocks: Vec<&[&str]> = Vec::new();
        let mut start = 0;
        for i in 1..lines.len() {
            if lines[i].starts_with(HEADER_SIGIL) && !lines[i - 1].starts_with(HEADER_SIGIL) {
                blocks.push(&lines[start..i]);
                start = i;
            }
        }
        blocks.push(&lines[start..]);

        for block in blocks {
            let mut headers = Vec::new();
            let mut body_lines = Vec::new();
            for line in block {
                if line.starts_with(HEADER_SIGIL) {
                    let header = line.trim_start_matches(HEADER_SIGIL).trim();
                    if !header.is_empty() {
                        headers.push(header);
                    }
                } else if is_social {
                    body_lines.push(auto_link(line));
                } else {
                    body_lines.push(line.to_string());
                }
            }

            let body = body_lines.join("\n").trim().to_string();
            if body.is_empty() {
                continue;
            }

            let mut date = None;
            let mut title = None;
            let mut tags = Vec::new();
            for header in &headers {
                match classify_header(header) {
                    Header::Date(data) => {
                        date = Some(parse_date(data, name, header).inspect_err(|_| {
                            eprintln!(">>{}<<>>{}<<", headers.join("@"), body);
                        })?);
                    }
                    Header::Tag(tag) => tags.push(tag.to_string()),
                    // Last occurrence wins when repeated.
                    Header::Title(t) => title = Some(t.to_string()),
                    Header::Unrecognized { keyword, rest } => {
                        eprintln!("Unrecognized header command '{keyword}' with data '{rest}'");
                    }
                }
            }
            if is_facebook {
                tags.push("facebook".to_string());
            }
            if is_gtalk {
                tags.push("gtalk".to_string());
            }

            let Some(date) = date else {
                eprintln!("Blog post missing date!");
                eprintln!(">>{}<<>>{}<<", headers.join("@"), body);
                continue;
            };

            self.posts.push(Post {
                date,
                title,
                tags,
                body,
                modtime,
                older: None,
                newer: None,
                slug: String::new(),
            });
        }

        Ok(())
    }

    /// Order posts, link neighbors, and assign slugs.
    ///
    /// Hidden posts are dropped first, before sorting and linking. The sort
    /// is stable and ascending by date, so posts sharing a date keep their
    /// source-file order — which is why same-date posts should live in the
    /// same input file.
    pub fn sort_and_name(&mut self) {
        self.posts.retain(|p| !p.tags.iter().any(|t| t == HIDDEN_TAG));
        self.posts.sort_by_key(|p| p.date);

        let n = self.posts.len();
        let mut collides_with_next = vec![false; n];
        for i in 0..n.saturating_sub(1) {
            self.posts[i].newer = Some(i + 1);
            self.posts[i + 1].older = Some(i);
            collides_with_next[i] = self.posts[i].date == self.posts[i + 1].date;
        }

        // Suffix runs of identical dates `a`, `b`, `c`, ... continuing
        // across the whole run and resetting at each non-colliding boundary.
        let mut suffixes = vec![String::new(); n];
        let mut collision_index = 0;
        for i in 0..n.saturating_sub(1) {
            if collides_with_next[i] {
                suffixes[i] = (COLLISION_SUFFIXES[collision_index] as char).to_string();
                suffixes[i + 1] = (COLLISION_SUFFIXES[collision_index + 1] as char).to_string();
                collision_index += 1;
            } else {
                collision_index = 0;
            }
        }

        for (post, suffix) in self.posts.iter_mut().zip(&suffixes) {
            post.slug = format!("{}{}", post.date.compact(), suffix);
        }

        self.years.clear();
        for post in &self.posts {
            if !self.years.contains(&post.date.year) {
                self.years.push(post.date.year);
            }
        }
        self.years.sort_unstable_by(|a, b| b.cmp(a));
    }

    fn post_document(&self, index: usize, layout: &Layout) -> Result<Document, BlogError> {
        let post = &self.posts[index];

        let mut d = Document::new(&post.slug);
        d.source_data = Some(post.body.clone());
        d.set_target_path(&layout.blog_target_path(&post.slug), layout)?;
        d.is_markdown = true;
        d.template = layout.template_blog();

        let date_human = post.date.human();
        match &post.title {
            Some(title) => {
                d.add_variable("pagetitle", title);
                d.add_variable("title", title);
            }
            None => d.add_variable("pagetitle", &date_human),
        }
        d.add_variable("date-human", &date_human);
        if !post.tags.is_empty() {
            d.add_variable("tagline", &post.tagline());
        }

        // Neighbor slugs are embedded in the page, so a neighbor edit must
        // count as a modification of this page too.
        d.modtime = post.modtime;
        if let Some(newer) = post.newer {
            d.add_variable("newer", &self.posts[newer].slug);
            d.modtime = d.modtime.max(self.posts[newer].modtime);
        }
        if let Some(older) = post.older {
            d.add_variable("older", &self.posts[older].slug);
            d.modtime = d.modtime.max(self.posts[older].modtime);
        }

        Ok(d)
    }

    /// The blog landing page: per-year tables of dated one-line teases,
    /// newest year first.
    fn make_index_compact(&self, layout: &Layout) -> Result<Document, BlogError> {
        let mut markdown = Vec::new();

        let year_links: Vec<String> = self
            .years
            .iter()
            .map(|y| format!("[{y}](#year_{y})"))
            .collect();
        markdown.push(year_links.join(" "));
        markdown.push(String::new());

        for &year in &self.years {
            markdown.push(format!("## [{year}](index_{year}) {{#year_{year}}}"));
            markdown.push(String::new());
            markdown.push("|  |  |".to_string());
            markdown.push(format!("|{}:|:{}|", "-".repeat(12), "-".repeat(80)));
            for post in self.posts.iter().rev() {
                if post.date.year != year {
                    continue;
                }
                let date = post.date.human_short();
                let tease = match &post.title {
                    Some(title) => title.clone(),
                    None => {
                        let flat: String = post.body.replace('\n', " ").chars().take(70).collect();
                        escape_markdown(&flat)
                    }
                };
                markdown.push(format!(
                    "|[{date}]({slug}){{.indexdate}}|[{tease}]({slug}){{.tease}}|",
                    slug = post.slug
                ));
            }
            markdown.push(String::new());
        }

        let mut d = Document::new("index.html.md");
        d.source_data = Some(markdown.join("\n"));
        d.set_target_path(&layout.output_blog_index(), layout)?;
        if let Some(modtime) = self.modtime {
            d.modtime = modtime;
        }
        d.is_markdown = true;
        d.template = layout.template_blog_index_compact();
        d.add_variable("pagetitle", "Blog");
        Ok(d)
    }

    /// One page per year with every post body inlined, newest first.
    fn make_index_expanded(&self, year: i32, layout: &Layout) -> Result<Document, BlogError> {
        let mut markdown = Vec::new();
        let mut modtime = SystemTime::UNIX_EPOCH;

        for post in self.posts.iter().rev() {
            if post.date.year != year {
                continue;
            }
            let date = post.date.human();
            match &post.title {
                Some(title) => {
                    markdown.push(format!("## [{title}]({})", post.slug));
                    markdown.push(String::new());
                    markdown.push(format!("[{date}]{{.date}}"));
                    markdown.push(String::new());
                }
                None => {
                    markdown.push(format!("## [{date}]({})", post.slug));
                    markdown.push(String::new());
                }
            }
            if !post.tags.is_empty() {
                markdown.push(format!("[{}]{{.tagline}}", post.tagline()));
                markdown.push(String::new());
            }
            markdown.push(post.body.clone());
            markdown.push(String::new());

            modtime = modtime.max(post.modtime);
        }

        let mut d = Document::new(&format!("index_{year}.md"));
        d.source_data = Some(markdown.join("\n"));
        d.set_target_path(&layout.blog_index_expanded_path(year), layout)?;
        d.modtime = modtime;
        d.is_markdown = true;
        d.template = layout.template_blog_index_expanded();
        d.add_variable("pagetitle", &format!("Blog - {year}"));
        if self.years.contains(&(year + 1)) {
            d.add_variable("newer", &format!("index_{}", year + 1));
        }
        if self.years.contains(&(year - 1)) {
            d.add_variable("older", &format!("index_{}", year - 1));
        }
        Ok(d)
    }

    /// Sort, name, and assemble every blog document: one per post, the
    /// compact index, and one expanded index per year.
    pub fn create_documents(&mut self, layout: &Layout) -> Result<Vec<Document>, BlogError> {
        self.sort_and_name();

        let mut docs = Vec::new();
        for index in 0..self.posts.len() {
            docs.push(self.post_document(index, layout)?);
        }
        docs.push(self.make_index_compact(layout)?);
        for &year in &self.years {
            docs.push(self.make_index_expanded(year, layout)?);
        }
        Ok(docs)
    }
}
