//! Weblog
//!
//! Posts live under the weblog root as `{YYYY}/{MM}-{DD}-{title}.md`. The
//! index lists every year newest first; a year page lists that year's
//! posts; a post URL drops the `.md`. A post URL whose title does not match
//! redirects to the first post of that day.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use regex::Regex;
use std::io;
use std::path::Path as FsPath;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::error::ApiError;
use super::run_blocking;
use super::site::found;
use crate::html::{escape, page};
use crate::markdown;
use crate::AppState;

/// `MM-DD`, an optional `-title` of word characters and dashes, an optional `.md`
fn post_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<month>\d{2})-(?P<day>\d{2})(?:-(?P<title>[\w\-]+))?(?:\.md)?$")
            .expect("post name pattern is valid")
    })
}

/// Parts of a post file name or URL segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostName {
    pub month: String,
    pub day: String,
    /// Raw dashed title, if any
    pub title: Option<String>,
}

impl PostName {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = post_name_re().captures(name)?;
        Some(Self {
            month: caps["month"].to_string(),
            day: caps["day"].to_string(),
            title: caps.name("title").map(|m| m.as_str().to_string()),
        })
    }

    /// URL segment without the `.md`
    pub fn slug(&self) -> String {
        match &self.title {
            Some(title) => format!("{}-{}-{}", self.month, self.day, title),
            None => format!("{}-{}", self.month, self.day),
        }
    }

    /// Human title: dashes to spaces, each word capitalized
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .map(|t| title_case(&t.replace('-', " ")))
            .unwrap_or_default()
    }
}

/// Capitalize the first letter after every non-letter, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if prev_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// A year folder name: exactly four ASCII digits
pub fn is_year(name: &str) -> bool {
    name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit())
}

/// One listed post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeblogPost {
    pub date: String,
    pub title: String,
    pub href: String,
}

impl WeblogPost {
    fn new(year: &str, name: &PostName) -> Self {
        Self {
            date: format!("{}-{}-{}", year, name.month, name.day),
            title: name.display_title(),
            href: format!("/weblog/{}/{}", year, name.slug()),
        }
    }
}

/// Posts of one year, newest first
#[derive(Debug, Clone)]
pub struct WeblogYear {
    pub year: String,
    pub posts: Vec<WeblogPost>,
}

/// File names directly inside `folder`, sorted descending
fn file_names_desc(folder: &FsPath) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Posts in one year folder; files not named like a post are skipped
pub fn posts_in(folder: &FsPath, year: &str) -> io::Result<Vec<WeblogPost>> {
    Ok(file_names_desc(folder)?
        .iter()
        .filter_map(|name| PostName::parse(name))
        .map(|name| WeblogPost::new(year, &name))
        .collect())
}

/// Every year with at least one post, newest first
///
/// A missing root is an empty weblog.
pub fn scan_weblog(root: &FsPath) -> io::Result<Vec<WeblogYear>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut years = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if is_year(&name) => years.push(name),
            _ => {}
        }
    }
    years.sort_unstable_by(|a, b| b.cmp(a));

    let mut out = Vec::new();
    for year in years {
        let posts = posts_in(&root.join(&year), &year)?;
        if !posts.is_empty() {
            out.push(WeblogYear { year, posts });
        }
    }
    Ok(out)
}

/// First post file of `month`-`day` in `folder`, as a URL slug
pub fn same_day_slug(folder: &FsPath, month: &str, day: &str) -> io::Result<Option<String>> {
    let prefix = format!("{}-{}", month, day);
    let mut names = file_names_desc(folder)?;
    names.reverse();
    Ok(names
        .iter()
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".md"))
        .find_map(|name| PostName::parse(name))
        .map(|post| post.slug()))
}

/// Listing page for some years
pub fn render_index(years: &[WeblogYear]) -> String {
    let mut body = String::from("<h1>Weblog</h1>\n");
    for year in years {
        body.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(&year.year)));
        for post in &year.posts {
            body.push_str(&format!(
                "<li><time>{}</time> <a href=\"{}\">{}</a></li>\n",
                escape(&post.date),
                escape(&post.href),
                escape(&post.title)
            ));
        }
        body.push_str("</ul>\n");
    }
    page("Weblog", &body)
}

/// A single post page
pub fn render_post(post: &WeblogPost, content_html: &str) -> String {
    let body = format!(
        "<article>\n<h1>{}</h1>\n<time>{}</time>\n{}\n</article>",
        escape(&post.title),
        escape(&post.date),
        content_html
    );
    page(&post.title, &body)
}

fn not_found() -> ApiError {
    ApiError::NotFound("404 not found.".to_string())
}

fn read_error(e: io::Error) -> ApiError {
    warn!("Weblog read failed: {}", e);
    ApiError::Internal("Failed to read weblog.".to_string())
}

/// GET /weblog
pub async fn weblog_index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let root = state.files.weblog_dir.clone();
    let years = run_blocking(move || scan_weblog(&root).map_err(read_error)).await?;
    Ok(Html(render_index(&years)))
}

/// GET /weblog/:year
pub async fn weblog_year(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Html<String>, ApiError> {
    if !is_year(&year) {
        return Err(not_found());
    }
    let folder = state.files.weblog_dir.join(&year);

    let html = run_blocking(move || {
        if !folder.is_dir() {
            return Err(not_found());
        }
        let posts = posts_in(&folder, &year).map_err(read_error)?;
        Ok(render_index(&[WeblogYear { year, posts }]))
    })
    .await?;
    Ok(Html(html))
}

/// GET /weblog/:year/:post
pub async fn weblog_post(
    State(state): State<AppState>,
    Path((year, post)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if !is_year(&year) {
        return Err(not_found());
    }
    // The pattern admits only digits, word characters and dashes
    let name = PostName::parse(&post).ok_or_else(not_found)?;
    let folder = state.files.weblog_dir.join(&year);

    run_blocking(move || {
        if !folder.is_dir() {
            return Err(not_found());
        }

        let path = folder.join(format!("{}.md", post));
        if !path.is_file() {
            let slug = same_day_slug(&folder, &name.month, &name.day)
                .map_err(read_error)?
                .ok_or_else(not_found)?;
            debug!("No post {}/{}, redirecting to {}", year, post, slug);
            return Ok(found(&format!("/weblog/{}/{}", year, slug)));
        }

        let source = std::fs::read_to_string(&path).map_err(read_error)?;
        let entry = WeblogPost::new(&year, &name);
        Ok(Html(render_post(&entry, &markdown::render(&source))).into_response())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_post_name_pattern() {
        let name = PostName::parse("03-14-pi-day.md").unwrap();
        assert_eq!(name.month, "03");
        assert_eq!(name.day, "14");
        assert_eq!(name.title.as_deref(), Some("pi-day"));

        assert_eq!(PostName::parse("03-14-pi-day").unwrap().slug(), "03-14-pi-day");
        assert_eq!(PostName::parse("03-14.md").unwrap().title, None);
        assert_eq!(PostName::parse("03-14").unwrap().slug(), "03-14");

        let bad_names = ["3-14-x.md", "03-14-x.txt", "03-14-", "notes.md", "03-14-a.b.md", "../03-14"];
        for bad in bad_names {
            assert!(PostName::parse(bad).is_none(), "{}", bad);
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("my first post"), "My First Post");
        assert_eq!(title_case("HELLO wORLD"), "Hello World");
        let name = PostName::parse("01-02-new-year_plans").unwrap();
        assert_eq!(name.display_title(), "New Year_Plans");
    }

    #[test]
    fn test_year_names() {
        assert!(is_year("2024"));
        assert!(!is_year("24"));
        assert!(!is_year("20245"));
        assert!(!is_year("２０２４"));
        assert!(!is_year("drafts"));
    }

    #[test]
    fn test_scan_weblog_newest_first() {
        let root = tempfile::tempdir().unwrap();
        for year in ["2023", "2024", "2022", "drafts"] {
            fs::create_dir(root.path().join(year)).unwrap();
        }
        fs::write(root.path().join("2023/01-05-winter.md"), "a").unwrap();
        fs::write(root.path().join("2023/11-30-autumn-walk.md"), "b").unwrap();
        fs::write(root.path().join("2023/notes.txt"), "skip").unwrap();
        fs::write(root.path().join("2024/02-01-hello.md"), "c").unwrap();
        fs::write(root.path().join("drafts/05-05-wip.md"), "d").unwrap();

        let years = scan_weblog(root.path()).unwrap();
        let listed: Vec<_> = years.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(listed, ["2024", "2023"]);

        let posts = &years[1].posts;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].date, "2023-11-30");
        assert_eq!(posts[0].title, "Autumn Walk");
        assert_eq!(posts[0].href, "/weblog/2023/11-30-autumn-walk");
        assert_eq!(posts[1].href, "/weblog/2023/01-05-winter");
    }

    #[test]
    fn test_same_day_slug() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("07-04-fireworks.md"), "x").unwrap();
        fs::write(dir.path().join("07-04-photo.png"), "x").unwrap();
        fs::write(dir.path().join("07-05-after.md"), "x").unwrap();

        assert_eq!(
            same_day_slug(dir.path(), "07", "04").unwrap().as_deref(),
            Some("07-04-fireworks")
        );
        assert_eq!(same_day_slug(dir.path(), "08", "01").unwrap(), None);
    }
}
