//! Image galleries
//!
//! Every sub-directory of the gallery root is one gallery: image files plus
//! an optional `README.md` shown above them. The images themselves are
//! served by the front proxy under `/gallery/{folder}/{file}`; these
//! handlers only render the listings.

use axum::{
    extract::{Path, State},
    response::Html,
};
use rand::seq::SliceRandom;
use std::io;
use std::path::Path as FsPath;
use tracing::warn;

use super::error::ApiError;
use super::run_blocking;
use crate::html::{escape, page};
use crate::markdown;
use crate::AppState;

const README: &str = "README.md";

/// One image inside a gallery folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub filename: String,
    pub url: String,
}

/// A gallery folder with its rendered README
#[derive(Debug, Clone)]
pub struct GalleryFolder {
    pub name: String,
    pub readme_html: String,
    pub thumbnail: Option<GalleryImage>,
}

/// Gallery folder names must be non-empty and purely alphanumeric
pub fn is_gallery_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(char::is_alphanumeric)
}

/// Images in `folder`, newest first (reverse name order), README excluded
pub fn list_images(folder: &FsPath, folder_name: &str) -> io::Result<Vec<GalleryImage>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        // Non-UTF-8 names cannot be linked
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name != README {
            names.push(name);
        }
    }
    names.sort_unstable_by(|a, b| b.cmp(a));

    Ok(names
        .into_iter()
        .map(|filename| GalleryImage {
            url: format!("/gallery/{}/{}", folder_name, urlencoding::encode(&filename)),
            filename,
        })
        .collect())
}

/// Rendered `README.md` of a folder, empty when there is none
pub fn readme_html(folder: &FsPath) -> io::Result<String> {
    let path = folder.join(README);
    if !path.is_file() {
        return Ok(String::new());
    }
    Ok(markdown::render(&std::fs::read_to_string(path)?))
}

/// Every reachable gallery under `root`, by name, each with a random thumbnail
///
/// A missing root is an empty index.
pub fn scan_galleries(root: &FsPath) -> io::Result<Vec<GalleryFolder>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if is_gallery_name(&name) => names.push(name),
            _ => {}
        }
    }
    names.sort_unstable();

    let mut rng = rand::thread_rng();
    names
        .into_iter()
        .map(|name| -> io::Result<GalleryFolder> {
            let folder = root.join(&name);
            let images = list_images(&folder, &name)?;
            Ok(GalleryFolder {
                readme_html: readme_html(&folder)?,
                thumbnail: images.choose(&mut rng).cloned(),
                name,
            })
        })
        .collect()
}

fn image_tag(image: &GalleryImage) -> String {
    format!(
        "<a href=\"{url}\"><img src=\"{url}\" alt=\"{alt}\" loading=\"lazy\"></a>",
        url = escape(&image.url),
        alt = escape(&image.filename)
    )
}

/// Index page listing every gallery
pub fn render_index(folders: &[GalleryFolder]) -> String {
    let mut body = String::from("<h1>Gallery</h1>\n");
    for folder in folders {
        body.push_str(&format!(
            "<section class=\"gallery\">\n<h2><a href=\"/gallery/{name}\">{name}</a></h2>\n",
            name = escape(&folder.name)
        ));
        if let Some(thumbnail) = &folder.thumbnail {
            body.push_str(&image_tag(thumbnail));
            body.push('\n');
        }
        body.push_str(&folder.readme_html);
        body.push_str("</section>\n");
    }
    page("Gallery", &body)
}

/// Page for one gallery: README then every image
pub fn render_folder(name: &str, readme_html: &str, images: &[GalleryImage]) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n{}\n<div class=\"images\">\n",
        escape(name),
        readme_html
    );
    for image in images {
        body.push_str(&image_tag(image));
        body.push('\n');
    }
    body.push_str("</div>");
    page(name, &body)
}

fn scan_error(context: &str, e: io::Error) -> ApiError {
    warn!("{}: {}", context, e);
    ApiError::Internal("Failed to read gallery.".to_string())
}

/// GET /gallery
pub async fn gallery_index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let root = state.files.gallery_dir.clone();
    let folders = run_blocking(move || {
        scan_galleries(&root).map_err(|e| scan_error("Gallery index scan failed", e))
    })
    .await?;
    Ok(Html(render_index(&folders)))
}

/// GET /gallery/:folder
pub async fn gallery_folder(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    if !is_gallery_name(&name) {
        return Err(ApiError::NotFound("404 not found.".to_string()));
    }

    let folder = state.files.gallery_dir.join(&name);
    let html = run_blocking(move || {
        if !folder.is_dir() {
            return Err(ApiError::NotFound("404 not found.".to_string()));
        }
        let images =
            list_images(&folder, &name).map_err(|e| scan_error("Gallery folder scan failed", e))?;
        let readme =
            readme_html(&folder).map_err(|e| scan_error("Gallery README read failed", e))?;
        Ok(render_folder(&name, &readme, &images))
    })
    .await?;
    Ok(Html(html))
}
