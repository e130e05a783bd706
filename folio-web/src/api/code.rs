//! Code viewer
//!
//! `GET /code/:filename` renders a file from the configured code root as a
//! highlight.js page with line numbers. Only direct children of the root are
//! reachable.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use std::path::Path as FsPath;
use tracing::debug;

use super::error::ApiError;
use super::site::found;
use crate::html::escape;
use crate::AppState;

const NOT_FOUND_TEXT: &str = "File does not exist.";

const PAGE_TEMPLATE: &str = r#"<html>
<head>
    <title>viewing {{FILENAME}}</title>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js"></script>
    <script src="//cdnjs.cloudflare.com/ajax/libs/highlightjs-line-numbers.js/2.9.0/highlightjs-line-numbers.min.js"></script>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/base16/gigavolt.min.css">
    <script src="https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/languages/{{LANGUAGE}}.min.js"></script>
</head>

<style>
body {
  background-color: #202126;
  color: #ccc;
}

.hljs-ln-numbers {
    user-select: none;
    text-align: center;
    color: #ccc;
    border-right: 1px solid #CCC;
    vertical-align: top;
    padding-right: 3px !important;
}

.hljs-ln-line {
    padding-left: 10px !important;
    color: #ccc;
}
</style>

<script>hljs.highlightAll();hljs.initLineNumbersOnLoad();</script>

<body><pre><code class="language-{{LANGUAGE}}">{{CODE}}</code></pre></body>
</html>
"#;

/// highlight.js language for a file, by extension
pub fn language_for(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "md" => "markdown",
        "toml" => "ini",
        "yaml" => "yaml",
        "json" => "json",
        "css" => "css",
        _ => "plaintext",
    }
}

/// True for a bare file name that cannot leave the code root
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Full viewer page for `code`
pub fn render_page(filename: &str, language: &str, code: &str) -> String {
    // CODE last: file content must never be scanned for placeholders
    PAGE_TEMPLATE
        .replace("{{FILENAME}}", &escape(filename))
        .replace("{{LANGUAGE}}", language)
        .replace("{{CODE}}", &escape(code))
}

/// GET /code/:filename
pub async fn view_code(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::NotFound(NOT_FOUND_TEXT.to_string()));
    }

    let path = state.files.code_root.join(&filename);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound(NOT_FOUND_TEXT.to_string()));
    }

    // Binary or unreadable: let the plain file server handle it
    let content = match tokio::fs::read(&path).await.map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(_)) | Err(_) => {
            debug!("{} is not viewable as text, redirecting", path.display());
            return Ok(found(&format!("/{}", filename)));
        }
    };

    let language = language_for(&path);
    Ok(Html(render_page(&filename, language, &content)).into_response())
}
