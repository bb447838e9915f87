//! Placeholder substitution for content bodies.
//!
//! Bodies reference media by 1-based ordinal tokens such as `[이미지#2]`
//! (`[image#2]` is accepted as an alias). Each token becomes an embed for the
//! matching absolute media path; tokens that point past the end of the media
//! list are removed. Rendering never fails.
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Rendered body plus the media paths actually embedded, in token order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    pub used_paths: Vec<PathBuf>,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(?:이미지|image)#(\d+)\]").expect("regex for image placeholders")
    })
}

/// Substitute placeholder tokens in `body` with embeds for `media_paths`.
pub fn render(body: &str, media_paths: &[PathBuf]) -> Rendered {
    let mut used_paths = Vec::new();
    let rendered = placeholder_regex().replace_all(body, |caps: &Captures<'_>| {
        let slot = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| media_paths.get(idx));
        match slot {
            Some(path) => {
                used_paths.push(path.clone());
                embed_markup(path)
            }
            None => String::new(),
        }
    });
    Rendered {
        body: rendered.into_owned(),
        used_paths,
    }
}

fn embed_markup(path: &Path) -> String {
    format!(
        "<figure><img src=\"{}\" loading=\"lazy\" /></figure>",
        file_uri(path)
    )
}

/// Build a `file://` URI with percent-encoded path segments.
pub fn file_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let encoded = text
        .split('/')
        .enumerate()
        .map(|(idx, segment)| {
            if idx == 0 && is_drive_prefix(segment) {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Join sheet-relative media paths onto the image root.
///
/// A leading `/` on the relative path does not escape the root.
pub fn resolve_media_paths(image_root: &Path, rel_paths: &[String]) -> Vec<PathBuf> {
    rel_paths
        .iter()
        .map(|rel| image_root.join(rel.trim().trim_start_matches(['/', '\\'])))
        .collect()
}
