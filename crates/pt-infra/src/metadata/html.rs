use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(meta|link)\b([^>]*)>").expect("valid tag regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid attribute regex")
});
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// What a page says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    /// Raw `href` of the preferred icon link, unresolved.
    pub icon_href: Option<String>,
}

/// Extracts title and icon link from an HTML document.
///
/// `og:title` wins over `<title>`. Among icon links a plain `icon` beats
/// `apple-touch-icon` and friends.
pub fn parse_page(html: &str) -> PageMetadata {
    let mut og_title = None;
    let mut icon_href = None;
    let mut fallback_icon_href = None;

    for tag in TAG_RE.captures_iter(html) {
        let name = tag[1].to_ascii_lowercase();
        let attrs = attributes(&tag[2]);
        let attr = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };

        match name.as_str() {
            "meta" if og_title.is_none() => {
                let is_og_title = attr("property")
                    .or_else(|| attr("name"))
                    .is_some_and(|p| p.eq_ignore_ascii_case("og:title"));
                if is_og_title {
                    og_title = attr("content").and_then(clean_text);
                }
            }
            "link" => {
                let (Some(rel), Some(href)) = (attr("rel"), attr("href")) else {
                    continue;
                };
                let rels: Vec<String> = rel.split_whitespace().map(str::to_ascii_lowercase).collect();
                if icon_href.is_none() && rels.iter().any(|r| r == "icon") {
                    icon_href = Some(href.trim().to_string());
                } else if fallback_icon_href.is_none() && rels.iter().any(|r| r.contains("icon")) {
                    fallback_icon_href = Some(href.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let title = og_title.or_else(|| {
        TITLE_RE
            .captures(html)
            .and_then(|c| clean_text(&c[1]))
    });

    PageMetadata {
        title,
        icon_href: icon_href.or(fallback_icon_href),
    }
}

fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (c[1].to_string(), value.to_string())
        })
        .collect()
}

/// Decodes entities and collapses whitespace. Blank text becomes `None`.
fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_entities(raw);
    let collapsed = WHITESPACE_RE.replace_all(decoded.trim(), " ");
    (!collapsed.is_empty()).then(|| collapsed.into_owned())
}

fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |c: &Captures| {
            let entity = &c[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| c[0].to_string(), String::from)
        })
        .into_owned()
}
