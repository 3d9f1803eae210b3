use super::Gearbox;
use url::Url;

/// Upper production-year filter, as the site encodes it
pub const YEAR_TO_PARAM: &str = "search%5Bfilter_float_year%3Ato%5D";

/// Gearbox filter, as the site encodes it
pub const GEARBOX_PARAM: &str = "search%5Bfilter_enum_gearbox%5D";

/// Result page selector
pub const PAGE_PARAM: &str = "page";

/// Prefix of the path segment selecting the first production year
const YEAR_SEGMENT_PREFIX: &str = "od-";

/// Restricts a search URL to a single production year
///
/// The lower bound goes into the path right after the category segment
/// (`/osobowe/od-2022`), replacing any lower bound already present. The upper
/// bound is appended as a query filter only when the URL has none.
///
/// # Arguments
///
/// * `base` - Search URL with its encoded filters
/// * `year` - Production year to select
///
/// # Returns
///
/// A new URL; `base` is left untouched
pub fn with_year(base: &Url, year: i32) -> Url {
    let mut url = base.clone();

    let mut segments: Vec<String> = base
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty() && !is_year_segment(s))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let at = segments.len().min(1);
    segments.insert(at, format!("{}{}", YEAR_SEGMENT_PREFIX, year));
    url.set_path(&format!("/{}", segments.join("/")));

    if !has_param(&url, YEAR_TO_PARAM) {
        append_param(&mut url, YEAR_TO_PARAM, &year.to_string());
    }
    url
}

/// Adds (or replaces) the gearbox filter
pub fn with_gearbox(base: &Url, gearbox: Gearbox) -> Url {
    let mut url = base.clone();
    remove_param(&mut url, GEARBOX_PARAM);
    append_param(&mut url, GEARBOX_PARAM, gearbox.as_str());
    url
}

/// Selects result page `page`, replacing any page already selected
pub fn with_page(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    remove_param(&mut url, PAGE_PARAM);
    append_param(&mut url, PAGE_PARAM, &page.to_string());
    url
}

fn is_year_segment(segment: &str) -> bool {
    segment
        .strip_prefix(YEAR_SEGMENT_PREFIX)
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

// Query pairs are handled as raw text so the site's own percent-encoding of
// keys like `search%5B...%5D` survives unchanged.
fn raw_pairs(url: &Url) -> Vec<String> {
    url.query()
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map(|(k, _)| k).unwrap_or(pair)
}

fn has_param(url: &Url, key: &str) -> bool {
    raw_pairs(url).iter().any(|pair| pair_key(pair) == key)
}

fn remove_param(url: &mut Url, key: &str) {
    let kept: Vec<String> = raw_pairs(url)
        .into_iter()
        .filter(|pair| pair_key(pair) != key)
        .collect();
    set_pairs(url, &kept);
}

fn append_param(url: &mut Url, key: &str, value: &str) {
    let mut pairs = raw_pairs(url);
    pairs.push(format!("{}={}", key, value));
    set_pairs(url, &pairs);
}

fn set_pairs(url: &mut Url, pairs: &[String]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&pairs.join("&")));
    }
}
