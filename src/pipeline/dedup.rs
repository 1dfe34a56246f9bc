//! Cross-pass article deduplication.
//!
//! Articles are identified by their normalized url, or by a normalized title
//! paired with the source name when there is no url. The first article seen
//! for a key wins; later duplicates are discarded whole.

use crate::models::Article;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Query parameters that only carry campaign/click tracking.
const TRACKING_PARAMS: [&str; 6] = ["fbclid", "gclid", "mc_cid", "mc_eid", "igshid", "ref_src"];

/// Identity of an article for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArticleKey {
    Url(String),
    TitleSource(String, String),
}

impl ArticleKey {
    pub fn of(article: &Article) -> Self {
        match article.url.as_deref().map(normalize_url) {
            Some(url) if !url.is_empty() => ArticleKey::Url(url),
            _ => ArticleKey::TitleSource(
                normalize_title(&article.title),
                article.source_name.clone(),
            ),
        }
    }
}

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

/// Lower-case, drop tracking parameters and the fragment, strip trailing `/`.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    let normalized = match Url::parse(raw) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| !is_tracking_param(k))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
            url.set_fragment(None);
            let path = url.path().trim_end_matches('/').to_string();
            url.set_path(if path.is_empty() { "/" } else { &path });
            url.to_string()
        }
        Err(_) => {
            let without_fragment = raw.split('#').next().unwrap_or_default();
            match without_fragment.split_once('?') {
                Some((path, query)) => format!("{}?{}", path.trim_end_matches('/'), query),
                None => without_fragment.to_string(),
            }
        }
    };
    normalized.to_lowercase().trim_end_matches('/').to_string()
}

/// Collapse runs of whitespace and lower-case.
pub fn normalize_title(title: &str) -> String {
    WHITESPACE.replace_all(title.trim(), " ").to_lowercase()
}

/// Ordered, duplicate-free accumulator of articles across passes.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    seen: HashSet<ArticleKey>,
    articles: Vec<Article>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unseen articles in arrival order. Returns how many were added.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = Article>,
    {
        self.merge_bounded(items, usize::MAX)
    }

    /// Like [`merge`](Self::merge) but stops once the accumulator holds
    /// `limit` articles. Items past the limit are not marked as seen.
    pub fn merge_bounded<I>(&mut self, items: I, limit: usize) -> usize
    where
        I: IntoIterator<Item = Article>,
    {
        let before = self.articles.len();
        for article in items {
            if self.articles.len() >= limit {
                break;
            }
            if self.seen.insert(ArticleKey::of(&article)) {
                self.articles.push(article);
            }
        }
        self.articles.len() - before
    }

    pub fn contains(&self, article: &Article) -> bool {
        self.seen.contains(&ArticleKey::of(article))
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(title: &str, source: &str, url: Option<&str>) -> Article {
        Article::new(title, "", source, None, url.map(str::to_string))
    }

    #[test]
    fn test_normalize_url_variants_collide() {
        let a = normalize_url("https://News.Example.com/Story/1/");
        let b = normalize_url("https://news.example.com/story/1");
        let c = normalize_url("https://news.example.com/story/1?utm_source=bing&utm_medium=x");
        let d = normalize_url("https://news.example.com/story/1#comments");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
    }

    #[test]
    fn test_normalize_url_keeps_meaningful_query() {
        let a = normalize_url("https://zdnet.co.kr/view/?no=123&utm_campaign=x");
        assert_eq!(a, "https://zdnet.co.kr/view?no=123");
        assert_ne!(a, normalize_url("https://zdnet.co.kr/view/?no=124"));
    }

    #[test]
    fn test_normalize_url_slash_variants_with_query_collapse() {
        assert_eq!(
            normalize_url("https://zdnet.co.kr/view/?no=123"),
            normalize_url("https://zdnet.co.kr/view?no=123")
        );
        assert_eq!(
            normalize_url("https://ZDNet.co.kr/View/?no=123#top"),
            normalize_url("https://zdnet.co.kr/view?no=123&fbclid=abc")
        );
        assert_eq!(normalize_url("https://example.com/?q=1"), "https://example.com/?q=1");
        assert_eq!(normalize_url("example.com/path/?q=1"), "example.com/path?q=1");
    }

    #[test]
    fn test_merge_collapses_slash_variant_with_query() {
        let mut dedup = Deduplicator::new();
        let first = Article::new("A", "", "ZDNet", None, Some("https://zdnet.co.kr/view/?no=123".to_string()));
        let later = Article::new("A again", "", "ZDNet", None, Some("https://zdnet.co.kr/view?no=123".to_string()));
        assert_eq!(dedup.merge([first]), 1);
        assert_eq!(dedup.merge([later]), 0);
        assert_eq!(dedup.articles()[0].title, "A");
    }

    #[test]
    fn test_normalize_url_unparseable_falls_back() {
        assert_eq!(normalize_url(" Example.com/Path/ "), "example.com/path");
    }

    #[test]
    fn test_title_key_when_url_missing() {
        let a = art("  KT   Unveils\tAI ", "Yonhap", None);
        let b = art("kt unveils ai", "Yonhap", None);
        let c = art("kt unveils ai", "Newsis", None);
        assert_eq!(ArticleKey::of(&a), ArticleKey::of(&b));
        assert_ne!(ArticleKey::of(&a), ArticleKey::of(&c));
    }

    #[test]
    fn test_earlier_pass_wins() {
        let mut dedup = Deduplicator::new();
        dedup.merge(vec![
            art("first version", "A", Some("https://a.com/story/")),
            art("other", "A", Some("https://a.com/other")),
        ]);
        let added = dedup.merge(vec![
            art("second version", "B", Some("HTTPS://A.COM/story")),
            art("new", "C", Some("https://c.com/new")),
        ]);

        assert_eq!(added, 1);
        assert_eq!(dedup.len(), 3);
        assert_eq!(dedup.articles()[0].title, "first version");
        assert_eq!(dedup.articles()[0].source_name, "A");
        assert_eq!(dedup.articles()[2].title, "new");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![
            art("a", "s", Some("https://a.com/1")),
            art("b", "s", None),
            art("c", "s", Some("https://c.com/1?utm_source=x")),
        ];
        let mut dedup = Deduplicator::new();
        dedup.merge(batch.clone());
        let snapshot = dedup.articles().to_vec();

        let added = dedup.merge(batch);
        assert_eq!(added, 0);
        assert_eq!(dedup.articles(), snapshot.as_slice());
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let mut dedup = Deduplicator::new();
        let added = dedup.merge(vec![
            art("a", "s", Some("https://a.com/1")),
            art("a again", "s", Some("https://a.com/1/")),
        ]);
        assert_eq!(added, 1);
        assert_eq!(dedup.articles()[0].title, "a");
    }

    #[test]
    fn test_merge_bounded_stops_at_limit() {
        let mut dedup = Deduplicator::new();
        dedup.merge(vec![art("a", "s", Some("https://a.com/1"))]);
        let added = dedup.merge_bounded(
            (2..10).map(|i| art("x", "s", Some(format!("https://a.com/{i}").as_str()))),
            3,
        );
        assert_eq!(added, 2);
        assert_eq!(dedup.len(), 3);
        assert!(!dedup.contains(&art("x", "s", Some("https://a.com/5"))));
    }
}
