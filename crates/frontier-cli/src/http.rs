use std::time::Duration;

use frontier_crawler::futures::future::BoxFuture;
use frontier_crawler::{Fetcher, Page};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    static ref LINKS: Selector = Selector::parse("a[href]").expect("Invalid link selector");
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: String::from("frontierbot"),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Downloads pages over HTTP, links are the absolute http(s) targets of `a[href]`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpFetcherConfig) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    type Id = String;

    fn fetch<'a>(&'a self, url: &'a String) -> BoxFuture<'a, anyhow::Result<Page<String>>> {
        Box::pin(async move {
            let resp = self.client.get(url).send().await?.error_for_status()?;
            let base = resp.url().clone();
            let body = resp.text().await?;
            let links = extract_links(&body, &base);
            Ok(Page::new(body, links))
        })
    }
}

pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINKS)
        .filter_map(|elem| elem.value().attr("href"))
        .filter_map(|href| resolve_link(base, href))
        .collect()
}

fn resolve_link(base: &Url, href: &str) -> Option<String> {
    if href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_absolute() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let html = r##"
            <html><body>
                <a href="/about">About</a>
                <a href="intro#setup">Intro</a>
                <a href="https://other.org/">Other</a>
                <a href="#top">Top</a>
                <a href="mailto:me@example.com">Mail</a>
                <a href="ftp://example.com/file">File</a>
                <a>No href</a>
            </body></html>
        "##;

        assert_eq!(
            vec![
                "https://example.com/about",
                "https://example.com/docs/intro",
                "https://other.org/",
            ],
            extract_links(html, &base)
        );
    }

    #[test]
    fn client_builds() {
        assert!(HttpFetcher::new(&HttpFetcherConfig::default()).is_ok());
    }
}
