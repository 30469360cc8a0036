// src/services/listing.rs

//! Forum listing fetcher.
//!
//! Reads the page count, the topic table of a listing page and the body of a
//! single topic using configured CSS selectors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, ListingRow, SelectorConfig};
use crate::utils::http::create_async_client;
use crate::utils::{normalize_whitespace, resolve_url};

/// Source of listing pages and topic bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Number of listing pages currently on the site.
    async fn total_pages(&self) -> Result<usize>;

    /// All table rows of listing page `page` (1-based), header rows included.
    async fn fetch_page(&self, page: usize) -> Result<Vec<ListingRow>>;

    /// Description text of the topic at `link`.
    async fn fetch_detail(&self, link: &str) -> Result<String>;
}

/// Compiled selectors for the forum markup.
#[derive(Debug)]
struct ListingSelectors {
    pager: Selector,
    pager_index: usize,
    pager_link: Selector,
    table: Selector,
    row: Selector,
    title: Selector,
    date: Selector,
    body: Selector,
    body_index: usize,
}

impl ListingSelectors {
    fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            pager: parse_selector(&config.pager)?,
            pager_index: config.pager_index,
            pager_link: parse_selector("a")?,
            table: parse_selector(&config.table)?,
            row: parse_selector(&config.row)?,
            title: parse_selector(&config.title)?,
            date: parse_selector(&config.date)?,
            body: parse_selector(&config.body)?,
            body_index: config.body_index,
        })
    }
}

/// [`PageFetcher`] over HTTP.
#[derive(Debug)]
pub struct HtmlPageFetcher {
    client: Client,
    base_url: Url,
    selectors: ListingSelectors,
    delay: Duration,
}

impl HtmlPageFetcher {
    /// Create a fetcher for the configured forum.
    pub fn new(crawler: &CrawlerConfig, selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(crawler)?,
            base_url: Url::parse(&crawler.base_url)?,
            selectors: ListingSelectors::compile(selectors)?,
            delay: Duration::from_millis(crawler.request_delay_ms),
        })
    }

    fn page_url(&self, page: usize) -> Result<Url> {
        Ok(self.base_url.join(&page.to_string())?)
    }

    /// GET `url` and return the body text.
    async fn get_text(&self, url: Url, context: &str) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(context, e))?;
        response.text().await.map_err(|e| AppError::fetch(context, e))
    }
}

#[async_trait]
impl PageFetcher for HtmlPageFetcher {
    async fn total_pages(&self) -> Result<usize> {
        let html = self.get_text(self.base_url.clone(), "page count").await?;
        parse_page_count(&html, &self.selectors)
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<ListingRow>> {
        let context = format!("listing page {page}");
        let url = self.page_url(page)?;
        let html = self.get_text(url.clone(), &context).await?;
        parse_rows(&html, &url, &self.selectors)
    }

    async fn fetch_detail(&self, link: &str) -> Result<String> {
        let url = Url::parse(link).map_err(|e| AppError::fetch(link, e))?;
        let html = self.get_text(url, link).await?;
        parse_body(&html, &self.selectors, link)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Elements whose boundaries separate words even without whitespace.
const BREAKING_ELEMENTS: &[&str] = &["br", "p", "div", "li", "tr", "td", "th"];

fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if BREAKING_ELEMENTS.contains(&e.name()) => text.push(' '),
            _ => {}
        }
    }
    normalize_whitespace(&text)
}

fn parse_page_count(html: &str, selectors: &ListingSelectors) -> Result<usize> {
    let document = Html::parse_document(html);
    let pager = document
        .select(&selectors.pager)
        .nth(selectors.pager_index)
        .ok_or_else(|| AppError::fetch("page count", "pagination block not found"))?;
    let last = pager
        .select(&selectors.pager_link)
        .last()
        .ok_or_else(|| AppError::fetch("page count", "pagination has no links"))?;
    let text = element_text(last);
    text.parse::<usize>()
        .map_err(|_| AppError::fetch("page count", format!("'{text}' is not a page number")))
}

fn parse_rows(html: &str, page_url: &Url, selectors: &ListingSelectors) -> Result<Vec<ListingRow>> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selectors.table)
        .next()
        .ok_or_else(|| AppError::fetch(page_url.as_str(), "topic table not found"))?;

    Ok(table
        .select(&selectors.row)
        .map(|row| parse_row(row, page_url, selectors))
        .collect())
}

fn parse_row(row: ElementRef<'_>, page_url: &Url, selectors: &ListingSelectors) -> ListingRow {
    let anchor = row.select(&selectors.title).next();
    let title = anchor.map(element_text).unwrap_or_default();
    let link = anchor
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve_url(page_url, href))
        .unwrap_or_default();
    let raw_date = row
        .select(&selectors.date)
        .last()
        .map(element_text)
        .unwrap_or_default();

    ListingRow {
        title,
        link,
        raw_date,
    }
}

fn parse_body(html: &str, selectors: &ListingSelectors, link: &str) -> Result<String> {
    let document = Html::parse_document(html);
    document
        .select(&selectors.body)
        .nth(selectors.body_index)
        .map(element_text)
        .ok_or_else(|| AppError::fetch(link, "message body not found"))
}
