use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

pub const MENU_URL: &str = "https://www.mcdonalds.com/ua/uk-ua/eat/fullmenu.html";

const ITEM_LINK_SELECTOR: &str = ".cmp-category__item a";

/// Fetch the full-menu index page and return the absolute item URLs.
///
/// The index is static HTML, one GET is enough. A failed fetch is fatal for
/// the whole run since there is nothing to discover from.
pub async fn fetch_menu_urls(client: &reqwest::Client, index_url: &str) -> Result<Vec<String>> {
    info!("Fetching menu index: {}", index_url);
    let body = client
        .get(index_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .context("Failed to fetch menu index page")?
        .text()
        .await
        .context("Failed to read menu index body")?;

    let base = Url::parse(index_url).context("invalid index url")?;
    let urls = parse_item_urls(&body, &base);
    info!("Menu items discovered: {}", urls.len());
    Ok(urls)
}

/// Select all catalog item anchors and resolve their hrefs against `base`,
/// preserving document order. Anchors without an href are skipped.
pub fn parse_item_urls(html: &str, base: &Url) -> Vec<String> {
    let sel = Selector::parse(ITEM_LINK_SELECTOR).expect("item link selector");
    let doc = Html::parse_document(html);
    doc.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|u| u.to_string())
        .collect()
}

// ── Tests ──
