use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use scraper::Html;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{self, Product};
use crate::render::PageSource;
use crate::{extract, normalize};

/// Why one item was dropped. Storage failures are kept apart from the rest
/// so they can be reported distinctly; all three skip the item and nothing
/// more.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("page render failed: {0}")]
    Render(#[source] anyhow::Error),
    #[error("field normalization failed: {0}")]
    Normalize(#[source] anyhow::Error),
    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Run stats returned after the per-item loop.
pub struct RunStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Drive every discovered URL through render → extract → normalize →
/// persist, strictly in order. One failing item is logged and skipped; the
/// loop itself never fails. Successes come back in discovery order.
pub async fn process_all<S: PageSource>(
    source: &S,
    conn: &Connection,
    urls: &[String],
) -> (Vec<Product>, RunStats) {
    let total = urls.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut products = Vec::new();
    let mut errors = 0usize;

    for url in urls {
        match process_item(source, conn, url).await {
            Ok(product) => products.push(product),
            Err(e @ ItemError::Storage(_)) => {
                errors += 1;
                warn!("Database error occurred while processing URL {}: {}", url, e);
            }
            Err(e) => {
                errors += 1;
                warn!("An error occurred while processing URL {}: {}", url, e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    let ok = products.len();
    info!("Processed {} pages ({} ok, {} errors)", total, ok, errors);

    (products, RunStats { total, ok, errors })
}

/// One URL end to end: the record is only persisted and returned when every
/// stage succeeded.
async fn process_item<S: PageSource>(
    source: &S,
    conn: &Connection,
    url: &str,
) -> Result<Product, ItemError> {
    let html = source.fetch(url).await.map_err(ItemError::Render)?;
    let doc = Html::parse_document(&html);
    let raw = extract::extract_fields(&doc);
    let product = normalize::build_product(raw).map_err(ItemError::Normalize)?;
    db::insert_product(conn, &product)?;
    Ok(product)
}

/// Serialize the run's accumulator to a JSON file. Non-ASCII text goes out
/// as-is, not escaped.
pub fn write_export(path: &Path, products: &[Product]) -> Result<()> {
    let json = serde_json::to_string_pretty(products)?;
    std::fs::write(path, json)?;
    info!("Exported {} products to {}", products.len(), path.display());
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Canned page source: a URL maps to page HTML or to an error message.
    struct FakeSource {
        pages: HashMap<String, Result<String, String>>,
    }

    impl PageSource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<String> {
            match self.pages.get(url) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(msg)) => Err(anyhow::anyhow!(msg.clone())),
                None => Err(anyhow::anyhow!("unknown url: {}", url)),
            }
        }
    }

    fn product_page(name: &str) -> String {
        format!(
            r#"<html><body>
            <h1 class="cmp-product-details-main__heading-title">{name}</h1>
            <div class="body">опис</div>
            <div id="pdp-nutrition-summary"><div>
              <div class="primarynutritions aem-GridColumn aem-GridColumn--default--12"><div><ul>
                <li><span class="value"><span>ккал</span><span>250</span><span>250 ккал</span></span></li>
                <li><span class="value"><span>Жири</span><span>12.5 г/g</span></span></li>
                <li><span class="value"><span>Білки</span><span>N/A</span></span></li>
              </ul></div></div>
              <div class="secondarynutritions aem-GridColumn--default--none aem-GridColumn aem-GridColumn--default--12 aem-GridColumn--offset--default--0">
                <div><div><div>
                  <div class="cmp-nutrition-summary__details-column-view-desktop"><ul>
                    <li><span class="value"><span>5 г/g</span></span></li>
                    <li><span class="value"><span>N/A</span></span></li>
                    <li><span class="value"><span class="sr-only">1.2 г/g</span></span></li>
                    <li><span class="value"><span>210{nbsp}г/g</span></span></li>
                  </ul></div>
                </div></div></div>
              </div>
            </div></div>
            </body></html>"#,
            nbsp = '\u{a0}',
        )
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[tokio::test]
    async fn failed_render_skips_only_that_item() {
        let mut pages = HashMap::new();
        pages.insert("u1".to_string(), Ok(product_page("Перший")));
        pages.insert("u2".to_string(), Err("browser crashed".to_string()));
        pages.insert("u3".to_string(), Ok(product_page("Третій")));
        let source = FakeSource { pages };
        let conn = test_conn();

        let urls: Vec<String> = ["u1", "u2", "u3"].map(String::from).to_vec();
        let (products, stats) = process_all(&source, &conn, &urls).await;

        assert_eq!(stats.total, 3);
        assert_eq!(stats.ok, 2);
        assert_eq!(stats.errors, 1);
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Перший", "Третій"]);

        // Both survivors are persisted, the failed one never existed.
        assert!(db::fetch_by_name(&conn, "Перший").unwrap().is_some());
        assert!(db::fetch_by_name(&conn, "Третій").unwrap().is_some());
        assert_eq!(db::fetch_products(&conn, 0, 10).unwrap().len(), 2);

        // The export lists exactly the two survivors, in discovery order.
        let path = std::env::temp_dir().join(format!("menu_skip_{}.json", std::process::id()));
        write_export(&path, &products).unwrap();
        let exported: Vec<Product> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            exported.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Перший", "Третій"]
        );
    }

    #[tokio::test]
    async fn storage_error_does_not_stop_the_run() {
        // u1 and u2 share a name, so u2 trips the UNIQUE constraint.
        let mut pages = HashMap::new();
        pages.insert("u1".to_string(), Ok(product_page("Дубль")));
        pages.insert("u2".to_string(), Ok(product_page("Дубль")));
        pages.insert("u3".to_string(), Ok(product_page("Інший")));
        let source = FakeSource { pages };
        let conn = test_conn();

        let urls: Vec<String> = ["u1", "u2", "u3"].map(String::from).to_vec();
        let (products, stats) = process_all(&source, &conn, &urls).await;

        assert_eq!(stats.ok, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(products.len(), 2);
        assert_eq!(db::fetch_products(&conn, 0, 10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn normalized_values_reach_storage() {
        let mut pages = HashMap::new();
        pages.insert("u1".to_string(), Ok(product_page("Біг Мак")));
        let source = FakeSource { pages };
        let conn = test_conn();

        let urls = vec!["u1".to_string()];
        let (products, _) = process_all(&source, &conn, &urls).await;

        let p = &products[0];
        assert_eq!(p.calories, Some(250));
        assert_eq!(p.fats, Some(12.5));
        assert_eq!(p.proteins, None);
        assert_eq!(p.sugar, "N/A");
        // NBSP from the portion cell must not survive.
        assert_eq!(p.portion, "210 г/g");
    }

    #[test]
    fn export_preserves_order_and_unicode() {
        let products = vec![
            Product {
                name: "Біг Мак".into(),
                description: String::new(),
                calories: Some(508),
                fats: None,
                proteins: None,
                unsaturated_fats: "N/A".into(),
                sugar: "N/A".into(),
                salt: "N/A".into(),
                portion: "219 г/g".into(),
            },
            Product {
                name: "Картопля фрі".into(),
                description: String::new(),
                calories: None,
                fats: None,
                proteins: None,
                unsaturated_fats: String::new(),
                sugar: String::new(),
                salt: String::new(),
                portion: String::new(),
            },
        ];

        let path = std::env::temp_dir().join(format!("menu_export_{}.json", std::process::id()));
        write_export(&path, &products).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(text.contains("Біг Мак"));
        assert!(!text.contains("\\u"));
        let parsed: Vec<Product> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, products);
    }
}
