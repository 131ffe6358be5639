// src/services/portal.rs

//! Pool portal client.
//!
//! Logs in once, then reads the listing overview, detail pages and photos
//! over the same cookie session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ListingDetails, ListingReference, PortalConfig};
use crate::utils::{http, resolve_url, url_extension};

/// Source of listings and their raw data.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// All listings currently visible, in source order.
    async fn enumerate_listings(&self) -> Result<Vec<ListingReference>>;

    /// Detail fields of a listing, in page order.
    async fn fetch_details(&self, reference: &ListingReference) -> Result<ListingDetails>;

    /// Free-text description of a listing.
    async fn fetch_description(&self, reference: &ListingReference) -> Result<String>;

    /// Locators of the listing's photos, in page order.
    async fn fetch_image_references(&self, reference: &ListingReference) -> Result<Vec<String>>;

    /// Download one photo into `dest_dir`, returning the written file.
    async fn download_image(&self, locator: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// HTTP client for the pool portal.
pub struct PortalClient {
    config: PortalConfig,
    client: Client,
    session: OnceCell<()>,
    // Last detail page, so the three extraction calls fetch it once
    page_cache: Mutex<Option<(String, String)>>,
}

impl PortalClient {
    /// Create a new portal client with the given configuration.
    pub fn new(config: PortalConfig) -> Result<Self> {
        let client = http::create_async_client(&config)?;
        Ok(Self {
            config,
            client,
            session: OnceCell::new(),
            page_cache: Mutex::new(None),
        })
    }

    /// Log in unless this client already holds a session.
    async fn ensure_session(&self) -> Result<()> {
        self.session.get_or_try_init(|| self.login()).await?;
        Ok(())
    }

    async fn login(&self) -> Result<()> {
        let login_url = self.config.page_url(&self.config.login_path);
        log::info!("Logging in to {}", login_url);

        let page = self
            .get_text(&login_url)
            .await
            .map_err(|e| AppError::portal(format!("login page unreachable: {e}")))?;
        let mut form = login_form(&page, &login_url)?;
        form.set(&self.config.username_field, &self.config.username);
        form.set(&self.config.password_field, &self.config.password);

        let response = self
            .client
            .post(&form.action)
            .form(&form.fields)
            .send()
            .await
            .map_err(|e| AppError::portal(format!("login request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::portal(format!(
                "login rejected with status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        if contains_field(&body, &self.config.password_field) {
            return Err(AppError::portal("login rejected, check portal credentials"));
        }

        log::info!("Logged in as {}", self.config.username);
        Ok(())
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        http::fetch_text(&self.client, url).await
    }

    /// Fetch a detail page, reusing the last one when it is the same listing.
    async fn detail_page(&self, reference: &ListingReference) -> Result<String> {
        if let Some((url, html)) = self.cached_page() {
            if url == reference.as_str() {
                return Ok(html);
            }
        }

        self.ensure_session().await?;
        let html = self.get_text(reference.as_str()).await?;
        *self
            .page_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some((reference.as_str().to_string(), html.clone()));
        Ok(html)
    }

    fn cached_page(&self) -> Option<(String, String)> {
        self.page_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ListingFetcher for PortalClient {
    async fn enumerate_listings(&self) -> Result<Vec<ListingReference>> {
        self.ensure_session().await?;

        let url = self.config.page_url(&self.config.overview_path);
        let html = self
            .get_text(&url)
            .await
            .map_err(|e| AppError::portal(format!("overview page unreachable: {e}")))?;

        let references = extract_listing_links(&html, &url, &self.config)?;
        log::info!("Found {} listings on the overview page", references.len());
        Ok(references)
    }

    async fn fetch_details(&self, reference: &ListingReference) -> Result<ListingDetails> {
        let html = self.detail_page(reference).await?;
        extract_details(&html, &self.config)
    }

    async fn fetch_description(&self, reference: &ListingReference) -> Result<String> {
        let html = self.detail_page(reference).await?;
        extract_description(&html, &self.config)
    }

    async fn fetch_image_references(&self, reference: &ListingReference) -> Result<Vec<String>> {
        let html = self.detail_page(reference).await?;
        let mut images = extract_image_urls(&html, reference.as_str(), &self.config)?;
        if self.config.skip_first_image && !images.is_empty() {
            images.remove(0);
        }
        Ok(images)
    }

    async fn download_image(&self, locator: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.ensure_session().await?;

        let bytes = self
            .client
            .get(locator)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(image_file_name(locator));
        tokio::fs::write(&path, &bytes).await?;

        log::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The portal's login form as found on the login page.
#[derive(Debug)]
struct LoginForm {
    action: String,
    fields: HashMap<String, String>,
    // Input id to the name it is submitted under
    names: HashMap<String, String>,
}

impl LoginForm {
    /// Set a field given either its id or its name.
    fn set(&mut self, field: &str, value: &str) {
        let name = self.names.get(field).map(String::as_str).unwrap_or(field);
        self.fields.insert(name.to_string(), value.to_string());
    }
}

/// Locate the login form: its absolute action URL and its inputs.
fn login_form(html: &str, page_url: &str) -> Result<LoginForm> {
    let document = Html::parse_document(html);
    let form_sel = parse_selector("form")?;
    let input_sel = parse_selector("input[name]")?;
    let base = Url::parse(page_url)?;

    let form = document
        .select(&form_sel)
        .next()
        .ok_or_else(|| AppError::portal("no login form on the login page"))?;

    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.trim().is_empty())
        .map(|a| resolve_url(&base, a))
        .unwrap_or_else(|| page_url.to_string());

    let mut fields = HashMap::new();
    let mut names = HashMap::new();
    for input in form.select(&input_sel) {
        let element = input.value();
        let Some(name) = element.attr("name") else {
            continue;
        };
        if let Some(id) = element.attr("id") {
            names.insert(id.to_string(), name.to_string());
        }
        if element.attr("type") == Some("hidden") {
            let value = element.attr("value").unwrap_or("");
            fields.insert(name.to_string(), value.to_string());
        }
    }

    Ok(LoginForm {
        action,
        fields,
        names,
    })
}

/// Whether the page still has an input with the given id or name.
fn contains_field(html: &str, field: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("input") else {
        return false;
    };
    document.select(&sel).any(|input| {
        let element = input.value();
        element.attr("id") == Some(field) || element.attr("name") == Some(field)
    })
}

/// Collect listing links from the overview page, in page order.
fn extract_listing_links(
    html: &str,
    page_url: &str,
    config: &PortalConfig,
) -> Result<Vec<ListingReference>> {
    let document = Html::parse_document(html);
    let ready_sel = parse_selector(&config.selectors.overview_ready)?;
    if document.select(&ready_sel).next().is_none() {
        return Err(AppError::portal(format!(
            "listing overview not recognized at {page_url} (session expired or page changed)"
        )));
    }

    let link_sel = parse_selector("a[href]")?;
    let base = Url::parse(page_url)?;

    Ok(document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(&config.listing_marker))
        .map(|href| ListingReference::new(resolve_url(&base, href)))
        .collect())
}

/// Pair up detail labels and values in page order.
fn extract_details(html: &str, config: &PortalConfig) -> Result<ListingDetails> {
    let document = Html::parse_document(html);
    let container_sel = parse_selector(&config.selectors.details_container)?;
    let key_sel = parse_selector(&config.selectors.detail_key)?;
    let value_sel = parse_selector(&config.selectors.detail_value)?;

    let container = document.select(&container_sel).next().ok_or_else(|| {
        AppError::extract(
            "details",
            format!("no element matches {}", config.selectors.details_container),
        )
    })?;

    let keys = container.select(&key_sel).map(element_text);
    let values = container.select(&value_sel).map(element_text);
    Ok(keys.zip(values).collect())
}

/// Join the description spans, one per line.
fn extract_description(html: &str, config: &PortalConfig) -> Result<String> {
    let document = Html::parse_document(html);
    let container_sel = parse_selector(&config.selectors.images_container)?;
    let item_sel = parse_selector(&config.selectors.description_item)?;

    let Some(container) = document.select(&container_sel).next() else {
        log::warn!("No description container on detail page");
        return Ok(String::new());
    };

    Ok(container
        .select(&item_sel)
        .map(|span| span.text().collect::<String>().trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

/// Absolute photo URLs inside the images container, in page order.
fn extract_image_urls(html: &str, page_url: &str, config: &PortalConfig) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let container_sel = parse_selector(&config.selectors.images_container)?;
    let image_sel = parse_selector(&config.selectors.image)?;
    let base = Url::parse(page_url)?;

    let Some(container) = document.select(&container_sel).next() else {
        return Ok(Vec::new());
    };

    Ok(container
        .select(&image_sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .map(|src| resolve_url(&base, src))
        .collect())
}

/// Stable file name for a photo locator, so a retried download overwrites.
fn image_file_name(locator: &str) -> String {
    let digest = Sha256::digest(locator.as_bytes());
    let ext = url_extension(locator).unwrap_or_else(|| ".png".to_string());
    format!("{}{}", &hex::encode(digest)[..16], ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERVIEW: &str = r#"
        <html><body>
          <div class="osui-accordion-item">
            <a href="VehicleDetail?VehicleId=310">Volvo V40</a>
            <a href="/PoolSite/Help">Help</a>
            <a href="VehicleDetail?VehicleId=298">Opel Astra</a>
          </div>
          <a href="https://portal.example.nl/PoolSite/VehicleDetail?VehicleId=310">again</a>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <div id="Container_Images">
            <span>Schade rechtsvoor</span>
            <span> APK tot 2027 </span>
            <img src="/img/thumb.png">
            <img src="/img/GetImage?id=1">
            <img src="https://cdn.example.nl/photos/2.JPG">
          </div>
          <div id="b5-Container_VoertuigDetail">
            <div class="item">Kenteken</div><div class="itemvalue">12-ABC-3</div>
            <div class="item">Merk</div><div class="itemvalue"> VOLVO </div>
            <div class="item">Model</div><div class="itemvalue">V40</div>
            <div class="item">Orphan</div>
          </div>
        </body></html>
    "#;

    fn config() -> PortalConfig {
        PortalConfig {
            base_url: "https://portal.example.nl/PoolSite".to_string(),
            ..PortalConfig::default()
        }
    }

    #[test]
    fn test_listing_links_in_page_order() {
        let refs = extract_listing_links(
            OVERVIEW,
            "https://portal.example.nl/PoolSite/",
            &config(),
        )
        .unwrap();
        let urls: Vec<_> = refs.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://portal.example.nl/PoolSite/VehicleDetail?VehicleId=310",
                "https://portal.example.nl/PoolSite/VehicleDetail?VehicleId=298",
                "https://portal.example.nl/PoolSite/VehicleDetail?VehicleId=310",
            ]
        );
    }

    #[test]
    fn test_unrecognized_overview_fails() {
        let result = extract_listing_links(
            "<html><body><form id=\"login\"></form></body></html>",
            "https://portal.example.nl/PoolSite/",
            &config(),
        );
        assert!(matches!(result, Err(AppError::Portal(_))));
    }

    #[test]
    fn test_details_paired_in_order() {
        let details = extract_details(DETAIL, &config()).unwrap();
        let pairs: Vec<_> = details.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Kenteken", "12-ABC-3"),
                ("Merk", "VOLVO"),
                ("Model", "V40"),
            ]
        );
    }

    #[test]
    fn test_details_missing_container() {
        assert!(extract_details("<html></html>", &config()).is_err());
    }

    #[test]
    fn test_description_lines() {
        let description = extract_description(DETAIL, &config()).unwrap();
        assert_eq!(description, "Schade rechtsvoor\nAPK tot 2027");
    }

    #[test]
    fn test_description_missing_is_empty() {
        assert_eq!(extract_description("<html></html>", &config()).unwrap(), "");
    }

    #[test]
    fn test_image_urls_resolved() {
        let urls = extract_image_urls(
            DETAIL,
            "https://portal.example.nl/PoolSite/VehicleDetail?VehicleId=310",
            &config(),
        )
        .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://portal.example.nl/img/thumb.png",
                "https://portal.example.nl/img/GetImage?id=1",
                "https://cdn.example.nl/photos/2.JPG",
            ]
        );
    }

    #[test]
    fn test_login_form_fields() {
        let html = r#"
            <form action="/PoolSite/Login?handler=submit" method="post">
              <input type="hidden" name="__RequestVerificationToken" value="tok">
              <input id="Input_Email" name="Input.Email">
              <input id="Input_Password" name="Input.Password" type="password">
            </form>
        "#;
        let mut form = login_form(html, "https://portal.example.nl/PoolSite/Login").unwrap();
        assert_eq!(
            form.action,
            "https://portal.example.nl/PoolSite/Login?handler=submit"
        );
        assert_eq!(
            form.fields.get("__RequestVerificationToken").map(String::as_str),
            Some("tok")
        );
        assert!(!form.fields.contains_key("Input.Email"));

        form.set("Input_Email", "abc@example.com");
        form.set("Input.Password", "secret");
        assert_eq!(
            form.fields.get("Input.Email").map(String::as_str),
            Some("abc@example.com")
        );
        assert_eq!(
            form.fields.get("Input.Password").map(String::as_str),
            Some("secret")
        );
        assert!(contains_field(html, "Input_Password"));
        assert!(!contains_field("<p>Welcome</p>", "Input_Password"));
    }

    #[test]
    fn test_image_file_name_is_stable() {
        let a = image_file_name("https://cdn.example.nl/photos/2.JPG");
        let b = image_file_name("https://cdn.example.nl/photos/2.JPG");
        assert_eq!(a, b);
        assert!(a.ends_with(".jpg"));
        assert!(image_file_name("https://x.nl/GetImage?id=1").ends_with(".png"));
        assert_ne!(a, image_file_name("https://cdn.example.nl/photos/3.JPG"));
    }
}
