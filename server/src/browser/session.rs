use super::{BrowserError, Locator};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const CLICK_ATTEMPTS: u32 = 3;
const CLICK_RETRY_DELAY: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The two primitives the orchestrator itself needs; everything else
/// goes through the company adapter.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Waits for the input, clears it and types `text`.
    async fn replace_text(&self, locator: &Locator, text: &str) -> Result<(), BrowserError>;
}

/// Thin wrapper over a WebDriver client with explicit timeouts and typed errors.
#[derive(Clone)]
pub struct BrowserSession {
    client: Client,
    timeout: Duration,
}

impl BrowserSession {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn close(self) -> Result<(), BrowserError> {
        self.client.close().await?;
        Ok(())
    }

    pub async fn find(&self, locator: &Locator) -> Result<Element, BrowserError> {
        Ok(self.client.find(locator.as_fantoccini()).await?)
    }

    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        Ok(self.client.find_all(locator.as_fantoccini()).await?)
    }

    pub async fn find_in(&self, parent: &Element, locator: &Locator) -> Result<Element, BrowserError> {
        Ok(parent.find(locator.as_fantoccini()).await?)
    }

    pub async fn find_all_in(
        &self,
        parent: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError> {
        Ok(parent.find_all(locator.as_fantoccini()).await?)
    }

    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<Element, BrowserError> {
        let timeout = timeout.unwrap_or(self.timeout);
        self.client
            .wait()
            .at_most(timeout)
            .every(POLL_INTERVAL)
            .for_element(locator.as_fantoccini())
            .await
            .map_err(|e| match BrowserError::from(e) {
                BrowserError::Timeout(_) => {
                    BrowserError::Timeout(format!("{} ({}s)", locator, timeout.as_secs()))
                }
                other => other,
            })
    }

    /// Present, displayed and enabled.
    pub async fn wait_for_clickable(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<Element, BrowserError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + timeout;
        let element = self.wait_for_element(locator, Some(timeout)).await?;

        loop {
            let displayed = element.is_displayed().await.unwrap_or(false);
            let enabled = element.is_enabled().await.unwrap_or(false);
            if displayed && enabled {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::NotInteractable(locator.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Returns `false` when the element was never there, `true` once it disappears.
    pub async fn wait_for_invisibility(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let deadline = Instant::now() + timeout;
        let mut seen = false;

        loop {
            let visible = match self.find(locator).await {
                Ok(element) => element.is_displayed().await.unwrap_or(false),
                Err(BrowserError::ElementNotFound(_)) | Err(BrowserError::StaleElement) => false,
                Err(e) => return Err(e),
            };
            if !visible {
                return Ok(seen);
            }
            seen = true;
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{} sigue visible luego de {}s",
                    locator,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits until `element` is detached from the DOM.
    pub async fn wait_for_staleness(
        &self,
        element: &Element,
        timeout: Option<Duration>,
    ) -> Result<(), BrowserError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + timeout;

        loop {
            match element.is_displayed().await.map_err(BrowserError::from) {
                Err(BrowserError::StaleElement) | Err(BrowserError::ElementNotFound(_)) => {
                    return Ok(())
                }
                Err(e) => return Err(e),
                Ok(_) => {}
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout("esperando que el elemento quede obsoleto".to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn is_present(&self, locator: &Locator, timeout: Duration) -> bool {
        self.wait_for_element(locator, Some(timeout)).await.is_ok()
    }

    /// Clicks once the element is clickable, retrying intercepted or stale clicks.
    pub async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        let mut last_error = None;

        for attempt in 1..=CLICK_ATTEMPTS {
            let element = self.wait_for_clickable(locator, None).await?;
            match element.click().await.map_err(BrowserError::from) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => {
                    tracing::debug!("🔁 Click reintentado ({}/{}) en {}: {}", attempt, CLICK_ATTEMPTS, locator, e);
                    last_error = Some(e);
                    tokio::time::sleep(CLICK_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| BrowserError::NotInteractable(locator.to_string())))
    }

    pub async fn click_element(&self, element: &Element) -> Result<(), BrowserError> {
        Ok(element.click().await?)
    }

    pub async fn send_keys(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let element = self.wait_for_element(locator, None).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    pub async fn text(&self, locator: &Locator) -> Result<String, BrowserError> {
        let element = self.wait_for_element(locator, None).await?;
        Ok(element.text().await?.trim().to_string())
    }

    pub async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>, BrowserError> {
        let element = self.wait_for_element(locator, None).await?;
        Ok(element.attr(name).await?)
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.client
            .execute(script, args)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    pub async fn back(&self) -> Result<(), BrowserError> {
        Ok(self.client.back().await?)
    }

    /// Clicks the checkbox only when its state differs. Returns whether it toggled.
    pub async fn set_checkbox_state(&self, element: &Element, checked: bool) -> Result<bool, BrowserError> {
        if element.is_selected().await? == checked {
            return Ok(false);
        }
        element.click().await?;
        Ok(true)
    }

    /// Sets each checkbox in order. A toggle re-renders the panel, so the
    /// handle of the next checkbox is taken before the click and awaited
    /// until it goes stale; the next lookup then finds the fresh node.
    pub async fn set_checkboxes_in_order(
        &self,
        states: &[(Locator, bool)],
        refresh_timeout: Duration,
    ) -> Result<(), BrowserError> {
        for (i, (locator, checked)) in states.iter().enumerate() {
            let checkbox = self.wait_for_element(locator, None).await?;
            let next = match states.get(i + 1) {
                Some((next_locator, _)) => self.find(next_locator).await.ok().map(|e| (next_locator, e)),
                None => None,
            };

            if !self.set_checkbox_state(&checkbox, *checked).await? {
                continue;
            }
            if let Some((next_locator, old)) = next {
                if let Err(e) = self.wait_for_staleness(&old, Some(refresh_timeout)).await {
                    tracing::debug!("🔁 Casilla {} no se refrescó: {}", next_locator, e);
                }
            }
        }
        Ok(())
    }

    pub async fn table_row_count(&self, rows: &Locator) -> Result<usize, BrowserError> {
        match self.find_all(rows).await {
            Ok(found) => Ok(found.len()),
            Err(BrowserError::ElementNotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Reads the wanted columns of `table` keyed by header text.
    /// Rows shorter than a column index just omit that column.
    pub async fn extract_table_data(
        &self,
        table: &Locator,
        columns: &[&str],
    ) -> Result<Vec<HashMap<String, String>>, BrowserError> {
        let table = self.wait_for_element(table, None).await?;

        let mut headers = Vec::new();
        for header in table.find_all(fantoccini::Locator::Css("thead tr th")).await? {
            headers.push(header.text().await?.trim().to_string());
        }

        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| !headers.iter().any(|h| h == *c))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(BrowserError::ElementNotFound(format!(
                "columnas {:?} no están en la tabla",
                missing
            )));
        }

        let indices: Vec<(&str, usize)> = columns
            .iter()
            .filter_map(|c| headers.iter().position(|h| h == c).map(|i| (*c, i)))
            .collect();

        let mut data = Vec::new();
        for row in table.find_all(fantoccini::Locator::Css("tbody tr")).await? {
            let cells = row.find_all(fantoccini::Locator::Css("td")).await?;
            let mut record = HashMap::new();
            for (column, index) in &indices {
                if let Some(cell) = cells.get(*index) {
                    record.insert(column.to_string(), cell.text().await?.trim().to_string());
                }
            }
            if !record.is_empty() {
                data.push(record);
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl Navigator for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        tracing::debug!("🌐 Navegando a {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    async fn replace_text(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let element = self.wait_for_element(locator, None).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }
}
