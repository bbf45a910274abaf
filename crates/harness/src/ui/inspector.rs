//! Inspector-driven UI: act and observe through DOM evaluation

use async_trait::async_trait;
use inspector::InspectorSession;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use super::{TimeOfDay, UiDriver};
use crate::error::{HarnessError, Result};

/// Cadence of condition re-checks.
const WAIT_POLL: Duration = Duration::from_millis(500);

/// Diagnostic reads evaluated in one shot for the state dump.
const STATE_EXPRESSION: &str = r#"(() => {
    const read = selector => {
        const node = document.querySelector(selector);
        return node ? (node.textContent || '').trim() : null;
    };
    return {
        url: location.href,
        title: document.title,
        categoryList: !!document.querySelector('.category-list'),
        selectedCategory: read('.category-item.selected'),
        nowPlaying: read('.now-playing-status'),
        activeTime: read('.time-variant-option.active .time-variant-label')
    };
})()"#;

pub struct InspectorDriver {
    session: InspectorSession,
}

impl InspectorDriver {
    pub fn new(session: InspectorSession) -> Self {
        Self { session }
    }

    async fn click(&mut self, expression: &str, what: String) -> Result<()> {
        let clicked = self.session.evaluate(expression).await?;
        if clicked == Value::Bool(true) {
            tracing::debug!(%what, "clicked");
            Ok(())
        } else {
            Err(HarnessError::ElementNotFound { what })
        }
    }

    /// Re-evaluate a boolean expression until it holds or the deadline
    /// passes.
    async fn check(&mut self, expression: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.session.evaluate(expression).await? == Value::Bool(true) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }
}

#[async_trait]
impl UiDriver for InspectorDriver {
    fn name(&self) -> &'static str {
        "inspector"
    }

    fn can_invoke(&self) -> bool {
        true
    }

    fn can_observe(&self) -> bool {
        true
    }

    async fn open_category(&mut self, category: &str) -> Result<()> {
        let selector = format!("[data-category=\"{category}\"] .category-item");
        self.click(
            &click_selector_expression(&selector),
            format!("category {category:?}"),
        )
        .await
    }

    async fn start_environment(&mut self, environment: &str) -> Result<()> {
        let expression = click_labeled_expression(".env-name", environment, ".env-button");
        self.click(&expression, format!("environment {environment:?}"))
            .await
    }

    async fn select_time(&mut self, time: TimeOfDay) -> Result<()> {
        let expression =
            click_labeled_expression(".time-variant-label", time.label(), ".time-variant-option");
        self.click(&expression, format!("time {:?}", time.label()))
            .await
    }

    async fn element_text(&mut self, selector: &str) -> Result<String> {
        match self.session.evaluate(&text_expression(selector)).await? {
            Value::String(text) => Ok(text.trim().to_string()),
            _ => Err(HarnessError::ElementNotFound {
                what: selector.to_string(),
            }),
        }
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if self.check(&exists_expression(selector), timeout).await? {
            Ok(())
        } else {
            Err(HarnessError::ElementTimeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn wait_for_absence(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if self.check(&absent_expression(selector), timeout).await? {
            Ok(())
        } else {
            Err(HarnessError::ElementLingered {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn wait_for_text(
        &mut self,
        selector: &str,
        needle: &str,
        timeout: Duration,
    ) -> Result<bool> {
        self.check(&text_contains_expression(selector, needle), timeout)
            .await
    }

    async fn invoke(&mut self, command: &str, args: Value, timeout: Duration) -> Result<Value> {
        Ok(self.session.invoke(command, args, timeout).await?)
    }

    async fn dump_state(&mut self) -> Result<Value> {
        let state = self.session.evaluate(STATE_EXPRESSION).await?;
        tracing::info!(%state, "page state");
        Ok(state)
    }
}

/// Single-quoted JS string literal with the dangerous characters
/// escaped.
fn js_string(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('\'');
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            other => literal.push(other),
        }
    }
    literal.push('\'');
    literal
}

fn exists_expression(selector: &str) -> String {
    format!("!!document.querySelector({})", js_string(selector))
}

fn absent_expression(selector: &str) -> String {
    format!("!document.querySelector({})", js_string(selector))
}

fn text_expression(selector: &str) -> String {
    format!(
        "(() => {{ const node = document.querySelector({}); return node ? node.textContent : null; }})()",
        js_string(selector)
    )
}

fn text_contains_expression(selector: &str, needle: &str) -> String {
    format!(
        "(() => {{ const node = document.querySelector({}); return !!node && node.textContent.includes({}); }})()",
        js_string(selector),
        js_string(needle)
    )
}

fn click_selector_expression(selector: &str) -> String {
    format!(
        "(() => {{ const node = document.querySelector({}); if (!node) return false; node.click(); return true; }})()",
        js_string(selector)
    )
}

/// Find the element whose `label_selector` text equals `text` and
/// click its enclosing `container_selector`.
fn click_labeled_expression(label_selector: &str, text: &str, container_selector: &str) -> String {
    format!(
        r#"(() => {{
    const labels = Array.from(document.querySelectorAll({label}));
    const hit = labels.find(node => (node.textContent || '').trim() === {text});
    if (!hit) return false;
    const container = hit.closest({container});
    if (!container) return false;
    container.click();
    return true;
}})()"#,
        label = js_string(label_selector),
        text = js_string(text),
        container = js_string(container_selector),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_strings_escape_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), "'plain'");
        assert_eq!(js_string("it's"), r"'it\'s'");
        assert_eq!(js_string(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn click_expressions_embed_their_selector() {
        let expression = click_selector_expression(r#"[data-category="travel"] .category-item"#);
        assert!(expression.contains(r#"'[data-category="travel"] .category-item'"#));
        assert!(expression.contains("node.click()"));
    }

    #[test]
    fn labeled_clicks_walk_up_to_the_container() {
        let expression = click_labeled_expression(".env-name", "Travel", ".env-button");
        assert!(expression.contains("'.env-name'"));
        assert!(expression.contains("=== 'Travel'"));
        assert!(expression.contains("closest('.env-button')"));
    }

    #[test]
    fn text_checks_are_null_safe() {
        let expression = text_contains_expression(".now-playing-status", "Travel");
        assert!(expression.contains("!!node"));
        assert!(expression.contains(".includes('Travel')"));
    }
}
