//! Tool handlers: one page primitive per catalog entry.
//!
//! Every handler has the same shape — read its arguments from the
//! normalized argument map, run exactly one operation against the shared
//! page, and wrap the outcome in a [`ToolCallResult`]. Failures are
//! returned as [`Error`] values; the dispatcher folds them into error
//! envelopes.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::cdp::browser_protocol::{
    emulation::SetDeviceMetricsOverrideParams,
    input::{
        DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
        DispatchMouseEventType,
    },
    network::{ClearBrowserCookiesParams, CookieParam},
    page::{CaptureScreenshotFormat, PrintToPdfParams},
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{ContentItem, ToolCallResult};

/// Normalized tool arguments: name to JSON value, defaults already applied.
pub type Args = serde_json::Map<String, Value>;

// ── argument coercion ───────────────────────────────────────────────────

fn req_str<'a>(args: &'a Args, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidParams(format!("argument '{name}' must be a string")))
}

fn opt_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn req_u64(args: &Args, name: &str) -> Result<u64> {
    args.get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidParams(format!("argument '{name}' must be a number")))
}

fn opt_u64(args: &Args, name: &str, default: u64) -> u64 {
    args.get(name).and_then(Value::as_u64).unwrap_or(default)
}

fn opt_bool(args: &Args, name: &str, default: bool) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(default)
}

// ── page evaluation helpers ─────────────────────────────────────────────

async fn eval(page: &Page, js: &str) -> Result<Value> {
    let result = page
        .evaluate(js)
        .await
        .map_err(|e| Error::Browser(format!("evaluation failed: {e}")))?;
    Ok(result.value().cloned().unwrap_or(Value::Null))
}

async fn eval_bool(page: &Page, js: &str) -> Result<bool> {
    Ok(eval(page, js).await?.as_bool().unwrap_or(false))
}

/// Embed a string into generated JavaScript as a quoted literal.
fn js_string(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

/// Validate a URL before navigation: parseable, http/https only.
fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::InvalidParams(format!("invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidParams(format!(
            "unsupported URL scheme '{scheme}', only http/https allowed"
        ))),
    }
}

// ── navigation ──────────────────────────────────────────────────────────

pub(crate) async fn navigate(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let url = req_str(args, "url")?;
    validate_url(url)?;

    page.goto(url)
        .await
        .map_err(|e| Error::Browser(format!("navigation failed: {e}")))?;
    let _ = page.wait_for_navigation().await;

    debug!(url, "navigated");
    Ok(ToolCallResult::text(format!(
        "Successfully navigated to {url}"
    )))
}

pub(crate) async fn go_back(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    eval(page, "history.back()").await?;
    let _ = page.wait_for_navigation().await;
    Ok(ToolCallResult::text("Navigated back"))
}

pub(crate) async fn go_forward(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    eval(page, "history.forward()").await?;
    let _ = page.wait_for_navigation().await;
    Ok(ToolCallResult::text("Navigated forward"))
}

pub(crate) async fn reload(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    page.reload()
        .await
        .map_err(|e| Error::Browser(format!("reload failed: {e}")))?;
    let _ = page.wait_for_navigation().await;
    Ok(ToolCallResult::text("Page reloaded"))
}

// ── capture ─────────────────────────────────────────────────────────────

pub(crate) async fn screenshot(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let name = opt_str(args, "name").unwrap_or("screenshot");
    let full_page = opt_bool(args, "fullPage", false);

    let bytes = page
        .screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(full_page)
                .build(),
        )
        .await
        .map_err(|e| Error::Browser(format!("screenshot failed: {e}")))?;

    debug!(bytes = bytes.len(), full_page, "took screenshot");

    Ok(ToolCallResult {
        content: vec![
            ContentItem::text(format!("Screenshot taken: {name}.png")),
            ContentItem::image(BASE64.encode(&bytes), "image/png"),
        ],
        is_error: false,
    })
}

pub(crate) async fn pdf(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let name = opt_str(args, "name").unwrap_or("page.pdf");

    let bytes = page
        .pdf(PrintToPdfParams::default())
        .await
        .map_err(|e| Error::Browser(format!("pdf generation failed: {e}")))?;

    let data = BASE64.encode(&bytes);
    Ok(ToolCallResult {
        content: vec![
            ContentItem::text(format!("PDF generated: {name}")),
            ContentItem::resource(
                format!("data:application/pdf;base64,{data}"),
                "application/pdf",
                data.clone(),
            ),
        ],
        is_error: false,
    })
}

// ── element interaction ─────────────────────────────────────────────────

pub(crate) async fn click(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;

    let element = page
        .find_element(selector)
        .await
        .map_err(|_| Error::ElementNotFound(selector.to_string()))?;
    element
        .click()
        .await
        .map_err(|e| Error::Browser(format!("click on '{selector}' failed: {e}")))?;

    Ok(ToolCallResult::text(format!("Clicked element: {selector}")))
}

pub(crate) async fn fill(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let value = req_str(args, "value")?;

    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.focus();
            el.value = {val};
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        sel = js_string(selector)?,
        val = js_string(value)?,
    );
    if !eval_bool(page, &js).await? {
        return Err(Error::ElementNotFound(selector.to_string()));
    }

    Ok(ToolCallResult::text(format!("Filled {selector} with value")))
}

pub(crate) async fn select(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let value = req_str(args, "value")?;

    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.value = {val};
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        sel = js_string(selector)?,
        val = js_string(value)?,
    );
    if !eval_bool(page, &js).await? {
        return Err(Error::ElementNotFound(selector.to_string()));
    }

    Ok(ToolCallResult::text(format!("Selected {value} in {selector}")))
}

pub(crate) async fn hover(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;

    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return null;
            const r = el.getBoundingClientRect();
            return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }};
        }})()"#,
        sel = js_string(selector)?,
    );
    let pos = eval(page, &js).await?;
    if pos.is_null() {
        return Err(Error::ElementNotFound(selector.to_string()));
    }
    let x = pos.get("x").and_then(Value::as_f64).unwrap_or(0.0);
    let y = pos.get("y").and_then(Value::as_f64).unwrap_or(0.0);

    let cmd = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MouseMoved)
        .x(x)
        .y(y)
        .build()
        .map_err(|e| Error::Browser(e.to_string()))?;
    page.execute(cmd).await?;

    Ok(ToolCallResult::text(format!("Hovered over {selector}")))
}

pub(crate) async fn press_key(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let key = req_str(args, "key")?;

    if let Some(selector) = opt_str(args, "selector") {
        let js = format!(
            "(() => {{ const el = document.querySelector({sel}); if (el) el.focus(); }})()",
            sel = js_string(selector)?,
        );
        eval(page, &js).await?;
    }

    let down = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyDown)
        .key(key)
        .build()
        .map_err(|e| Error::Browser(e.to_string()))?;
    page.execute(down).await?;

    let up = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyUp)
        .key(key)
        .build()
        .map_err(|e| Error::Browser(e.to_string()))?;
    page.execute(up).await?;

    Ok(ToolCallResult::text(format!("Pressed key: {key}")))
}

pub(crate) async fn type_text(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let text = req_str(args, "text")?;
    let delay = opt_u64(args, "delay", 0);

    let element = page
        .find_element(selector)
        .await
        .map_err(|_| Error::ElementNotFound(selector.to_string()))?;
    element
        .click()
        .await
        .map_err(|e| Error::Browser(format!("failed to focus '{selector}': {e}")))?;

    for c in text.chars() {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .text(c.to_string())
            .build()
            .map_err(|e| Error::Browser(e.to_string()))?;
        page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .text(c.to_string())
            .build()
            .map_err(|e| Error::Browser(e.to_string()))?;
        page.execute(up).await?;

        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    Ok(ToolCallResult::text(format!("Typed text into {selector}")))
}

pub(crate) async fn check(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    set_checked(page, selector, true).await?;
    Ok(ToolCallResult::text(format!("Checked {selector}")))
}

pub(crate) async fn uncheck(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    set_checked(page, selector, false).await?;
    Ok(ToolCallResult::text(format!("Unchecked {selector}")))
}

async fn set_checked(page: &Page, selector: &str, want: bool) -> Result<()> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            if (el.checked !== {want}) el.click();
            return true;
        }})()"#,
        sel = js_string(selector)?,
    );
    if !eval_bool(page, &js).await? {
        return Err(Error::ElementNotFound(selector.to_string()));
    }
    Ok(())
}

// ── reading page state ──────────────────────────────────────────────────

pub(crate) async fn get_content(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    let content = page
        .content()
        .await
        .map_err(|e| Error::Browser(format!("failed to read page content: {e}")))?;
    Ok(ToolCallResult::text(content))
}

pub(crate) async fn get_text(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;

    // A non-matching selector yields an empty string, not an error.
    let js = format!(
        "(() => {{ const el = document.querySelector({sel}); \
         return el && el.textContent ? el.textContent : ''; }})()",
        sel = js_string(selector)?,
    );
    let value = eval(page, &js).await?;
    Ok(ToolCallResult::text(
        value.as_str().unwrap_or_default().to_string(),
    ))
}

pub(crate) async fn get_attribute(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let attribute = req_str(args, "attribute")?;

    let js = format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return ''; const v = el.getAttribute({attr}); \
         return v === null ? '' : v; }})()",
        sel = js_string(selector)?,
        attr = js_string(attribute)?,
    );
    let value = eval(page, &js).await?;
    Ok(ToolCallResult::text(
        value.as_str().unwrap_or_default().to_string(),
    ))
}

pub(crate) async fn get_title(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    let title = page
        .get_title()
        .await
        .map_err(|e| Error::Browser(format!("failed to read title: {e}")))?
        .unwrap_or_default();
    Ok(ToolCallResult::text(title))
}

pub(crate) async fn get_url(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    let url = page
        .url()
        .await
        .map_err(|e| Error::Browser(format!("failed to read URL: {e}")))?
        .unwrap_or_default();
    Ok(ToolCallResult::text(url))
}

pub(crate) async fn is_visible(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const style = getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            return style.display !== 'none' && style.visibility !== 'hidden'
                && rect.width > 0 && rect.height > 0;
        }})()"#,
        sel = js_string(selector)?,
    );
    let visible = eval_bool(page, &js).await?;
    Ok(ToolCallResult::text(visible.to_string()))
}

pub(crate) async fn is_enabled(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let js = format!(
        "(() => {{ const el = document.querySelector({sel}); return el ? !el.disabled : false; }})()",
        sel = js_string(selector)?,
    );
    let enabled = eval_bool(page, &js).await?;
    Ok(ToolCallResult::text(enabled.to_string()))
}

pub(crate) async fn is_checked(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let js = format!(
        "(() => {{ const el = document.querySelector({sel}); return el ? !!el.checked : false; }})()",
        sel = js_string(selector)?,
    );
    let checked = eval_bool(page, &js).await?;
    Ok(ToolCallResult::text(checked.to_string()))
}

pub(crate) async fn count_elements(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let js = format!(
        "document.querySelectorAll({sel}).length",
        sel = js_string(selector)?,
    );
    let count = eval(page, &js).await?.as_u64().unwrap_or(0);
    Ok(ToolCallResult::text(count.to_string()))
}

// ── waiting ─────────────────────────────────────────────────────────────

pub(crate) async fn wait_for_selector(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let selector = req_str(args, "selector")?;
    let timeout_ms = opt_u64(args, "timeout", 30000);

    let check = format!(
        "document.querySelector({sel}) !== null",
        sel = js_string(selector)?,
    );
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if eval_bool(page, &check).await? {
            return Ok(ToolCallResult::text(format!("Element {selector} appeared")));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Err(Error::Timeout(format!(
        "element '{selector}' not found after {timeout_ms}ms"
    )))
}

pub(crate) async fn wait_for_timeout(_page: &Page, args: &Args) -> Result<ToolCallResult> {
    let timeout_ms = req_u64(args, "timeout")?;
    tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
    Ok(ToolCallResult::text(format!("Waited {timeout_ms}ms")))
}

// ── script evaluation ───────────────────────────────────────────────────

pub(crate) async fn evaluate(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let script = req_str(args, "script")?;

    // Caller-supplied code runs with full page privileges; the catalog
    // description and the transport auth gate are the trust boundary.
    let value = eval(page, script).await?;
    let rendered = serde_json::to_string(&value)?;
    Ok(ToolCallResult::text(format!(
        "Script executed. Result: {rendered}"
    )))
}

// ── cookies & viewport ──────────────────────────────────────────────────

pub(crate) async fn get_cookies(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    let cookies = page
        .get_cookies()
        .await
        .map_err(|e| Error::Browser(format!("failed to read cookies: {e}")))?;
    Ok(ToolCallResult::text(serde_json::to_string_pretty(&cookies)?))
}

pub(crate) async fn set_cookie(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let name = req_str(args, "name")?;
    let value = req_str(args, "value")?;

    let url = page
        .url()
        .await
        .map_err(|e| Error::Browser(format!("failed to read URL: {e}")))?
        .unwrap_or_default();

    let mut builder = CookieParam::builder().name(name).value(value).url(url);
    if let Some(domain) = opt_str(args, "domain") {
        builder = builder.domain(domain);
    }
    if let Some(path) = opt_str(args, "path") {
        builder = builder.path(path);
    }
    let cookie = builder.build().map_err(|e| Error::Browser(e.to_string()))?;

    page.set_cookie(cookie)
        .await
        .map_err(|e| Error::Browser(format!("failed to set cookie '{name}': {e}")))?;

    Ok(ToolCallResult::text(format!("Cookie {name} set")))
}

pub(crate) async fn delete_cookies(page: &Page, _args: &Args) -> Result<ToolCallResult> {
    page.execute(ClearBrowserCookiesParams::default()).await?;
    Ok(ToolCallResult::text("All cookies deleted"))
}

pub(crate) async fn set_viewport(page: &Page, args: &Args) -> Result<ToolCallResult> {
    let width = req_u64(args, "width")?;
    let height = req_u64(args, "height")?;

    let cmd = SetDeviceMetricsOverrideParams::builder()
        .width(width as i64)
        .height(height as i64)
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(|e| Error::Browser(e.to_string()))?;
    page.execute(cmd).await?;

    Ok(ToolCallResult::text(format!(
        "Viewport set to {width}x{height}"
    )))
}
