//! HTML for the single analysis page.
//!
//! Two columns: the article form, verdict, and token highlights on the left;
//! model metrics and the probability split on the right.

use std::fmt::Write;

use credence_ai::Analysis;
use credence_core::Label;
use credence_core::highlight::escape_html;

const TITLE: &str = "Article Credibility Classification System";

const INTRO: &str = "Uses a <strong>BERT</strong> classifier to assess the credibility of an \
    English-language article and <strong>explainable AI</strong> to show how individual tokens \
    influenced the decision.";

const ATTRIBUTION_CAPTION: &str = "The text below shows how each word influenced the model. \
    Red pushes toward FAKE, green toward REAL; stronger colour means stronger influence.";

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 0; }
    .block-container { max-width: 1200px; margin: 0 auto; padding: 2rem 1rem; }
    h1 { font-size: 2.2rem; }
    hr { border: none; border-top: 1px solid #ddd; margin: 1.5rem 0; }
    .columns { display: grid; grid-template-columns: 2fr 1fr; gap: 2rem; }
    textarea { width: 100%; height: 250px; box-sizing: border-box; font-size: 14px; }
    button.primary { background: #ff4b4b; color: #fff; border: none; border-radius: 6px;
        padding: 0.5rem 1rem; margin-top: 0.5rem; cursor: pointer; }
    button.primary:disabled { opacity: 0.6; cursor: wait; }
    .alert { padding: 0.5rem 0.75rem; border-radius: 6px; margin: 0.5rem 0; }
    .alert-error { background: #ffe0e0; color: #7d0000; }
    .alert-success { background: #dcf5e0; color: #0b5d1e; }
    .alert-info { background: #e0ecff; color: #0b3a7d; }
    .caption { color: #666; font-size: 0.85rem; }
    .metric { font-family: monospace; margin: 0.25rem 0; }
    progress { width: 100%; height: 0.8rem; }
    .highlight-text { line-height: 1.6; font-family: monospace; font-size: 14px; }
"#;

/// What to show on one render of the page.
#[derive(Default)]
pub struct PageView<'a> {
    /// Article text echoed back into the textarea.
    pub text: &'a str,
    /// Model failed to load; analyses are disabled.
    pub init_error: Option<&'a str>,
    /// The last analysis request failed.
    pub error: Option<&'a str>,
    pub analysis: Option<&'a Analysis>,
}

// ── Public API ──

/// Render the full HTML document.
pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_page(&mut html, view);
    html
}

/// `0.9712` → `"97.12%"`.
pub fn percent(p: f32) -> String {
    format!("{:.2}%", p * 100.0)
}

// ── Sections ──

fn write_page(html: &mut String, view: &PageView<'_>) -> std::fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, r#"<html lang="en"><head><meta charset="utf-8">"#)?;
    writeln!(html, "<title>Credibility Check</title>")?;
    writeln!(html, "<style>{STYLE}</style></head>")?;
    writeln!(html, r#"<body><div class="block-container">"#)?;
    writeln!(html, "<h1>{TITLE}</h1>")?;
    writeln!(html, "<p>{INTRO}</p><hr>")?;

    if let Some(msg) = view.init_error {
        let body = format!("Model initialisation error: {}", escape_html(msg));
        write_alert(html, "alert-error", &body)?;
    }

    writeln!(html, r#"<div class="columns">"#)?;

    writeln!(html, "<div>")?;
    write_form(html, view)?;
    if let Some(msg) = view.error {
        let body = format!("Analysis failed: {}", escape_html(msg));
        write_alert(html, "alert-error", &body)?;
    }
    if let Some(analysis) = view.analysis {
        write_result(html, analysis)?;
    }
    writeln!(html, "</div>")?;

    writeln!(html, "<div>")?;
    if let Some(analysis) = view.analysis {
        write_metrics(html, analysis)?;
    }
    writeln!(html, "</div>")?;

    writeln!(html, "</div></div></body></html>")
}

fn write_form(html: &mut String, view: &PageView<'_>) -> std::fmt::Result {
    let disabled = if view.init_error.is_some() { " disabled" } else { "" };
    writeln!(
        html,
        r#"<form method="post" action="/" onsubmit="this.querySelector('button').disabled = true; document.getElementById('busy').hidden = false;">"#
    )?;
    writeln!(html, r#"<label for="text">Enter the article text (English):</label>"#)?;
    writeln!(
        html,
        r#"<textarea id="text" name="text">{}</textarea>"#,
        escape_html(view.text)
    )?;
    writeln!(
        html,
        r#"<button type="submit" class="primary"{disabled}>Run analysis</button>"#
    )?;
    writeln!(html, r#"<span id="busy" class="caption" hidden> Processing...</span>"#)?;
    writeln!(html, "</form>")
}

fn write_result(html: &mut String, analysis: &Analysis) -> std::fmt::Result {
    let prediction = &analysis.prediction;
    let class = match prediction.label {
        Label::Fake => "alert-error",
        Label::Real => "alert-success",
    };

    writeln!(html, "<h3>Classification Result</h3>")?;
    write_alert(
        html,
        class,
        &format!(
            "<strong>{}</strong> (Confidence: {})",
            prediction.label.verdict(),
            percent(prediction.confidence)
        ),
    )?;
    writeln!(html, "<hr><h3>Token Attribution Analysis</h3>")?;
    writeln!(html, r#"<p class="caption">{ATTRIBUTION_CAPTION}</p>"#)?;
    writeln!(html, "{}", analysis.highlighted)
}

fn write_metrics(html: &mut String, analysis: &Analysis) -> std::fmt::Result {
    let prediction = &analysis.prediction;

    writeln!(html, "<h3>Model Metrics</h3>")?;
    write_alert(
        html,
        "alert-info",
        &format!("Inference time: {:.1} ms", analysis.elapsed_ms()),
    )?;

    let truncated = if analysis.truncated {
        " (model input truncated)"
    } else {
        ""
    };
    writeln!(
        html,
        r#"<p class="metric">Token count: {}{truncated}</p>"#,
        analysis.token_count
    )?;
    writeln!(html, r#"<p class="metric">Device: {}</p>"#, analysis.device)?;

    writeln!(html, "<p>Probability distribution:</p>")?;
    write_probability(html, Label::Real, prediction.prob_real)?;
    write_probability(html, Label::Fake, prediction.prob_fake)
}

// ── Helpers ──

fn write_alert(html: &mut String, class: &str, body: &str) -> std::fmt::Result {
    writeln!(html, r#"<div class="alert {class}">{body}</div>"#)
}

fn write_probability(html: &mut String, label: Label, p: f32) -> std::fmt::Result {
    let p = p.clamp(0.0, 1.0);
    writeln!(
        html,
        r#"<div><span>{label}: {}</span><progress max="1" value="{p:.4}"></progress></div>"#,
        percent(p)
    )
}
