use std::fmt::Write as _;

use url::form_urlencoded;

use crate::generate::Severity;
use crate::input::{BackendChoice, CREDENTIAL_HELP, DESCRIPTION_PLACEHOLDER};
use crate::present::{
    DIAGRAM_HEADING, DOWNLOAD_FILE_NAME, LINK_LABEL, Presentation, REASONING_HEADING,
};

pub const PAGE_TITLE: &str = "AI Architect - Sequence Diagram Generator";
pub const APP_HEADING: &str = "Software Architect AI Agent";
const INTRO: &str = "Enter any <strong>system or feature description</strong> below. The agent will think through the logic and generate <strong>sequencediagram.org</strong> code for you.";

/// Form values echoed back into the page. The credential is never echoed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormEcho {
    pub backend: BackendChoice,
    pub description: String,
    pub show_reasoning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

pub fn render_page(
    echo: &FormEcho,
    notice: Option<&Notice>,
    presentation: Option<&Presentation<'_>>,
) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
        html_escape(PAGE_TITLE),
        STYLE
    );

    out.push_str("<form method=\"post\" action=\"/generate\">\n");
    render_sidebar(&mut out, echo.backend);
    out.push_str("<main>\n");
    let _ = writeln!(out, "<h1>{}</h1>\n<p>{INTRO}</p>", html_escape(APP_HEADING));
    let _ = writeln!(
        out,
        "<label for=\"description\">System / Feature description</label>\n<textarea id=\"description\" name=\"description\" rows=\"12\" placeholder=\"{}\">{}</textarea>",
        html_escape(DESCRIPTION_PLACEHOLDER),
        html_escape(&echo.description)
    );
    let checked = if echo.show_reasoning { " checked" } else { "" };
    let _ = writeln!(
        out,
        "<label><input type=\"checkbox\" name=\"show_reasoning\" value=\"on\"{checked}> Show agent reasoning (extra API cost)</label>\n<button type=\"submit\">Generate Diagram</button>"
    );

    if let Some(notice) = notice {
        let class = match notice.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        let _ = writeln!(
            out,
            "<div class=\"notice {class}\">{}</div>",
            html_escape(&notice.message)
        );
    }

    if let Some(presentation) = presentation {
        render_result(&mut out, presentation);
    }

    out.push_str("</main>\n</form>\n</body>\n</html>\n");
    out
}

fn render_sidebar(out: &mut String, selected: BackendChoice) {
    out.push_str("<aside>\n<label for=\"backend\">LLM backend</label>\n<select id=\"backend\" name=\"backend\">\n");
    for choice in BackendChoice::ALL {
        let selected_attr = if choice == selected { " selected" } else { "" };
        let _ = writeln!(
            out,
            "<option value=\"{}\"{selected_attr}>{}</option>",
            choice.as_str(),
            html_escape(choice.label())
        );
    }
    let _ = writeln!(
        out,
        "</select>\n<label for=\"api_key\">OpenAI API Key</label>\n<input id=\"api_key\" name=\"api_key\" type=\"password\" autocomplete=\"off\">\n<small>{} Only used with the OpenAI backend.</small>\n</aside>",
        html_escape(CREDENTIAL_HELP)
    );
}

fn render_result(out: &mut String, presentation: &Presentation<'_>) {
    if let Some(reasoning) = presentation.reasoning {
        let _ = writeln!(
            out,
            "<details><summary>{}</summary><pre>{}</pre></details>",
            html_escape(REASONING_HEADING),
            html_escape(reasoning)
        );
    }

    let download_query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("diagram_markup", presentation.diagram_markup)
        .finish();
    let _ = writeln!(
        out,
        "<h2>{}</h2>\n<pre class=\"code\">{}</pre>\n<p><a href=\"/download?{}\" download=\"{DOWNLOAD_FILE_NAME}\">Download diagram code</a></p>\n<p><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></p>",
        html_escape(DIAGRAM_HEADING),
        html_escape(presentation.diagram_markup),
        html_escape(&download_query),
        html_escape(&presentation.link),
        html_escape(LINK_LABEL)
    );
}

pub fn html_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

const STYLE: &str = "body{margin:0;display:flex;font-family:sans-serif}\
form{display:flex;width:100%}\
aside{width:260px;padding:1rem;background:#f0f2f6;display:flex;flex-direction:column;gap:.5rem}\
main{flex:1;padding:1rem 2rem;display:flex;flex-direction:column;gap:.75rem;max-width:960px}\
textarea{width:100%;font-family:inherit}\
pre{white-space:pre-wrap;background:#f6f8fa;padding:.75rem}\
.notice{padding:.75rem;border-radius:4px}\
.info{background:#e8f4fd}\
.warning{background:#fff8e1}\
.error{background:#fdecea}";
