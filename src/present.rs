use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use url::form_urlencoded;

use crate::generate::GenerationResult;

pub const SEQUENCE_DIAGRAM_BASE_URL: &str = "https://sequencediagram.org/index.html";
pub const LINK_QUERY_PARAM: &str = "initialData";
pub const LINK_LABEL: &str = "Open in SequenceDiagram.org";
pub const DOWNLOAD_FILE_NAME: &str = "sequence_diagram.txt";
pub const DOWNLOAD_MIME: &str = "text/plain";
pub const REASONING_HEADING: &str = "Agent reasoning";
pub const DIAGRAM_HEADING: &str = "Sequence Diagram Code";

/// Deep link that opens `markup` in sequencediagram.org.
///
/// Uses form encoding (space becomes `+`). Length is not checked; very long
/// diagrams can produce links some browsers or servers refuse.
pub fn sequence_diagram_link(markup: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(markup.as_bytes()).collect();
    format!("{SEQUENCE_DIAGRAM_BASE_URL}?{LINK_QUERY_PARAM}={encoded}")
}

/// What every UI surface renders for one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation<'a> {
    pub reasoning: Option<&'a str>,
    pub diagram_markup: &'a str,
    pub link: String,
}

impl<'a> Presentation<'a> {
    pub fn new(result: &'a GenerationResult, show_reasoning: bool) -> Self {
        let reasoning = result
            .reasoning()
            .filter(|text| show_reasoning && !text.trim().is_empty());

        Self {
            reasoning,
            diagram_markup: result.diagram_markup(),
            link: result.outbound_link(),
        }
    }

    pub fn download(&self) -> DownloadArtifact<'a> {
        DownloadArtifact {
            file_name: DOWNLOAD_FILE_NAME,
            mime: DOWNLOAD_MIME,
            content: self.diagram_markup,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(reasoning) = self.reasoning {
            let _ = writeln!(out, "== {REASONING_HEADING} ==");
            let _ = writeln!(out, "{reasoning}");
            out.push('\n');
        }
        let _ = writeln!(out, "== {DIAGRAM_HEADING} ==");
        let _ = writeln!(out, "{}", self.diagram_markup);
        out.push('\n');
        let _ = writeln!(out, "{LINK_LABEL}: {}", self.link);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadArtifact<'a> {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub content: &'a str,
}

impl DownloadArtifact<'_> {
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.content)
            .with_context(|| format!("failed to write diagram to `{}`", path.display()))
    }
}
