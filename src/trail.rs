use std::fmt::Display;

use tracing::Span;

/// Human readable record of the branches taken during one validation run.
pub struct Trail {
    span: Span,
    entries: Vec<String>,
}

impl Trail {
    pub fn new(domain: &str) -> Self {
        Trail {
            span: tracing::info_span!("sts-verify", domain = domain),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, event: &'static str, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!(
            parent: &self.span,
            context = "sts",
            event = event,
            "{}",
            entry
        );
        self.entries.push(entry);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|entry| entry.contains(needle))
    }
}

impl Display for Trail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            write!(f, "{}; ", entry)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Trail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}
