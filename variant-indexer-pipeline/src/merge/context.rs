//! Parameters of one import run.

/// Label value meaning "no cohort label".
pub const NO_LABEL: &str = "None";

/// Target and mode of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Target index; part of every document id.
    pub index: String,
    /// Target document type; part of every document id.
    pub doc_type: String,
    /// Cohort label attached to run-dependent values and samples.
    pub label: Option<String>,
    /// Merge into existing documents instead of always creating.
    pub update: bool,
}

impl RunContext {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        label: Option<String>,
        update: bool,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            label,
            update,
        }
    }

    /// Interpret a raw label parameter; `None` and blank mean unlabelled.
    pub fn parse_label(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == NO_LABEL {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
