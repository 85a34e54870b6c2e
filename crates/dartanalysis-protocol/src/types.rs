//! Shapes shared by commands and notifications

use serde::{Deserialize, Serialize};

/// Analysis services a client can subscribe to per file or folder
///
/// Serialized in upper case (`HIGHLIGHTS`) as keys of the
/// `analysis.setSubscriptions` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisSubscription {
    /// `analysis.highlights` notifications
    Highlights,
    /// `analysis.navigation` notifications
    Navigation,
    /// `analysis.outline` notifications
    Outline,
}

impl AnalysisSubscription {
    /// All subscribable analysis services
    pub const ALL: [AnalysisSubscription; 3] = [Self::Highlights, Self::Navigation, Self::Outline];

    /// Wire name of the service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highlights => "HIGHLIGHTS",
            Self::Navigation => "NAVIGATION",
            Self::Outline => "OUTLINE",
        }
    }
}

/// Server-wide services a client can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerService {
    /// `server.status` notifications
    Status,
}

/// Severity of an analysis error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    /// Hint or lint
    Info,
    /// Warning
    Warning,
    /// Compile-time error
    Error,
}

/// A range within a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Absolute file path
    pub file: String,

    /// Character offset of the range
    pub offset: usize,

    /// Length of the range
    pub length: usize,

    /// One-based line of the start of the range
    #[serde(default)]
    pub start_line: usize,

    /// One-based column of the start of the range
    #[serde(default)]
    pub start_column: usize,
}

/// A diagnostic reported against a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisErrorInfo {
    /// Severity
    pub severity: ErrorSeverity,

    /// Error category, e.g. `COMPILE_TIME_ERROR`
    #[serde(rename = "type")]
    pub kind: String,

    /// Where the problem is
    pub location: Location,

    /// Description of the problem
    pub message: String,

    /// Suggested fix, if the server has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

/// A highlighted range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRegion {
    /// Highlight kind, e.g. `KEYWORD` or `CLASS`
    #[serde(rename = "type")]
    pub kind: String,

    /// Character offset of the region
    pub offset: usize,

    /// Length of the region
    pub length: usize,
}

/// A navigable range and the indices of its targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRegion {
    /// Character offset of the region
    pub offset: usize,

    /// Length of the region
    pub length: usize,

    /// Indices into the notification's `targets`
    #[serde(default)]
    pub targets: Vec<usize>,
}

/// Destination of a navigation region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTarget {
    /// Element kind of the target
    pub kind: String,

    /// Index into the notification's `files`
    pub file_index: usize,

    /// Offset of the target name
    pub offset: usize,

    /// Length of the target name
    pub length: usize,

    /// One-based line of the target
    #[serde(default)]
    pub start_line: usize,

    /// One-based column of the target
    #[serde(default)]
    pub start_column: usize,
}

/// A declared program element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element kind, e.g. `CLASS`, `METHOD`
    pub kind: String,

    /// Element name
    pub name: String,

    /// Where the element is declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Bit set of element flags (abstract, const, final, ...)
    #[serde(default)]
    pub flags: u32,

    /// Parameter list, for executables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,

    /// Return type, for executables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

/// Node of a file outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Element the node describes
    pub element: Element,

    /// Offset of the node's full range
    pub offset: usize,

    /// Length of the node's full range
    pub length: usize,

    /// Nested nodes
    #[serde(default)]
    pub children: Vec<Outline>,
}

impl Outline {
    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Outline::node_count).sum::<usize>()
    }
}

/// Replacement of a range of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEdit {
    /// Offset of the replaced range
    pub offset: usize,

    /// Length of the replaced range
    pub length: usize,

    /// Replacement text
    pub replacement: String,
}

/// Overlay change for one file in `analysis.updateContent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentChange {
    /// Replace the file contents with an overlay
    Add {
        /// Full overlay contents
        content: String,
    },
    /// Apply edits to the existing overlay
    Change {
        /// Edits, applied in order
        edits: Vec<SourceEdit>,
    },
    /// Drop the overlay and fall back to disk
    Remove,
}
