//! Icon projection for a day cell.

use serde::{Deserialize, Serialize};

use crate::note::NoteRecord;

/// Options the presentation layer passes when asking for a day's symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub tag_symbols: Vec<TagSymbol>,
    /// Include symbols configured on custom date properties and task markers.
    pub show_property_symbols: bool,
    pub max_symbols: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tag_symbols: Vec::new(),
            show_property_symbols: true,
            max_symbols: 3,
        }
    }
}

/// Draw `symbol` for notes carrying `tag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSymbol {
    pub tag: String,
    pub symbol: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySymbol {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Symbols for `notes` in note order: a note's own symbol first, then any tag
/// rules it matches. Each symbol appears once; the result is capped at
/// `max_symbols`.
pub fn project_symbols(notes: &[NoteRecord], options: &RenderOptions) -> Vec<DisplaySymbol> {
    let mut out: Vec<DisplaySymbol> = Vec::new();

    let candidates = notes.iter().flat_map(|note| {
        let own = options
            .show_property_symbols
            .then(|| note.symbol.clone())
            .flatten()
            .map(|symbol| DisplaySymbol {
                symbol,
                color: note.color.clone(),
            });
        let tagged = options
            .tag_symbols
            .iter()
            .filter(|rule| {
                let wanted = rule.tag.trim_start_matches('#');
                note.tags.iter().any(|t| t.eq_ignore_ascii_case(wanted))
            })
            .map(|rule| DisplaySymbol {
                symbol: rule.symbol.clone(),
                color: rule.color.clone().or_else(|| note.color.clone()),
            });
        own.into_iter().chain(tagged)
    });

    for candidate in candidates {
        if out.len() >= options.max_symbols {
            break;
        }
        if !out.iter().any(|s| s.symbol == candidate.symbol) {
            out.push(candidate);
        }
    }
    out
}
