//! Bloom season trait (`floracio`): selected seasons plus an optional
//! free-text qualifier, stored as `"Primavera, Estiu (a l'ombra)"`.

/// Parsed form of the `floracio` trait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BloomSpec {
    pub seasons: Vec<String>,
    pub qualifier: Option<String>,
}

impl BloomSpec {
    /// Render to the stored text. No seasons renders as `None`, even when
    /// a qualifier is set.
    pub fn render(&self) -> Option<String> {
        if self.seasons.is_empty() {
            return None;
        }
        let mut text = self.seasons.join(", ");
        if let Some(qualifier) = self.qualifier.as_deref().filter(|q| !q.is_empty()) {
            text.push_str(" (");
            text.push_str(qualifier);
            text.push(')');
        }
        Some(text)
    }

    /// Split stored text back into seasons and qualifier.
    ///
    /// The qualifier is everything between the first `(` and a closing `)`
    /// that ends the text.
    pub fn parse(text: &str) -> Self {
        let (seasons_part, qualifier) = match (text.find('('), text.ends_with(')')) {
            (Some(open), true) => (
                text[..open].trim_end(),
                Some(text[open + 1..text.len() - 1].to_string()),
            ),
            _ => (text, None),
        };

        let seasons = seasons_part
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self { seasons, qualifier }
    }
}
