use serde::Deserialize;

use crate::config::TextsConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// One numbered FAQ entry: a primary link and an optional second one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandEntry {
    pub key: String,
    pub primary: Link,
    #[serde(default)]
    pub secondary: Option<Link>,
}

impl CommandEntry {
    /// `*label*\nurl`, a second block when present, then the back-to-menu footer.
    pub fn render(&self, texts: &TextsConfig) -> String {
        let mut body = format!("*{}*\n{}", self.primary.label, self.primary.url);
        if let Some(secondary) = &self.secondary {
            body.push_str(&format!("\n\n*{}*\n{}", secondary.label, secondary.url));
        }
        body.push_str(&texts.entry_footer);
        body
    }
}

/// The static FAQ table, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Build the table, rejecting empty or duplicate keys.
    pub fn new(entries: Vec<CommandEntry>) -> Result<Self, ConfigError> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() || entry.key.trim() != entry.key {
                return Err(ConfigError::InvalidValue {
                    key: format!("commands[{i}].key"),
                    message: format!(
                        "{:?} must be non-empty and without surrounding whitespace",
                        entry.key
                    ),
                });
            }
            if entries[..i].iter().any(|e| e.key == entry.key) {
                return Err(ConfigError::InvalidValue {
                    key: format!("commands[{i}].key"),
                    message: format!("duplicate key {:?}", entry.key),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, key: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header, one `"{key}. {label}"` line per entry, footer.
    pub fn render_menu(&self, texts: &TextsConfig) -> String {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}. {}", e.key, e.primary.label))
            .collect();
        format!("{}{}{}", texts.menu_header, lines.join("\n"), texts.menu_footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, label: &str, secondary: Option<(&str, &str)>) -> CommandEntry {
        CommandEntry {
            key: key.to_string(),
            primary: Link::new(label, format!("https://example.com/{key}")),
            secondary: secondary.map(|(l, u)| Link::new(l, u)),
        }
    }

    #[test]
    fn test_render_single_link() {
        let texts = TextsConfig::default();
        let body = entry("3", "Lokasi", None).render(&texts);
        assert_eq!(
            body,
            "*Lokasi*\nhttps://example.com/3\n\nKetik *menu* untuk kembali ke daftar FAQ."
        );
    }

    #[test]
    fn test_render_two_links() {
        let texts = TextsConfig::default();
        let e = CommandEntry {
            key: "1".to_string(),
            primary: Link::new("text", "u1"),
            secondary: Some(Link::new("text", "u2")),
        };
        assert_eq!(
            e.render(&texts),
            "*text*\nu1\n\n*text*\nu2\n\nKetik *menu* untuk kembali ke daftar FAQ."
        );
    }

    #[test]
    fn test_menu_lists_entries_in_order() {
        let texts = TextsConfig::default();
        let table = CommandTable::new(vec![
            entry("2", "Jadwal", None),
            entry("1", "Biaya", Some(("Beasiswa", "https://example.com/b"))),
        ])
        .unwrap();

        let menu = table.render_menu(&texts);
        assert!(menu.starts_with("📌 *Daftar FAQ*\n\n2. Jadwal\n1. Biaya\n\n"));
        assert!(menu.contains("/ai"));
        assert!(!menu.contains("Beasiswa"));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let table = CommandTable::new(vec![entry("a1", "Alpha", None)]).unwrap();
        assert!(table.get("a1").is_some());
        assert!(table.get("A1").is_none());
        assert!(table.get("a1 ").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_and_blank_keys() {
        assert!(CommandTable::new(vec![entry("1", "A", None), entry("1", "B", None)]).is_err());
        assert!(CommandTable::new(vec![entry(" ", "A", None)]).is_err());
        assert!(CommandTable::new(vec![entry(" 1", "A", None)]).is_err());
        assert!(CommandTable::new(Vec::new()).unwrap().is_empty());
    }
}
