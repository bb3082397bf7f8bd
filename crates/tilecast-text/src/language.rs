//! Language identification seam

/// Assigns a language code to a piece of text
pub trait LanguageIdentifier: Send + Sync {
    fn identify(&self, text: &str) -> Option<String>;
}

/// Always answers with the same language
#[derive(Debug, Clone)]
pub struct FixedLanguage(pub String);

impl LanguageIdentifier for FixedLanguage {
    fn identify(&self, _text: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Classifies by writing system: Arabic script -> `ar`, Latin -> `en`
#[derive(Debug, Clone, Default)]
pub struct ScriptLanguageIdentifier;

fn is_arabic(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

impl LanguageIdentifier for ScriptLanguageIdentifier {
    fn identify(&self, text: &str) -> Option<String> {
        let mut arabic = 0usize;
        let mut latin = 0usize;
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            if is_arabic(c) {
                arabic += 1;
            } else if c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c) {
                latin += 1;
            }
        }

        if arabic == 0 && latin == 0 {
            None
        } else if arabic > latin {
            Some("ar".to_string())
        } else {
            Some("en".to_string())
        }
    }
}
