/// Build the URL-safe identifier for a recipe title.
///
/// Lowercases, folds the accented Latin letters found in French and Spanish
/// titles to their base letter, and collapses every run of characters outside
/// `[a-z0-9]` into a single hyphen. Leading and trailing hyphens are trimmed.
/// The function is total: any input yields a (possibly empty) slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_title() {
        assert_eq!(slugify("Persian Love Rice"), "persian-love-rice");
    }

    #[test]
    fn test_accents_and_punctuation() {
        assert_eq!(slugify("Crème Brûlée!"), "creme-brulee");
        assert_eq!(slugify("Piña Colada"), "pina-colada");
        assert_eq!(slugify("Gâteau à l'Ÿ"), "gateau-a-l-y");
    }

    #[test]
    fn test_collapses_and_trims_separators() {
        assert_eq!(slugify("  --Tart   Tatin--  "), "tart-tatin");
        assert_eq!(slugify("Fish & Chips (UK)"), "fish-chips-uk");
        assert_eq!(slugify("Top 10 Recipes"), "top-10-recipes");
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn test_idempotent() {
        for title in ["Crème Brûlée!", "Persian Love Rice", "a--b", "Ça va?"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once);
            assert!(!once.starts_with('-'));
            assert!(!once.ends_with('-'));
            assert!(!once.contains("--"));
        }
    }
}
