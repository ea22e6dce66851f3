use crate::library::{self, PI_NAME};
use hashbrown::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref STANDARD: Arc<Vocabulary> = Arc::new(Vocabulary::load());
}

/// The set of function and constant names the rewriter qualifies.
///
/// Names are canonical and case sensitive (`sin`, `PI`). Lookups made by the
/// rewriter go through the lower-cased form, since formulas are lower-cased
/// before rewriting. A vocabulary never changes once built.
///
/// # Examples
///
/// ```
/// # use calcfn::Vocabulary;
/// let vocabulary = Vocabulary::standard();
/// assert!(vocabulary.contains("sqrt"));
/// assert_eq!(vocabulary.canonical("pi"), Some("PI"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    names: Vec<&'static str>,
    lowered: HashMap<String, usize>,
}

impl Vocabulary {
    /// Enumerate the public surface of the math library, plus π.
    #[must_use]
    pub fn load() -> Self {
        let names = library::EXPORTS.iter().map(|export| export.name);
        let vocabulary = Self::from_names(names.chain(std::iter::once(PI_NAME)));
        debug!("loaded vocabulary with {} names", vocabulary.len());
        vocabulary
    }

    /// The process-wide vocabulary, loaded on first use.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD)
    }

    /// Build a vocabulary from an explicit list of names. Duplicates are
    /// dropped, keeping the first occurrence.
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        let mut vocabulary = Self::default();
        for name in names {
            if vocabulary.names.contains(&name) {
                continue;
            }
            let lowered = name.to_lowercase();
            if vocabulary.lowered.contains_key(&lowered) {
                // `E` and a hypothetical `e` would both fold to the same name
                warn!("vocabulary name {} shadowed by an earlier entry", name);
                continue;
            }
            vocabulary.lowered.insert(lowered, vocabulary.names.len());
            vocabulary.names.push(name);
        }
        vocabulary
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check if `name` is an entry, comparing case sensitively.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|entry| *entry == name)
    }

    /// Canonical spelling of a lower-cased name, if it is an entry.
    #[must_use]
    pub fn canonical(&self, lowered: &str) -> Option<&'static str> {
        self.lowered.get(lowered).map(|&index| self.names[index])
    }

    /// Entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::Vocabulary;
    use test_case::test_case;

    #[test_case("sin" ; "trigonometry")]
    #[test_case("sqrt" ; "roots")]
    #[test_case("pow" ; "binary function")]
    #[test_case("abs" ; "abs")]
    #[test_case("floor" ; "floor")]
    #[test_case("ceil" ; "ceil")]
    #[test_case("log" ; "log")]
    #[test_case("exp" ; "exp")]
    #[test_case("min" ; "min")]
    #[test_case("max" ; "max")]
    #[test_case("PI" ; "pi constant")]
    fn standard_contains(name: &str) {
        assert!(Vocabulary::standard().contains(name));
    }

    #[test]
    fn canonical_names() {
        let vocabulary = Vocabulary::load();
        assert_eq!(vocabulary.canonical("pi"), Some("PI"));
        assert_eq!(vocabulary.canonical("e"), Some("E"));
        assert_eq!(vocabulary.canonical("sin"), Some("sin"));
        assert_eq!(vocabulary.canonical("PI"), None);
        assert_eq!(vocabulary.canonical("banana"), None);
    }

    #[test]
    fn names_are_unique() {
        let vocabulary = Vocabulary::from_names(vec!["sin", "cos", "sin", "PI"]);
        assert_eq!(vocabulary.iter().collect::<Vec<_>>(), vec!["sin", "cos", "PI"]);
        assert_eq!(vocabulary.len(), 3);
    }

    #[test]
    fn empty_is_valid() {
        let vocabulary = Vocabulary::from_names(Vec::new());
        assert!(vocabulary.is_empty());
        assert_eq!(vocabulary.canonical("sin"), None);
    }

    #[test]
    fn standard_is_cached() {
        let first = Vocabulary::standard();
        let second = Vocabulary::standard();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }
}
