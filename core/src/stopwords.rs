//! Language-keyed stopword sets, resolved once per build.

use crate::config::TokenizerConfig;
use crate::tokenizer::normalize;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;

const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

const FRENCH: &[&str] = &[
    "au","aux","avec","ce","ces","dans","de","des","du","elle","en","et","eux","il","ils","je","la","le","les",
    "leur","lui","ma","mais","me","même","mes","moi","mon","ne","nos","notre","nous","on","ou","par","pas",
    "pour","qu","que","qui","sa","se","ses","son","sur","ta","te","tes","toi","ton","tu","un","une","vos",
    "votre","vous","c","d","j","l","à","m","n","s","t","y","été","étée","étées","étés","étant","étante",
    "étants","étantes","suis","es","est","sommes","êtes","sont","serai","seras","sera","serons","serez",
    "seront","serais","serait","serions","seriez","seraient","étais","était","étions","étiez","étaient",
    "fus","fut","fûmes","fûtes","furent","sois","soit","soyons","soyez","soient","fusse","fusses","fût",
    "fussions","fussiez","fussent","ayant","ayante","ayantes","ayants","eu","eue","eues","eus","ai","as",
    "avons","avez","ont","aurai","auras","aura","aurons","aurez","auront","aurais","aurait","aurions",
    "auriez","auraient","avais","avait","avions","aviez","avaient","eut","eûmes","eûtes","eurent","aie",
    "aies","ait","ayons","ayez","aient","eusse","eusses","eût","eussions","eussiez","eussent",
];

/// Immutable mapping from language name to its stopword set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopwordSets {
    sets: BTreeMap<String, HashSet<String>>,
    default_language: String,
    enabled: bool,
}

impl StopwordSets {
    /// Built-in sets only; `stopword_dir` is ignored.
    pub fn builtin(config: &TokenizerConfig) -> Self {
        let mut sets = StopwordSets {
            sets: BTreeMap::new(),
            default_language: config.default_language.to_lowercase(),
            enabled: config.stopwords_enabled,
        };
        sets.insert("english", ENGLISH.iter().copied(), config.normalize_unicode);
        sets.insert("french", FRENCH.iter().copied(), config.normalize_unicode);
        sets
    }

    /// Built-in sets plus every `<language>.txt` found in `stopword_dir`.
    pub fn resolve(config: &TokenizerConfig) -> anyhow::Result<Self> {
        let mut sets = Self::builtin(config);
        if let Some(dir) = &config.stopword_dir {
            let mut files: Vec<_> = fs::read_dir(dir)
                .with_context(|| format!("reading stopword dir {}", dir.display()))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
                .collect();
            files.sort();
            for path in files {
                let Some(language) = path.file_stem().and_then(|s| s.to_str()).map(str::to_lowercase) else { continue };
                let raw = fs::read_to_string(&path)?;
                let words = raw.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#'));
                sets.insert(&language, words, config.normalize_unicode);
                tracing::debug!(language, path = %path.display(), "loaded stopword list");
            }
        }
        Ok(sets)
    }

    fn insert<'a>(&mut self, language: &str, words: impl Iterator<Item = &'a str>, normalize_unicode: bool) {
        let entry = self.sets.entry(language.to_string()).or_default();
        for w in words {
            // Stopwords go through the same normalization as text so accented
            // entries still match after diacritics are stripped.
            entry.insert(normalize(w, normalize_unicode).trim().to_string());
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Set for a language hint: the first known language whose name occurs in
    /// the hint (e.g. "French (France)"), else the default language's set.
    /// `None` when filtering is disabled.
    pub fn select(&self, hint: Option<&str>) -> Option<&HashSet<String>> {
        if !self.enabled {
            return None;
        }
        if let Some(hint) = hint {
            let hint = hint.to_lowercase();
            if let Some(set) = self.sets.iter().find(|(lang, _)| hint.contains(lang.as_str())).map(|(_, s)| s) {
                return Some(set);
            }
        }
        self.sets.get(&self.default_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_substring_and_falls_back() {
        let sets = StopwordSets::builtin(&TokenizerConfig::default());
        assert!(sets.select(Some("French (France)")).unwrap().contains("les"));
        assert!(sets.select(Some("Klingon")).unwrap().contains("the"));
        assert!(sets.select(None).unwrap().contains("the"));
    }

    #[test]
    fn accented_entries_are_normalized() {
        let sets = StopwordSets::builtin(&TokenizerConfig::default());
        let fr = sets.select(Some("french")).unwrap();
        assert!(fr.contains("ete"));
        assert!(fr.contains("a"));
    }

    #[test]
    fn disabled_yields_none() {
        let cfg = TokenizerConfig { stopwords_enabled: false, ..TokenizerConfig::default() };
        assert!(StopwordSets::builtin(&cfg).select(Some("english")).is_none());
    }

    #[test]
    fn loads_extra_languages_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("german.txt"), "der\ndie\n# comment\ndas\n").unwrap();
        let cfg = TokenizerConfig { stopword_dir: Some(dir.path().to_path_buf()), ..TokenizerConfig::default() };
        let sets = StopwordSets::resolve(&cfg).unwrap();
        assert_eq!(sets.languages().collect::<Vec<_>>(), vec!["english", "french", "german"]);
        let de = sets.select(Some("German")).unwrap();
        assert!(de.contains("die"));
        assert!(!de.contains("# comment"));
    }
}
