//! Pronunciation dictionary: lookup, merge, and word resolution.
//!
//! Keys are case-insensitive; the dictionary retains the original casing of
//! the first-seen form. Multiple pronunciations per word are ordered, and the
//! first one is the default. The dictionary is mutable only through explicit
//! merge/import/append operations, so it can sit behind an `RwLock` with
//! concurrent readers during chunk processing.

use crate::error::{Result, TieralignError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Word-tier label used for words left unresolved under the skip policy.
pub const UNKNOWN_LABEL: &str = "((xxxx))";

/// Placeholder phone handed to the aligner for unresolved words.
pub const SPOKEN_NOISE_PHONE: &str = "spn";

/// Orthographic word plus its ordered phonetic transcriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry {
    /// Original casing of the first-seen form.
    pub word: String,
    /// Space-separated phone strings; first is the default pronunciation.
    pub pronunciations: Vec<String>,
}

/// Classification of one transcript word against the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordStatus {
    /// Present in the dictionary.
    Known,
    /// Absent from the dictionary but present in a supplied import list.
    ImportPending,
    /// Absent everywhere; needs resolution by the caller.
    Unknown,
}

/// One word of a chunk with its resolution status.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWord {
    pub word: String,
    pub status: WordStatus,
}

/// One word handed to the aligner together with its phone sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconEntry {
    pub word: String,
    pub phones: Vec<String>,
}

/// A token-level rewrite applied before dictionary lookup
/// (language-specific phonological or orthographic rules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
}

/// Case-insensitive pronunciation dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PronunciationDictionary {
    entries: HashMap<String, DictionaryEntry>,
}

impl PronunciationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a dictionary from a tab-separated file:
    /// `word<TAB>phonetic transcription` per line. Repeated lines for the
    /// same word append pronunciation variants, as do comma-separated
    /// transcriptions within one line.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_tsv(&contents)
    }

    pub fn from_tsv(input: &str) -> Result<Self> {
        let mut dict = Self::new();
        for (idx, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let Some((word, trans)) = line.split_once('\t') else {
                return Err(TieralignError::Parse {
                    line: idx + 1,
                    message: format!("dictionary line has no tab separator: {line:?}"),
                });
            };
            let word = word.trim();
            if word.is_empty() {
                return Err(TieralignError::Parse {
                    line: idx + 1,
                    message: "dictionary line has an empty word field".to_string(),
                });
            }
            for variant in trans.split(',') {
                let pron = variant.trim().replace('"', "");
                if !pron.is_empty() {
                    dict.add_pronunciation(word, &pron);
                }
            }
        }
        Ok(dict)
    }

    /// Writes the dictionary as TSV, one pronunciation per line, sorted by key.
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        for key in keys {
            let entry = &self.entries[key];
            for pron in &entry.pronunciations {
                out.push_str(&entry.word);
                out.push('\t');
                out.push_str(pron);
                out.push('\n');
            }
        }
        fs::write(path, out)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(&Self::key(word))
    }

    pub fn lookup(&self, word: &str) -> Option<&DictionaryEntry> {
        self.entries.get(&Self::key(word))
    }

    /// Appends a pronunciation for a word, creating the entry if absent.
    /// A pronunciation the word already has is not duplicated.
    pub fn add_pronunciation(&mut self, word: &str, pronunciation: &str) {
        let entry = self
            .entries
            .entry(Self::key(word))
            .or_insert_with(|| DictionaryEntry {
                word: word.to_string(),
                pronunciations: Vec::new(),
            });
        let pron = pronunciation.trim().to_string();
        if !entry.pronunciations.contains(&pron) {
            entry.pronunciations.push(pron);
        }
    }

    /// Merges `other` into `self`.
    ///
    /// For keys present in both, the other dictionary's novel pronunciations
    /// are appended after the existing ones; nothing is discarded and the
    /// existing order stays primary. Merging a dictionary into itself is a
    /// no-op.
    pub fn merge(&mut self, other: &PronunciationDictionary) {
        let mut keys: Vec<&String> = other.entries.keys().collect();
        keys.sort();
        for key in keys {
            let entry = &other.entries[key];
            for pron in &entry.pronunciations {
                self.add_pronunciation(&entry.word, pron);
            }
        }
    }

    /// Classifies each word as Known, ImportPending, or Unknown.
    pub fn resolve(
        &self,
        words: &[String],
        import: Option<&PronunciationDictionary>,
    ) -> Vec<ResolvedWord> {
        words
            .iter()
            .map(|word| {
                let status = if self.contains(word) {
                    WordStatus::Known
                } else if import.is_some_and(|d| d.contains(word)) {
                    WordStatus::ImportPending
                } else {
                    WordStatus::Unknown
                };
                ResolvedWord {
                    word: word.clone(),
                    status,
                }
            })
            .collect()
    }

    /// Builds the aligner lexicon for a word sequence.
    ///
    /// Known words get their default pronunciation. Unresolved words are
    /// rendered as the explicit unknown label with a spoken-noise phone, and
    /// reported back in the second return value.
    pub fn lexicon_for(&self, words: &[String]) -> (Vec<LexiconEntry>, Vec<String>) {
        let mut lexicon = Vec::with_capacity(words.len());
        let mut unresolved = Vec::new();
        for word in words {
            match self.lookup(word) {
                Some(entry) => lexicon.push(LexiconEntry {
                    word: word.clone(),
                    phones: entry.pronunciations[0]
                        .split_whitespace()
                        .map(str::to_string)
                        .collect(),
                }),
                None => {
                    unresolved.push(word.clone());
                    lexicon.push(LexiconEntry {
                        word: UNKNOWN_LABEL.to_string(),
                        phones: vec![SPOKEN_NOISE_PHONE.to_string()],
                    });
                }
            }
        }
        (lexicon, unresolved)
    }

    fn key(word: &str) -> String {
        word.to_uppercase()
    }
}

/// Applies locale rewrite rules to a word sequence, ahead of dictionary
/// lookup. Matching is token-exact and case-insensitive; a rewrite may
/// expand one token into several.
pub fn apply_rewrites(words: &[String], rules: &[RewriteRule]) -> Vec<String> {
    if rules.is_empty() {
        return words.to_vec();
    }
    let mut out = Vec::with_capacity(words.len());
    for word in words {
        match rules
            .iter()
            .find(|r| r.from.eq_ignore_ascii_case(word.as_str()))
        {
            Some(rule) => out.extend(rule.to.split_whitespace().map(str::to_string)),
            None => out.push(word.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dict() -> PronunciationDictionary {
        PronunciationDictionary::from_tsv(
            "testing\tT EH1 S T IH0 NG\none\tW AH1 N\ntwo\tT UW1\n",
        )
        .unwrap()
    }

    #[test]
    fn test_from_tsv_basic() {
        let dict = sample_dict();
        assert_eq!(dict.len(), 3);
        assert!(dict.contains("testing"));
        assert_eq!(
            dict.lookup("one").unwrap().pronunciations,
            vec!["W AH1 N".to_string()]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dict = sample_dict();
        assert!(dict.contains("TESTING"));
        assert!(dict.contains("Testing"));
        assert_eq!(dict.lookup("TWO").unwrap().word, "two");
    }

    #[test]
    fn test_first_seen_casing_is_retained() {
        let mut dict = PronunciationDictionary::new();
        dict.add_pronunciation("Praat", "P R AA1 T");
        dict.add_pronunciation("PRAAT", "P R AE1 T");
        let entry = dict.lookup("praat").unwrap();
        assert_eq!(entry.word, "Praat");
        assert_eq!(entry.pronunciations.len(), 2);
    }

    #[test]
    fn test_repeated_lines_append_variants() {
        let dict = PronunciationDictionary::from_tsv(
            "either\tIY1 DH ER0\neither\tAY1 DH ER0\n",
        )
        .unwrap();
        let entry = dict.lookup("either").unwrap();
        assert_eq!(
            entry.pronunciations,
            vec!["IY1 DH ER0".to_string(), "AY1 DH ER0".to_string()]
        );
    }

    #[test]
    fn test_comma_separated_variants_in_one_line() {
        let dict =
            PronunciationDictionary::from_tsv("either\tIY1 DH ER0, AY1 DH ER0\n").unwrap();
        assert_eq!(dict.lookup("either").unwrap().pronunciations.len(), 2);
    }

    #[test]
    fn test_from_tsv_missing_tab_is_parse_error() {
        let err = PronunciationDictionary::from_tsv("word without tab\n").unwrap_err();
        match err {
            TieralignError::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_tsv_skips_blank_lines() {
        let dict = PronunciationDictionary::from_tsv("\na\tAH0\n\n").unwrap();
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_merge_appends_new_variants_after_existing() {
        let mut a = PronunciationDictionary::from_tsv("word\tW ER1 D\n").unwrap();
        let b = PronunciationDictionary::from_tsv("word\tW AO1 R D\nnew\tN UW1\n").unwrap();
        a.merge(&b);
        assert_eq!(
            a.lookup("word").unwrap().pronunciations,
            vec!["W ER1 D".to_string(), "W AO1 R D".to_string()]
        );
        assert!(a.contains("new"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = sample_dict();
        let before = a.clone();
        let copy = a.clone();
        a.merge(&copy);
        assert_eq!(a, before);
    }

    #[test]
    fn test_merge_order_stable_key_set() {
        let base = PronunciationDictionary::from_tsv("a\tAH0\n").unwrap();
        let b = PronunciationDictionary::from_tsv("b\tB IY1\nshared\tX\n").unwrap();
        let c = PronunciationDictionary::from_tsv("c\tS IY1\nshared\tY\n").unwrap();

        // Merge B then C.
        let mut seq = base.clone();
        seq.merge(&b);
        seq.merge(&c);

        // Merge (B merged with C) in one step.
        let mut bc = b.clone();
        bc.merge(&c);
        let mut joined = base.clone();
        joined.merge(&bc);

        let mut seq_keys: Vec<String> =
            ["a", "b", "c", "shared"].iter().map(|s| s.to_string()).collect();
        seq_keys.sort();
        for key in &seq_keys {
            assert!(seq.contains(key));
            assert!(joined.contains(key));
        }
        assert_eq!(seq.len(), joined.len());
        // Retained pronunciation sets match even if ordering differs.
        let mut seq_shared = seq.lookup("shared").unwrap().pronunciations.clone();
        let mut joined_shared = joined.lookup("shared").unwrap().pronunciations.clone();
        seq_shared.sort();
        joined_shared.sort();
        assert_eq!(seq_shared, joined_shared);
    }

    #[test]
    fn test_resolve_partitions_words() {
        let dict = sample_dict();
        let import = PronunciationDictionary::from_tsv("pending\tP EH1 N D\n").unwrap();
        let words: Vec<String> = ["TESTING", "pending", "missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolved = dict.resolve(&words, Some(&import));
        assert_eq!(resolved[0].status, WordStatus::Known);
        assert_eq!(resolved[1].status, WordStatus::ImportPending);
        assert_eq!(resolved[2].status, WordStatus::Unknown);
    }

    #[test]
    fn test_resolve_without_import_list() {
        let dict = sample_dict();
        let words = vec!["missing".to_string()];
        let resolved = dict.resolve(&words, None);
        assert_eq!(resolved[0].status, WordStatus::Unknown);
    }

    #[test]
    fn test_lexicon_for_known_words() {
        let dict = sample_dict();
        let words: Vec<String> = ["TESTING", "ONE", "TWO"].iter().map(|s| s.to_string()).collect();
        let (lexicon, unresolved) = dict.lexicon_for(&words);
        assert!(unresolved.is_empty());
        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon[0].word, "TESTING");
        assert_eq!(lexicon[0].phones, vec!["T", "EH1", "S", "T", "IH0", "NG"]);
    }

    #[test]
    fn test_lexicon_for_unknown_word_uses_unknown_label() {
        let dict = sample_dict();
        let words: Vec<String> = ["ONE", "ZYZZYVA"].iter().map(|s| s.to_string()).collect();
        let (lexicon, unresolved) = dict.lexicon_for(&words);
        assert_eq!(unresolved, vec!["ZYZZYVA".to_string()]);
        assert_eq!(lexicon[1].word, UNKNOWN_LABEL);
        assert_eq!(lexicon[1].phones, vec![SPOKEN_NOISE_PHONE.to_string()]);
    }

    #[test]
    fn test_add_pronunciation_after_resolution() {
        let mut dict = sample_dict();
        dict.add_pronunciation("zyzzyva", "Z IH1 Z IH0 V AH0");
        let (_, unresolved) = dict.lexicon_for(&["ZYZZYVA".to_string()]);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn test_add_pronunciation_no_duplicates() {
        let mut dict = PronunciationDictionary::new();
        dict.add_pronunciation("word", "W ER1 D");
        dict.add_pronunciation("WORD", "W ER1 D");
        assert_eq!(dict.lookup("word").unwrap().pronunciations.len(), 1);
    }

    #[test]
    fn test_write_tsv_roundtrip() {
        let dict = sample_dict();
        let file = tempfile::NamedTempFile::new().unwrap();
        dict.write_tsv(file.path()).unwrap();
        let reloaded = PronunciationDictionary::load(file.path()).unwrap();
        assert_eq!(reloaded, dict);
    }

    #[test]
    fn test_apply_rewrites_token_match() {
        let rules = vec![RewriteRule {
            from: "gonna".to_string(),
            to: "GOING TO".to_string(),
        }];
        let words: Vec<String> = ["I'M", "GONNA", "GO"].iter().map(|s| s.to_string()).collect();
        let rewritten = apply_rewrites(&words, &rules);
        assert_eq!(rewritten, vec!["I'M", "GOING", "TO", "GO"]);
    }

    #[test]
    fn test_apply_rewrites_empty_rules_is_noop() {
        let words = vec!["HELLO".to_string()];
        assert_eq!(apply_rewrites(&words, &[]), words);
    }
}
