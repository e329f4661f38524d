//! Character and TLD data sources for variant generation.
//!
//! `ConfusableMap` and `TldList` are injected into the generator at
//! construction and never change afterwards. The built-in tables below are
//! used when the caller does not load its own data files.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Built-in Unicode look-alikes for lower-case Latin letters.
const BUILTIN_CONFUSABLES: &[(char, &str)] = &[
    ('a', "аɑαạąàáâãäåāăǎ"),
    ('b', "ьƅḃḅḇƀ"),
    ('c', "сϲċçćĉčƈ"),
    ('d', "ԁɗḋḍḏḑďđ"),
    ('e', "еёẹęèéêëēĕėě"),
    ('f', "ƒḟ"),
    ('g', "ɡġģĝğǧǵḡ"),
    ('h', "һḣḥḧḩḫĥħ"),
    ('i', "іɩìíîïĩīĭįǐỉị"),
    ('j', "јĵǰ"),
    ('k', "κḱḳḵķ"),
    ('l', "ӏḷḻḽĺļľł"),
    ('m', "ṁṃɱ"),
    ('n', "ոṅṇṉṋńņňɲ"),
    ('o', "оοσọøòóôõöōŏőơ"),
    ('p', "рρṕṗƥ"),
    ('q', "ԛɋ"),
    ('r', "гṙṛṟŕŗř"),
    ('s', "ѕṡṣśŝşšș"),
    ('t', "τṫṭṯṱţťŧț"),
    ('u', "υսụùúûüũūŭůűų"),
    ('v', "νѵṽṿ"),
    ('w', "ԝẁẃẅẇẉŵ"),
    ('x', "хχẋẍ"),
    ('y', "уγỳýŷÿỹȳẏỵ"),
    ('z', "ᴢźżžẑẓẕƶ"),
];

/// ASCII look-alike substitutions, including domain-legal leetspeak digits
/// and multi-character pairs.
pub const ASCII_VISUAL_PAIRS: &[(&str, &str)] = &[
    ("l", "1"),
    ("i", "1"),
    ("o", "0"),
    ("1", "l"),
    ("0", "o"),
    ("l", "i"),
    ("i", "l"),
    ("e", "3"),
    ("a", "4"),
    ("s", "5"),
    ("t", "7"),
    ("b", "8"),
    ("g", "9"),
    ("g", "6"),
    ("z", "2"),
    ("rn", "m"),
    ("m", "rn"),
    ("vv", "w"),
    ("w", "vv"),
    ("cl", "d"),
    ("d", "cl"),
];

/// QWERTY neighbours of each letter.
pub const KEYBOARD_NEIGHBORS: &[(char, &str)] = &[
    ('a', "qwsz"),
    ('b', "vghn"),
    ('c', "xdfv"),
    ('d', "serfcx"),
    ('e', "wsdr"),
    ('f', "drtgvc"),
    ('g', "ftyhbv"),
    ('h', "gyujnb"),
    ('i', "ujko"),
    ('j', "huikmn"),
    ('k', "jiolm"),
    ('l', "kop"),
    ('m', "njk"),
    ('n', "bhjm"),
    ('o', "iklp"),
    ('p', "ol"),
    ('q', "wa"),
    ('r', "edft"),
    ('s', "awedxz"),
    ('t', "rfgy"),
    ('u', "yhji"),
    ('v', "cfgb"),
    ('w', "qase"),
    ('x', "zsdc"),
    ('y', "tghu"),
    ('z', "asx"),
];

pub const VOWELS: &str = "aeiou";

/// Characters tried by the insertion technique.
pub const INSERTION_ALPHABET: &str = "aeiourstnl";

/// Security-lure tokens used as prefixes and suffixes.
pub const LURE_TOKENS: &[&str] = &[
    "login", "signin", "secure", "account", "my", "portal", "support", "help", "auth", "verify",
    "update", "service", "online", "web", "mobile", "app", "mail", "admin", "official", "real",
    "security", "center", "team", "group", "inc", "corp", "ltd",
];

/// Words concatenated with the label by the word-combination technique.
pub const COMBINATION_WORDS: &[&str] = &[
    "shop", "store", "pay", "bank", "cloud", "data", "digital", "tech", "pro", "plus", "premium",
    "finance", "crypto", "wallet", "manage", "access", "id", "hq", "now", "direct",
];

/// Sound-alike substitutions, applied to one occurrence at a time.
pub const PHONETIC_PAIRS: &[(&str, &str)] = &[
    ("ph", "f"),
    ("f", "ph"),
    ("ck", "k"),
    ("ck", "c"),
    ("k", "c"),
    ("k", "ck"),
    ("c", "k"),
    ("c", "s"),
    ("s", "z"),
    ("z", "s"),
    ("x", "ks"),
    ("i", "y"),
    ("y", "i"),
    ("ee", "i"),
    ("oo", "u"),
    ("u", "oo"),
    ("qu", "kw"),
];

/// Built-in TLDs for the TLD variation technique, in priority order.
const BUILTIN_TLDS: &[&str] = &[
    // generic
    "com", "net", "org", "info", "biz", "co", "io", "app", "dev", "ai", "xyz", "online", "site",
    "website", "tech", "store", "shop", "club",
    // country codes
    "uk", "us", "de", "fr", "it", "es", "nl", "ru", "cn", "jp", "kr", "in", "au", "ca", "br", "mx",
    "pl", "cz", "ch", "at", "be", "se",
    // second-level
    "co.uk", "com.au", "co.in", "co.jp", "com.br", "co.nz", "com.mx",
    // gTLDs popular for phishing
    "top", "work", "click", "link", "live", "world", "today", "email", "best", "win", "vip", "ltd",
    "group", "company", "solutions",
];

lazy_static! {
    static ref BUILTIN_CONFUSABLE_MAP: ConfusableMap = ConfusableMap::from_entries(
        BUILTIN_CONFUSABLES
            .iter()
            .map(|(c, alts)| (*c, alts.chars().collect::<Vec<_>>()))
    );
}

/// Mapping from a character to its ordered list of visually similar
/// characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfusableMap {
    entries: HashMap<char, Vec<char>>,
}

impl ConfusableMap {
    /// The built-in Latin look-alike table.
    pub fn builtin() -> Self {
        BUILTIN_CONFUSABLE_MAP.clone()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a map from `(char, confusables)` entries.
    ///
    /// Keys are lower-cased. Confusables equal to their key and repeated
    /// confusables are dropped; order is otherwise kept. Later entries for
    /// the same key extend earlier ones.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (char, Vec<char>)>,
    {
        let mut map: HashMap<char, Vec<char>> = HashMap::new();
        for (key, alternatives) in entries {
            let key = key.to_lowercase().next().unwrap_or(key);
            let slot = map.entry(key).or_default();
            for alt in alternatives {
                if alt != key && !slot.contains(&alt) {
                    slot.push(alt);
                }
            }
        }
        map.retain(|_, alts| !alts.is_empty());
        Self { entries: map }
    }

    /// Confusables for `c`, most relevant first.
    pub fn get(&self, c: char) -> &[char] {
        self.entries.get(&c).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered, de-duplicated list of TLDs / public suffixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TldList {
    tlds: Vec<String>,
}

impl TldList {
    /// The built-in TLD table.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TLDS.iter().copied())
    }

    /// Build a list, lower-casing entries and stripping a leading dot.
    /// Blank and repeated entries are dropped.
    pub fn new<I, S>(tlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for tld in tlds {
            let tld = tld.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !tld.is_empty() && seen.insert(tld.clone()) {
                list.push(tld);
            }
        }
        Self { tlds: list }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tlds
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tlds.iter().map(String::as_str)
    }

    pub fn contains(&self, tld: &str) -> bool {
        self.tlds.iter().any(|t| t == tld)
    }

    pub fn len(&self) -> usize {
        self.tlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty()
    }
}

/// Keyboard neighbours of `c`, empty for characters off the letter block.
pub fn keyboard_neighbors(c: char) -> &'static str {
    KEYBOARD_NEIGHBORS
        .iter()
        .find(|(key, _)| *key == c)
        .map(|(_, neighbors)| *neighbors)
        .unwrap_or("")
}
