//! Keyword and regex tables mapping merchant/receipt text to categories.
//!
//! The tables are plain data: a built-in set compiled once on first use, or a
//! TOML document compiled by the embedding application at startup. Nothing
//! mutates a dictionary after it is built.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid pattern for category '{category}': {source}")]
    Pattern {
        category: String,
        #[source]
        source: regex::Error,
    },
    #[error("Empty keyword in category '{0}'")]
    EmptyKeyword(String),
}

// ── Serializable table shape ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub ocr_patterns: Vec<OcrPatternEntry>,
    #[serde(default)]
    pub merchants: Vec<MerchantEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: String,
    /// Keywords that point at the category without a subcategory.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryEntry {
    pub id: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPatternEntry {
    pub category: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantEntry {
    pub keyword: String,
    pub category: String,
}

type KeywordTable = &'static [(&'static str, &'static [(&'static str, &'static [&'static str])])];

const BUILTIN_KEYWORDS: KeywordTable = &[
    (
        "utilities",
        &[
            ("electricity", &["electric bill", "electricity", "electric company", "pg&e", "pge", "con edison", "duke energy", "power bill"]),
            ("gas", &["gas bill", "natural gas", "gas company", "socalgas", "propane"]),
            ("water", &["water bill", "water utility", "water district", "sewer", "water dept"]),
            ("internet", &["internet", "comcast", "xfinity", "spectrum", "broadband", "wifi"]),
            ("trash", &["trash", "waste management", "garbage", "recycling", "republic services"]),
        ],
    ),
    (
        "maintenance",
        &[
            ("plumbing", &["plumber", "plumbing", "drain", "leak repair", "water heater", "roto-rooter"]),
            ("electrical", &["electrician", "electrical", "wiring", "breaker"]),
            ("hvac", &["hvac", "furnace", "air conditioning", "heating repair", "ac repair"]),
            ("landscaping", &["landscaping", "lawn", "gardener", "tree service", "snow removal"]),
            ("cleaning", &["cleaning", "janitorial", "maid service", "carpet cleaning"]),
            ("pest_control", &["pest control", "exterminator", "terminix", "orkin"]),
            ("appliance", &["appliance repair", "refrigerator", "dishwasher", "washer", "dryer"]),
            ("general", &["handyman", "repair", "maintenance", "painting"]),
        ],
    ),
    (
        "supplies",
        &[
            ("hardware", &["home depot", "lowes", "lowe's", "ace hardware", "hardware store", "menards"]),
            ("office", &["staples", "office depot", "office supplies", "printer ink"]),
        ],
    ),
    (
        "insurance",
        &[
            ("property", &["property insurance", "homeowners insurance", "landlord insurance", "hazard insurance", "state farm", "allstate"]),
            ("liability", &["liability insurance", "umbrella policy"]),
        ],
    ),
    (
        "taxes",
        &[("property_tax", &["property tax", "county treasurer", "tax collector", "assessor"])],
    ),
    (
        "professional_services",
        &[
            ("legal", &["attorney", "lawyer", "legal fees", "eviction"]),
            ("accounting", &["accountant", "cpa", "bookkeeping", "tax preparation"]),
            ("property_management", &["property management", "management fee", "leasing fee"]),
        ],
    ),
    (
        "marketing",
        &[("advertising", &["zillow", "apartments.com", "craigslist", "advertising", "listing fee", "trulia"])],
    ),
    (
        "travel",
        &[
            ("mileage", &["mileage"]),
            ("fuel", &["gas station", "chevron", "exxon", "fuel"]),
        ],
    ),
    (
        "mortgage",
        &[("interest", &["mortgage interest", "mortgage payment", "loan interest"])],
    ),
    ("hoa", &[("dues", &["hoa", "homeowners association", "association dues"])]),
];

const BUILTIN_OCR_PATTERNS: &[(&str, &[&str])] = &[
    ("utilities", &[r"\b(electric|electricity|power|energy)\b", r"\b(water|sewer)\b", r"\b(gas|utility|utilities)\b", r"\b(internet|cable|broadband)\b"]),
    ("maintenance", &[r"\b(repair|service call|labor)\b", r"\b(plumb\w*|hvac|electrician)\b"]),
    ("supplies", &[r"\b(hardware|lumber|paint|supplies)\b"]),
    ("insurance", &[r"\b(policy|premium|insurance)\b"]),
    ("taxes", &[r"\b(property tax|tax bill|parcel)\b"]),
    ("professional_services", &[r"\b(legal|attorney|consult\w*|professional services)\b"]),
    ("marketing", &[r"\b(advertis\w*|listing|promotion)\b"]),
];

const BUILTIN_MERCHANTS: &[(&str, &str)] = &[
    ("home depot", "supplies"),
    ("lowe's", "supplies"),
    ("lowes", "supplies"),
    ("ace hardware", "supplies"),
    ("staples", "supplies"),
    ("pg&e", "utilities"),
    ("pge", "utilities"),
    ("comcast", "utilities"),
    ("xfinity", "utilities"),
    ("waste management", "utilities"),
    ("state farm", "insurance"),
    ("allstate", "insurance"),
    ("roto-rooter", "maintenance"),
    ("terminix", "maintenance"),
    ("orkin", "maintenance"),
    ("zillow", "marketing"),
];

impl DictionaryConfig {
    pub fn builtin() -> Self {
        let categories = BUILTIN_KEYWORDS
            .iter()
            .map(|(id, subs)| CategoryEntry {
                id: id.to_string(),
                keywords: vec![],
                subcategories: subs
                    .iter()
                    .map(|(sub, keywords)| SubcategoryEntry {
                        id: sub.to_string(),
                        keywords: keywords.iter().map(|k| k.to_string()).collect(),
                    })
                    .collect(),
            })
            .collect();
        let ocr_patterns = BUILTIN_OCR_PATTERNS
            .iter()
            .map(|(category, patterns)| OcrPatternEntry {
                category: category.to_string(),
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
            })
            .collect();
        let merchants = BUILTIN_MERCHANTS
            .iter()
            .map(|(keyword, category)| MerchantEntry {
                keyword: keyword.to_string(),
                category: category.to_string(),
            })
            .collect();
        DictionaryConfig { categories, ocr_patterns, merchants }
    }
}

// ── Compiled dictionary ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct KeywordEntry {
    category_id: String,
    subcategory_id: Option<String>,
    keyword: String,
}

/// A keyword from the nested table found inside the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch<'a> {
    pub category_id: &'a str,
    pub subcategory_id: Option<&'a str>,
    pub keyword: &'a str,
}

/// A category whose OCR regex list matched; `matched` is the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexHint<'a> {
    pub category_id: &'a str,
    pub matched: String,
}

#[derive(Debug)]
pub struct PatternDictionary {
    keywords: Vec<KeywordEntry>,
    ocr_patterns: Vec<(String, Vec<Regex>)>,
    merchants: Vec<(String, String)>,
}

impl PatternDictionary {
    /// The built-in tables, compiled on first use and shared afterwards.
    pub fn builtin() -> &'static PatternDictionary {
        static BUILTIN: OnceLock<PatternDictionary> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            PatternDictionary::compile(DictionaryConfig::builtin())
                .expect("built-in dictionary patterns are valid")
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, DictionaryError> {
        let config: DictionaryConfig = toml::from_str(content)?;
        Self::compile(config)
    }

    pub fn compile(config: DictionaryConfig) -> Result<Self, DictionaryError> {
        let mut keywords = Vec::new();
        for category in config.categories {
            let top_level = category.keywords.iter().map(|k| (None, k));
            let nested = category
                .subcategories
                .iter()
                .flat_map(|sub| sub.keywords.iter().map(move |k| (Some(sub.id.as_str()), k)));
            for (subcategory_id, keyword) in top_level.chain(nested) {
                let keyword = keyword.trim().to_lowercase();
                if keyword.is_empty() {
                    return Err(DictionaryError::EmptyKeyword(category.id.clone()));
                }
                keywords.push(KeywordEntry {
                    category_id: category.id.clone(),
                    subcategory_id: subcategory_id.map(str::to_string),
                    keyword,
                });
            }
        }

        let ocr_patterns = config
            .ocr_patterns
            .into_iter()
            .map(|entry| {
                let compiled = entry
                    .patterns
                    .iter()
                    .map(|p| {
                        RegexBuilder::new(p).case_insensitive(true).build().map_err(|source| {
                            DictionaryError::Pattern { category: entry.category.clone(), source }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((entry.category, compiled))
            })
            .collect::<Result<Vec<_>, DictionaryError>>()?;

        let merchants = config
            .merchants
            .into_iter()
            .map(|m| (m.keyword.to_lowercase(), m.category))
            .collect::<Vec<_>>();

        tracing::debug!(
            keywords = keywords.len(),
            ocr_patterns = ocr_patterns.len(),
            merchants = merchants.len(),
            "compiled pattern dictionary"
        );
        Ok(PatternDictionary { keywords, ocr_patterns, merchants })
    }

    /// Every keyword contained in `lowered` (plain substring containment,
    /// so "hoa" also hits "hoagie"). Callers lowercase the text first.
    pub fn keyword_matches(&self, lowered: &str) -> Vec<KeywordMatch<'_>> {
        self.keywords
            .iter()
            .filter(|entry| lowered.contains(entry.keyword.as_str()))
            .map(|entry| KeywordMatch {
                category_id: &entry.category_id,
                subcategory_id: entry.subcategory_id.as_deref(),
                keyword: &entry.keyword,
            })
            .collect()
    }

    /// At most one hint per category: the first pattern in the category's
    /// list that matches wins.
    pub fn regex_hints(&self, text: &str) -> Vec<RegexHint<'_>> {
        let mut hints = Vec::new();
        for (category_id, patterns) in &self.ocr_patterns {
            for re in patterns {
                if let Some(m) = re.find(text) {
                    hints.push(RegexHint {
                        category_id,
                        matched: m.as_str().to_lowercase(),
                    });
                    break;
                }
            }
        }
        hints
    }

    /// Categories of every known merchant keyword found in `lowered`.
    pub fn merchant_hints(&self, lowered: &str) -> Vec<&str> {
        self.merchants
            .iter()
            .filter(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, category)| category.as_str())
            .collect()
    }

    /// Union of merchant-table and regex-table categories for receipt text.
    pub fn category_hints(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        let mut hints: BTreeSet<String> =
            self.merchant_hints(&lowered).into_iter().map(str::to_string).collect();
        hints.extend(self.regex_hints(text).into_iter().map(|h| h.category_id.to_string()));
        hints
    }
}
