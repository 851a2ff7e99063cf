use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;

const TOKEN_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

const HEADING_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its",
    "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly", "move",
    "much", "must", "my", "myself", "name", "namely", "neither", "never", "nevertheless", "next",
    "nine", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put",
    "rather", "re", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several",
    "she", "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "thick", "thin", "third", "this", "those", "though", "three", "through", "throughout", "thru",
    "thus", "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
    "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

const VERB_WORDS: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "being", "am", "have", "has", "had", "having", "do",
    "does", "did", "doing", "make", "makes", "made", "use", "uses", "provide", "provides",
    "include", "includes", "show", "shows", "shown", "grew", "grow", "grows", "get", "gets", "got",
    "take", "takes", "took", "give", "gives", "gave", "go", "goes", "went", "see", "saw", "seen",
    "know", "knew", "need", "needs", "become", "became", "remain", "remains", "describe",
    "describes", "contain", "contains", "apply", "applies", "ensure", "ensures", "allow",
    "allows", "require", "requires", "rose", "fell", "led", "says", "said", "read", "write",
    "wrote", "written",
];

const NOUN_SUFFIXES: &[&str] = &[
    "tion", "sion", "ment", "ness", "ity", "ship", "ance", "ence", "ism", "ist", "ure", "age",
];

const MODIFIER_SUFFIXES: &[&str] = &[
    "ly", "ous", "ful", "ive", "able", "ible", "less", "ish", "ical", "al", "ic",
];

const VERB_SUFFIXES: &[&str] = &["ing", "ed", "ize", "ise", "ify", "izes", "ises", "ifies"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Noun,
    Verb,
    Other,
}

#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    token_regex: Regex,
    stop_words: HashSet<&'static str>,
    verbs: HashSet<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinguisticRatios {
    pub noun_verb_ratio: f64,
    pub stopword_percentage: f64,
}

impl TextAnalyzer {
    pub fn new() -> Result<Self> {
        let token_regex = Regex::new(r"\w+(?:'\w+)?|[^\w\s]")
            .context("failed to compile word token regex")?;

        Ok(Self {
            token_regex,
            stop_words: TOKEN_STOP_WORDS.iter().copied().collect(),
            verbs: VERB_WORDS.iter().copied().collect(),
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.token_regex
            .find_iter(&lowered)
            .map(|token| token.as_str().to_string())
            .collect()
    }

    pub fn classify(&self, token: &str) -> WordClass {
        if !token.chars().any(char::is_alphabetic) {
            return WordClass::Other;
        }
        if self.verbs.contains(token) {
            return WordClass::Verb;
        }
        if self.stop_words.contains(token) || token.chars().count() < 3 {
            return WordClass::Other;
        }
        if NOUN_SUFFIXES.iter().any(|suffix| token.ends_with(suffix)) {
            return WordClass::Noun;
        }
        if VERB_SUFFIXES.iter().any(|suffix| token.ends_with(suffix)) {
            return WordClass::Verb;
        }
        if MODIFIER_SUFFIXES.iter().any(|suffix| token.ends_with(suffix)) {
            return WordClass::Other;
        }
        WordClass::Noun
    }

    pub fn ratios(&self, text: &str) -> LinguisticRatios {
        let tokens = self.tokenize(text);
        if tokens.is_empty() {
            return LinguisticRatios {
                noun_verb_ratio: 0.0,
                stopword_percentage: 0.0,
            };
        }

        let mut nouns = 0usize;
        let mut verbs = 0usize;
        for token in &tokens {
            match self.classify(token) {
                WordClass::Noun => nouns += 1,
                WordClass::Verb => verbs += 1,
                WordClass::Other => {}
            }
        }

        let noun_verb_ratio = if verbs > 0 {
            round_to(nouns as f64 / verbs as f64, 2)
        } else {
            nouns as f64
        };

        let stop_count = tokens
            .iter()
            .filter(|token| self.stop_words.contains(token.as_str()))
            .count();

        LinguisticRatios {
            noun_verb_ratio,
            stopword_percentage: round_to(stop_count as f64 / tokens.len() as f64 * 100.0, 2),
        }
    }
}

pub fn is_heading_stop_word(word: &str) -> bool {
    HEADING_STOP_WORDS.contains(&word.to_lowercase().as_str())
}

pub fn is_title_word(word: &str) -> bool {
    let mut previous_cased = false;
    let mut any_cased = false;

    for character in word.chars() {
        if character.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else if character.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else {
            previous_cased = false;
        }
    }

    any_cased
}

pub fn is_upper_text(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

pub fn is_alpha_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
