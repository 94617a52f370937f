// Some native checkers split "don't" into "don" + "t" and then flag the
// stem they produced themselves. These words are never reported.
const CONTRACTION_STEMS: &[&str] = &[
    "ain", "aren", "can", "couldn", "didn", "doesn", "don", "hadn", "hasn", "haven", "isn",
    "mightn", "mustn", "needn", "oughtn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

// Only the pieces that are never words on their own. "s", "d" and "m" stay
// subject to the dictionary.
const CONTRACTION_SUFFIXES: &[&str] = &["ll", "re", "t", "ve"];

/// True when `word` is a contraction stem, a dangling contraction suffix, or
/// a full `stem'suffix` contraction such as `don't`.
pub fn is_contraction_stem(word: &str) -> bool {
    let lowered = word.trim().replace(['\u{2019}', '\u{2018}'], "'").to_lowercase();
    if lowered.is_empty() {
        return false;
    }

    if CONTRACTION_STEMS.contains(&lowered.as_str())
        || CONTRACTION_SUFFIXES.contains(&lowered.as_str())
    {
        return true;
    }

    match lowered.split_once('\'') {
        Some((stem, "t")) => CONTRACTION_STEMS.contains(&stem),
        _ => false,
    }
}
