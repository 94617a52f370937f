use std::collections::HashMap;
use std::sync::LazyLock;

use crate::locale::{normalize, LanguageCode, LocaleCode};

// Most widely used regional variant per language. Covers every language the
// detectors can report, plus the languages hosts commonly hand us as hints.
const FALLBACK_LOCALES: &[(&str, &str)] = &[
    ("af", "af-ZA"),
    ("am", "am-ET"),
    ("ar", "ar-SA"),
    ("az", "az-AZ"),
    ("be", "be-BY"),
    ("bg", "bg-BG"),
    ("bn", "bn-IN"),
    ("bs", "bs-BA"),
    ("ca", "ca-ES"),
    ("cs", "cs-CZ"),
    ("cy", "cy-GB"),
    ("da", "da-DK"),
    ("de", "de-DE"),
    ("el", "el-GR"),
    ("en", "en-US"),
    ("eo", "eo-EO"),
    ("es", "es-ES"),
    ("et", "et-EE"),
    ("eu", "eu-ES"),
    ("fa", "fa-IR"),
    ("fi", "fi-FI"),
    ("fo", "fo-FO"),
    ("fr", "fr-FR"),
    ("ga", "ga-IE"),
    ("gd", "gd-GB"),
    ("gl", "gl-ES"),
    ("gu", "gu-IN"),
    ("he", "he-IL"),
    ("hi", "hi-IN"),
    ("hr", "hr-HR"),
    ("hu", "hu-HU"),
    ("hy", "hy-AM"),
    ("id", "id-ID"),
    ("is", "is-IS"),
    ("it", "it-IT"),
    ("ja", "ja-JP"),
    ("jv", "jv-ID"),
    ("ka", "ka-GE"),
    ("kk", "kk-KZ"),
    ("km", "km-KH"),
    ("kn", "kn-IN"),
    ("ko", "ko-KR"),
    ("la", "la-VA"),
    ("lo", "lo-LA"),
    ("lt", "lt-LT"),
    ("lv", "lv-LV"),
    ("mk", "mk-MK"),
    ("ml", "ml-IN"),
    ("mn", "mn-MN"),
    ("mr", "mr-IN"),
    ("ms", "ms-MY"),
    ("mt", "mt-MT"),
    ("my", "my-MM"),
    ("nb", "nb-NO"),
    ("ne", "ne-NP"),
    ("nl", "nl-NL"),
    ("nn", "nn-NO"),
    ("no", "nb-NO"),
    ("or", "or-IN"),
    ("pa", "pa-IN"),
    ("pl", "pl-PL"),
    ("pt", "pt-BR"),
    ("ro", "ro-RO"),
    ("ru", "ru-RU"),
    ("si", "si-LK"),
    ("sk", "sk-SK"),
    ("sl", "sl-SI"),
    ("sn", "sn-ZW"),
    ("sq", "sq-AL"),
    ("sr", "sr-RS"),
    ("sv", "sv-SE"),
    ("sw", "sw-KE"),
    ("ta", "ta-IN"),
    ("te", "te-IN"),
    ("tg", "tg-TJ"),
    ("th", "th-TH"),
    ("tk", "tk-TM"),
    ("tl", "tl-PH"),
    ("tr", "tr-TR"),
    ("uk", "uk-UA"),
    ("ur", "ur-PK"),
    ("uz", "uz-UZ"),
    ("vi", "vi-VN"),
    ("yi", "yi-US"),
    ("zh", "zh-CN"),
    ("zu", "zu-ZA"),
];

static FALLBACK_TABLE: LazyLock<HashMap<&'static str, LocaleCode>> = LazyLock::new(|| {
    FALLBACK_LOCALES
        .iter()
        .filter_map(|(lang, locale)| normalize(locale).ok().map(|locale| (*lang, locale)))
        .collect()
});

/// Built-in "most common region" for a language; the last resort before a
/// session gives up on finding a dictionary.
pub fn fallback_locale(language: &LanguageCode) -> Option<LocaleCode> {
    FALLBACK_TABLE.get(language.as_str()).cloned()
}
